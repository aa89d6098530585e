//! World configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for a [`World`](crate::World).
///
/// Missing fields fall back to their defaults when deserialising, so a config
/// file only needs to mention what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Row capacity an archetype table allocates on its first insertion.
    /// Capacity doubles from there.
    pub initial_capacity: usize,
    /// Number of component types the world expects; pre-sizes the registry.
    pub signature_hint: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
            signature_hint: 32,
        }
    }
}

impl WorldConfig {
    /// Override the initial archetype capacity.
    #[must_use]
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Override the expected number of component types.
    #[must_use]
    pub fn with_signature_hint(mut self, hint: usize) -> Self {
        self.signature_hint = hint;
        self
    }

    /// Parse a config from a JSON string and validate it.
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_json_str(&source)
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_capacity == 0 {
            return Err(ConfigError::Invalid(
                "initial_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
