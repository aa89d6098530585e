//! World-level error types.

use tessera_component::{ComponentTypeId, Entity};

/// Errors reported by [`World`](crate::World) operations.
///
/// Every variant is a caller logic error: the world refuses the operation and
/// leaves its state untouched.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The entity was never spawned, or has been destroyed.
    #[error("{0} is not alive")]
    NoSuchEntity(Entity),

    /// The entity is alive but does not have the requested component.
    #[error("{entity} has no `{component}` component")]
    MissingComponent {
        /// The entity that was addressed.
        entity: Entity,
        /// The component type's name.
        component: &'static str,
    },

    /// A bundle named the same component type twice.
    #[error("component `{0}` appears more than once in one bundle")]
    DuplicateComponent(&'static str),

    /// A query descriptor mentions an id this world never issued.
    #[error("{0} was never registered with this world")]
    UnknownComponentId(ComponentTypeId),

    /// No state value of the requested type has been inserted.
    #[error("no `{0}` state has been inserted into this world")]
    MissingState(&'static str),

    /// The world configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors that can occur while loading a [`WorldConfig`](crate::WorldConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The config was not valid JSON for a `WorldConfig`.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// The config parsed but holds an unusable value.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Convenience alias for results of world operations.
pub type WorldResult<T> = Result<T, WorldError>;
