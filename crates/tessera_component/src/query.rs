//! Query descriptors.
//!
//! A [`QueryDescriptor`] declares which component types a query needs, which
//! ones disqualify an archetype, and which ones it reads when present. Only
//! the first two take part in archetype matching:
//!
//! ```text
//! matches(archetype) = archetype ⊇ required  AND  archetype ∩ excluded = ∅
//! ```

use serde::{Deserialize, Serialize};

use crate::component::ComponentTypeId;
use crate::signature::Signature;

/// Describes which archetypes a query selects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    /// Components an archetype must have.
    pub required: Signature,
    /// Components an archetype must not have.
    pub excluded: Signature,
    /// Components read when present; they never affect matching.
    pub optional: Signature,
}

impl QueryDescriptor {
    /// Create a new empty query descriptor, which matches every archetype.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required component.
    #[must_use]
    pub fn require(mut self, type_id: ComponentTypeId) -> Self {
        self.required.insert(type_id);
        self
    }

    /// Add an excluded component.
    #[must_use]
    pub fn exclude(mut self, type_id: ComponentTypeId) -> Self {
        self.excluded.insert(type_id);
        self
    }

    /// Add an optional component.
    #[must_use]
    pub fn optional(mut self, type_id: ComponentTypeId) -> Self {
        self.optional.insert(type_id);
        self
    }

    /// Returns `true` if an archetype with `signature` is selected.
    #[must_use]
    pub fn matches(&self, signature: &Signature) -> bool {
        signature.contains(&self.required)
            && (self.excluded.is_empty() || !signature.overlaps(&self.excluded))
    }

    /// Returns `true` if no archetype can ever match, because a component is
    /// both required and excluded.
    #[must_use]
    pub fn is_contradictory(&self) -> bool {
        self.required.overlaps(&self.excluded)
    }

    /// Returns every component id the descriptor mentions.
    #[must_use]
    pub fn mentioned(&self) -> Signature {
        self.required.union(&self.excluded).union(&self.optional)
    }
}
