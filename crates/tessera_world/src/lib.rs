//! # tessera_world
//!
//! The world half of the tessera storage engine: it owns the archetype
//! directory, tracks where every entity lives, migrates rows between
//! archetypes as components are added and removed, and answers cached queries.
//!
//! ```rust
//! use tessera_world::prelude::*;
//!
//! #[derive(Debug, PartialEq)]
//! struct Position(f32);
//! impl Component for Position {}
//!
//! let mut world = World::new();
//! let entity = world.spawn();
//! world.add_component(entity, Position(1.0)).unwrap();
//!
//! let mut query = world.query::<&Position>();
//! let found: Vec<Entity> = world.iter(&mut query).map(|(e, _)| e).collect();
//! assert_eq!(found, vec![entity]);
//! ```

pub mod bundle;
pub mod config;
pub mod directory;
pub mod error;
pub mod location;
pub mod query;
pub mod state;
pub mod world;

pub use bundle::Bundle;
pub use config::WorldConfig;
pub use directory::ArchetypeDirectory;
pub use error::{ConfigError, WorldError, WorldResult};
pub use location::{EntityLocation, EntityLocations};
pub use query::{
    CachedQuery, Query, QueryAccess, QueryData, QueryFilter, QueryIter, With, Without,
};
pub use state::StateRegistry;
pub use world::{World, WorldId};

pub use tessera_component;

/// Everything needed to declare components and run queries.
pub mod prelude {
    pub use tessera_component::{Component, ComponentTypeId, Entity, QueryDescriptor, Signature};

    pub use crate::{
        Bundle, CachedQuery, Query, With, Without, World, WorldConfig, WorldError, WorldId,
        WorldResult,
    };
}
