//! Entity type and allocation utilities.
//!
//! An [`Entity`] is a lightweight `u32` identifier with no inherent data.
//! The [`EntityAllocator`] hands ids out densely from 0 and recycles the ids
//! of destroyed entities through a LIFO free list.

use serde::{Deserialize, Serialize};
use tracing::trace;

/// An entity identifier.
///
/// Entities are pure identifiers; they carry no data of their own. Components
/// are attached to entities to give them meaning. Ids are small, dense and may
/// be reused after the entity holding them is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity(pub u32);

impl Entity {
    /// Create an entity from a raw `u32` identifier.
    #[must_use]
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw `u32` identifier.
    #[must_use]
    pub const fn id(self) -> u32 {
        self.0
    }

    /// Returns the id as a slot index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Allocates entity ids and tracks which of them are alive.
///
/// Freed ids are pushed onto a free list and handed out again (most recently
/// freed first) before any fresh id is minted.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    next_id: u32,
    free: Vec<u32>,
    alive: Vec<bool>,
}

impl EntityAllocator {
    /// Creates a new allocator. Fresh ids start at 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an id, reusing a freed one if any is available.
    pub fn allocate(&mut self) -> Entity {
        if let Some(id) = self.free.pop() {
            self.alive[id as usize] = true;
            trace!(entity = id, "recycled entity id");
            return Entity(id);
        }

        let id = self.next_id;
        self.next_id += 1;
        self.alive.push(true);
        Entity(id)
    }

    /// Returns `entity`'s id to the free list.
    ///
    /// Returns `false` (and does nothing) if the entity is not alive.
    pub fn free(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        self.alive[entity.index()] = false;
        self.free.push(entity.0);
        true
    }

    /// Returns `true` if `entity` was allocated and not freed since.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.alive.get(entity.index()).copied().unwrap_or(false)
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.next_id as usize - self.free.len()
    }

    /// Returns the number of distinct ids minted so far.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.next_id
    }

    /// Returns the number of ids waiting to be reused.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }
}
