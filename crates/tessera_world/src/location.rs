//! Entity location index: where each placed entity's row lives.

use tessera_component::{ArchetypeId, Entity};

/// The archetype and row of a placed entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityLocation {
    /// Archetype table holding the entity.
    pub archetype: ArchetypeId,
    /// Row within that table.
    pub row: usize,
}

/// Maps entity ids to their [`EntityLocation`].
///
/// Slots are indexed by entity id. An entity that is alive but has no
/// components, or that has been destroyed, has no location.
#[derive(Debug, Default)]
pub struct EntityLocations {
    slots: Vec<Option<EntityLocation>>,
    placed: usize,
}

impl EntityLocations {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded location of `entity`, if placed.
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<EntityLocation> {
        self.slots.get(entity.index()).copied().flatten()
    }

    /// Record `location` for `entity`, returning the previous record.
    pub fn insert(&mut self, entity: Entity, location: EntityLocation) -> Option<EntityLocation> {
        let index = entity.index();
        if index >= self.slots.len() {
            self.slots.resize(index + 1, None);
        }
        let previous = self.slots[index].replace(location);
        if previous.is_none() {
            self.placed += 1;
        }
        previous
    }

    /// Update the row of an entity that stayed in the same archetype.
    ///
    /// # Panics
    ///
    /// Panics if `entity` has no location.
    pub fn set_row(&mut self, entity: Entity, row: usize) {
        match self.slots.get_mut(entity.index()).and_then(Option::as_mut) {
            Some(location) => location.row = row,
            None => panic!("{entity} has no location to update"),
        }
    }

    /// Drop the record for `entity`.
    pub fn remove(&mut self, entity: Entity) -> Option<EntityLocation> {
        let previous = self.slots.get_mut(entity.index())?.take();
        if previous.is_some() {
            self.placed -= 1;
        }
        previous
    }

    /// Number of entities with a location.
    #[must_use]
    pub fn len(&self) -> usize {
        self.placed
    }

    /// Returns `true` if no entity is placed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.placed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(archetype: u32, row: usize) -> EntityLocation {
        EntityLocation { archetype: ArchetypeId(archetype), row }
    }

    #[test]
    fn test_insert_and_get() {
        let mut locations = EntityLocations::new();
        assert_eq!(locations.get(Entity(3)), None);
        assert_eq!(locations.insert(Entity(3), at(0, 1)), None);
        assert_eq!(locations.get(Entity(3)), Some(at(0, 1)));
        assert_eq!(locations.get(Entity(0)), None);
        assert_eq!(locations.len(), 1);
    }

    #[test]
    fn test_reinsert_does_not_double_count() {
        let mut locations = EntityLocations::new();
        locations.insert(Entity(0), at(0, 0));
        assert_eq!(locations.insert(Entity(0), at(1, 4)), Some(at(0, 0)));
        assert_eq!(locations.len(), 1);
    }

    #[test]
    fn test_set_row_and_remove() {
        let mut locations = EntityLocations::new();
        locations.insert(Entity(1), at(2, 5));
        locations.set_row(Entity(1), 0);
        assert_eq!(locations.get(Entity(1)), Some(at(2, 0)));

        assert_eq!(locations.remove(Entity(1)), Some(at(2, 0)));
        assert_eq!(locations.remove(Entity(1)), None);
        assert_eq!(locations.remove(Entity(40)), None);
        assert!(locations.is_empty());
    }

    #[test]
    #[should_panic(expected = "no location")]
    fn test_set_row_on_unplaced_panics() {
        let mut locations = EntityLocations::new();
        locations.set_row(Entity(0), 1);
    }
}
