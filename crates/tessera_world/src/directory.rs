//! The archetype directory.
//!
//! Owns every [`ArchetypeTable`] of a world in creation order and maps each
//! [`Signature`] to its table. The directory's generation counter increases
//! by exactly one each time a table is created and never otherwise changes;
//! query caches compare against it to decide whether to rescan.
//!
//! Tables are never removed, even once empty, so an [`ArchetypeId`] stays
//! valid for the lifetime of the world.

use std::collections::HashMap;
use std::ops::{Index, IndexMut};

use tessera_component::{ArchetypeId, ArchetypeTable, ComponentRegistry, Signature};
use tracing::debug;

/// All archetype tables of one world, indexed by id and by signature.
#[derive(Debug)]
pub struct ArchetypeDirectory {
    tables: Vec<ArchetypeTable>,
    by_signature: HashMap<Signature, ArchetypeId>,
    generation: u64,
    initial_capacity: usize,
}

impl ArchetypeDirectory {
    /// Create an empty directory whose tables start at `initial_capacity`
    /// rows once used.
    #[must_use]
    pub fn new(initial_capacity: usize) -> Self {
        Self {
            tables: Vec::new(),
            by_signature: HashMap::new(),
            generation: 0,
            initial_capacity,
        }
    }

    /// Number of archetypes created so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Look up the archetype for `signature` without creating it.
    #[must_use]
    pub fn find(&self, signature: &Signature) -> Option<ArchetypeId> {
        self.by_signature.get(signature).copied()
    }

    /// Returns the archetype for `signature`, creating it (and advancing the
    /// generation) if it does not exist yet.
    ///
    /// # Panics
    ///
    /// Panics if `signature` mentions an id `registry` did not issue.
    pub fn get_or_create(&mut self, signature: &Signature, registry: &ComponentRegistry) -> ArchetypeId {
        if let Some(id) = self.find(signature) {
            return id;
        }
        debug_assert!(!signature.is_empty(), "the empty signature has no archetype");

        let id = ArchetypeId(self.tables.len() as u32);
        let columns = signature
            .ids()
            .map(|type_id| match registry.new_column(type_id) {
                Some(column) => (type_id, column),
                None => panic!("{type_id} in {signature:?} is not registered"),
            })
            .collect();

        self.tables.push(ArchetypeTable::new(
            id,
            signature.clone(),
            columns,
            self.initial_capacity,
        ));
        self.by_signature.insert(signature.clone(), id);
        self.generation += 1;

        debug!(
            archetype = id.0,
            components = signature.len(),
            generation = self.generation,
            "created archetype"
        );
        id
    }

    /// Returns the table for `id`.
    #[must_use]
    pub fn get(&self, id: ArchetypeId) -> Option<&ArchetypeTable> {
        self.tables.get(id.index())
    }

    /// Returns the table for `id` mutably.
    #[must_use]
    pub fn get_mut(&mut self, id: ArchetypeId) -> Option<&mut ArchetypeTable> {
        self.tables.get_mut(id.index())
    }

    /// Borrow two different tables mutably at once.
    ///
    /// # Panics
    ///
    /// Panics if `a == b` or either id is out of range.
    pub fn pair_mut(&mut self, a: ArchetypeId, b: ArchetypeId) -> (&mut ArchetypeTable, &mut ArchetypeTable) {
        assert_ne!(a, b, "cannot borrow archetype {a:?} twice");
        if a < b {
            let (head, tail) = self.tables.split_at_mut(b.index());
            (&mut head[a.index()], &mut tail[0])
        } else {
            let (head, tail) = self.tables.split_at_mut(a.index());
            (&mut tail[0], &mut head[b.index()])
        }
    }

    /// Iterate all tables in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &ArchetypeTable> {
        self.tables.iter()
    }

    /// All tables in creation order, mutably.
    pub fn tables_mut(&mut self) -> &mut [ArchetypeTable] {
        &mut self.tables
    }

    /// Number of archetypes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns `true` if no archetype exists yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl Index<ArchetypeId> for ArchetypeDirectory {
    type Output = ArchetypeTable;

    fn index(&self, id: ArchetypeId) -> &ArchetypeTable {
        &self.tables[id.index()]
    }
}

impl IndexMut<ArchetypeId> for ArchetypeDirectory {
    fn index_mut(&mut self, id: ArchetypeId) -> &mut ArchetypeTable {
        &mut self.tables[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use tessera_component::{Component, ComponentTypeId};

    use super::*;

    struct Position(f32);
    impl Component for Position {}

    struct Velocity(f32);
    impl Component for Velocity {}

    fn setup() -> (ArchetypeDirectory, ComponentRegistry, ComponentTypeId, ComponentTypeId) {
        let mut registry = ComponentRegistry::new();
        let pos = registry.register::<Position>();
        let vel = registry.register::<Velocity>();
        (ArchetypeDirectory::new(4), registry, pos, vel)
    }

    #[test]
    fn test_get_or_create_is_unique_per_signature() {
        let (mut directory, registry, pos, vel) = setup();
        let a = directory.get_or_create(&Signature::from_ids([pos, vel]), &registry);
        let b = directory.get_or_create(&Signature::from_ids([vel, pos]), &registry);
        assert_eq!(a, b);
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn test_generation_bumps_only_on_create() {
        let (mut directory, registry, pos, vel) = setup();
        assert_eq!(directory.generation(), 0);

        directory.get_or_create(&Signature::from_ids([pos]), &registry);
        assert_eq!(directory.generation(), 1);
        directory.get_or_create(&Signature::from_ids([pos]), &registry);
        assert_eq!(directory.generation(), 1);
        directory.get_or_create(&Signature::from_ids([pos, vel]), &registry);
        assert_eq!(directory.generation(), 2);
    }

    #[test]
    fn test_ids_follow_creation_order() {
        let (mut directory, registry, pos, vel) = setup();
        let first = directory.get_or_create(&Signature::from_ids([vel]), &registry);
        let second = directory.get_or_create(&Signature::from_ids([pos]), &registry);
        assert_eq!(first, ArchetypeId(0));
        assert_eq!(second, ArchetypeId(1));
        let order: Vec<ArchetypeId> = directory.iter().map(ArchetypeTable::id).collect();
        assert_eq!(order, vec![first, second]);
    }

    #[test]
    fn test_created_table_has_all_columns() {
        let (mut directory, registry, pos, vel) = setup();
        let id = directory.get_or_create(&Signature::from_ids([pos, vel]), &registry);
        let table = &directory[id];
        assert!(table.column::<Position>(pos).is_some());
        assert!(table.column::<Velocity>(vel).is_some());
        assert!(table.is_empty());
    }

    #[test]
    fn test_find_does_not_create() {
        let (mut directory, registry, pos, _) = setup();
        let signature = Signature::from_ids([pos]);
        assert_eq!(directory.find(&signature), None);
        let id = directory.get_or_create(&signature, &registry);
        assert_eq!(directory.find(&signature), Some(id));
        assert_eq!(directory.generation(), 1);
    }

    #[test]
    fn test_pair_mut_either_order() {
        let (mut directory, registry, pos, vel) = setup();
        let a = directory.get_or_create(&Signature::from_ids([pos]), &registry);
        let b = directory.get_or_create(&Signature::from_ids([vel]), &registry);

        let (first, second) = directory.pair_mut(a, b);
        assert_eq!((first.id(), second.id()), (a, b));
        let (first, second) = directory.pair_mut(b, a);
        assert_eq!((first.id(), second.id()), (b, a));
    }

    #[test]
    #[should_panic(expected = "twice")]
    fn test_pair_mut_same_id_panics() {
        let (mut directory, registry, pos, _) = setup();
        let a = directory.get_or_create(&Signature::from_ids([pos]), &registry);
        directory.pair_mut(a, a);
    }
}
