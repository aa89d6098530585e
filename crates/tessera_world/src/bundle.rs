//! Component bundles: tuples of components inserted together.
//!
//! [`World::spawn_with`](crate::World::spawn_with) places a bundle straight
//! into the archetype of its full signature, without passing through the
//! intermediate archetypes one `add_component` per type would create.

use tessera_component::{ArchetypeTable, Component, ComponentRegistry, ComponentTypeId};

/// A statically known set of components, implemented for tuples of one to
/// eight [`Component`]s.
pub trait Bundle: 'static {
    /// Register every component type of the bundle and append their ids to
    /// `ids`, in tuple order.
    fn register(registry: &mut ComponentRegistry, ids: &mut Vec<ComponentTypeId>);

    /// Push one cell per component into `table`.
    ///
    /// The table must have a column for every component in the bundle and a
    /// row reserved for them.
    fn write(self, registry: &mut ComponentRegistry, table: &mut ArchetypeTable);
}

macro_rules! impl_bundle {
    ($($name:ident),+) => {
        impl<$($name: Component),+> Bundle for ($($name,)+) {
            fn register(registry: &mut ComponentRegistry, ids: &mut Vec<ComponentTypeId>) {
                $(ids.push(registry.register::<$name>());)+
            }

            #[allow(non_snake_case)]
            fn write(self, registry: &mut ComponentRegistry, table: &mut ArchetypeTable) {
                let ($($name,)+) = self;
                $(table.push_cell(registry.register::<$name>(), $name);)+
            }
        }
    };
}

impl_bundle!(A);
impl_bundle!(A, B);
impl_bundle!(A, B, C);
impl_bundle!(A, B, C, D);
impl_bundle!(A, B, C, D, E);
impl_bundle!(A, B, C, D, E, F);
impl_bundle!(A, B, C, D, E, F, G);
impl_bundle!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use tessera_component::{ArchetypeId, Entity, Signature};

    use super::*;

    #[derive(Debug, PartialEq)]
    struct Name(&'static str);
    impl Component for Name {}

    #[derive(Debug, PartialEq)]
    struct Level(u8);
    impl Component for Level {}

    #[test]
    fn test_register_lists_ids_in_tuple_order() {
        let mut registry = ComponentRegistry::new();
        registry.register::<Level>();
        let mut ids = Vec::new();
        <(Name, Level)>::register(&mut registry, &mut ids);
        assert_eq!(ids, vec![ComponentTypeId(1), ComponentTypeId(0)]);
    }

    #[test]
    fn test_duplicate_types_are_listed_twice() {
        let mut registry = ComponentRegistry::new();
        let mut ids = Vec::new();
        <(Level, Level)>::register(&mut registry, &mut ids);
        assert_eq!(ids, vec![ComponentTypeId(0), ComponentTypeId(0)]);
    }

    #[test]
    fn test_write_fills_every_column() {
        let mut registry = ComponentRegistry::new();
        let mut ids = Vec::new();
        <(Name, Level)>::register(&mut registry, &mut ids);
        let signature = Signature::from_ids(ids.iter().copied());
        let columns = signature
            .ids()
            .filter_map(|id| Some((id, registry.new_column(id)?)))
            .collect();
        let mut table = ArchetypeTable::new(ArchetypeId(0), signature, columns, 2);

        table.append_row(Entity(0), |t| (Name("ada"), Level(3)).write(&mut registry, t));
        assert_eq!(table.get::<Name>(ids[0], 0), Some(&Name("ada")));
        assert_eq!(table.get::<Level>(ids[1], 0), Some(&Level(3)));
    }
}
