//! Queries over the archetypes of a world.
//!
//! A query is declared once and reused. Its list of matching archetypes is
//! cached together with the directory generation it was computed at; since
//! new archetypes are the only thing that can change the answer, the cache is
//! rebuilt only when the generation moves.
//!
//! The typed layer turns a tuple type such as `(&mut Position, &Velocity)`
//! into a [`QueryDescriptor`] and, per matched archetype, into a set of
//! column iterators advanced in lockstep.
//!
//! # Examples
//!
//! ```rust
//! use tessera_world::prelude::*;
//!
//! struct Position(f32);
//! impl Component for Position {}
//! struct Velocity(f32);
//! impl Component for Velocity {}
//! struct Frozen;
//! impl Component for Frozen {}
//!
//! let mut world = World::new();
//! world.spawn_with((Position(0.0), Velocity(1.0))).unwrap();
//! world.spawn_with((Position(0.0), Velocity(1.0), Frozen)).unwrap();
//!
//! let mut movers = world.query_filtered::<(&mut Position, &Velocity), Without<Frozen>>();
//! world.for_each(&mut movers, |_, (position, velocity)| position.0 += velocity.0);
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::slice;

use tessera_component::{
    ArchetypeId, ArchetypeTable, Component, ComponentRegistry, ComponentTypeId, Entity,
    QueryDescriptor, Signature, TableColumns,
};
use tracing::debug;

use crate::directory::ArchetypeDirectory;
use crate::world::WorldId;

/// Collects the descriptor of a typed query while it is being built, and
/// rejects queries that access one component twice.
#[derive(Debug, Default)]
pub struct QueryAccess {
    descriptor: QueryDescriptor,
    accessed: Signature,
}

impl QueryAccess {
    /// Start with an empty descriptor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch `id` and require archetypes to have it.
    pub fn require(&mut self, id: ComponentTypeId, name: &'static str) {
        self.access(id, name);
        self.descriptor.required.insert(id);
    }

    /// Fetch `id` when present.
    pub fn optional(&mut self, id: ComponentTypeId, name: &'static str) {
        self.access(id, name);
        self.descriptor.optional.insert(id);
    }

    /// Require `id` without fetching it.
    pub fn with(&mut self, id: ComponentTypeId) {
        self.descriptor.required.insert(id);
    }

    /// Reject archetypes that have `id`.
    pub fn without(&mut self, id: ComponentTypeId) {
        self.descriptor.excluded.insert(id);
    }

    /// Finish building and return the collected descriptor.
    #[must_use]
    pub fn into_descriptor(self) -> QueryDescriptor {
        self.descriptor
    }

    fn access(&mut self, id: ComponentTypeId, name: &'static str) {
        assert!(
            !self.accessed.has(id),
            "`{name}` is accessed more than once in the same query"
        );
        self.accessed.insert(id);
    }
}

/// Data a query yields for each entity.
///
/// Implemented for `&T`, `&mut T`, `Option<&T>`, `Option<&mut T>`, [`Entity`],
/// `()` and tuples of up to eight of these.
pub trait QueryData {
    /// Resolved component ids, computed once when the query is built.
    type State: Copy + fmt::Debug + 'static;
    /// Per-archetype cursor over the columns this element reads.
    type Fetch<'w>;
    /// What one row yields.
    type Item<'w>;

    /// Register the components this element touches and record its access.
    fn init(registry: &mut ComponentRegistry, access: &mut QueryAccess) -> Self::State;

    /// Borrow the columns of one matched archetype.
    fn fetch<'w>(state: Self::State, columns: &mut TableColumns<'w>) -> Self::Fetch<'w>;

    /// Advance to the next row. Called exactly once per row of the archetype.
    fn next<'w>(fetch: &mut Self::Fetch<'w>) -> Self::Item<'w>;
}

/// Restricts which archetypes a query matches without fetching anything.
pub trait QueryFilter {
    /// Register the filtered components and record them on `access`.
    fn init(registry: &mut ComponentRegistry, access: &mut QueryAccess);
}

/// Filter: the archetype must have `T`.
pub struct With<T>(PhantomData<fn() -> T>);

/// Filter: the archetype must not have `T`.
pub struct Without<T>(PhantomData<fn() -> T>);

fn next_cell<I: Iterator>(cells: &mut I) -> I::Item {
    let Some(cell) = cells.next() else {
        panic!("archetype column is shorter than its entity list");
    };
    cell
}

fn required_column<'w, T: 'static>(
    columns: &mut TableColumns<'w>,
    id: ComponentTypeId,
) -> &'w mut [T] {
    let Some(column) = columns.take::<T>(id) else {
        panic!("matched archetype has no `{}` column", std::any::type_name::<T>());
    };
    column
}

impl QueryData for () {
    type State = ();
    type Fetch<'w> = ();
    type Item<'w> = ();

    fn init(_: &mut ComponentRegistry, _: &mut QueryAccess) {}

    fn fetch<'w>(_: (), _: &mut TableColumns<'w>) {}

    fn next<'w>(_: &mut Self::Fetch<'w>) -> Self::Item<'w> {}
}

impl QueryData for Entity {
    type State = ();
    type Fetch<'w> = slice::Iter<'w, Entity>;
    type Item<'w> = Entity;

    fn init(_: &mut ComponentRegistry, _: &mut QueryAccess) {}

    fn fetch<'w>(_: (), columns: &mut TableColumns<'w>) -> Self::Fetch<'w> {
        columns.entities().iter()
    }

    fn next<'w>(fetch: &mut Self::Fetch<'w>) -> Self::Item<'w> {
        *next_cell(fetch)
    }
}

impl<T: Component> QueryData for &T {
    type State = ComponentTypeId;
    type Fetch<'w> = slice::Iter<'w, T>;
    type Item<'w> = &'w T;

    fn init(registry: &mut ComponentRegistry, access: &mut QueryAccess) -> ComponentTypeId {
        let id = registry.register::<T>();
        access.require(id, T::type_name());
        id
    }

    fn fetch<'w>(id: ComponentTypeId, columns: &mut TableColumns<'w>) -> Self::Fetch<'w> {
        let column: &'w [T] = required_column(columns, id);
        column.iter()
    }

    fn next<'w>(fetch: &mut Self::Fetch<'w>) -> &'w T {
        next_cell(fetch)
    }
}

impl<T: Component> QueryData for &mut T {
    type State = ComponentTypeId;
    type Fetch<'w> = slice::IterMut<'w, T>;
    type Item<'w> = &'w mut T;

    fn init(registry: &mut ComponentRegistry, access: &mut QueryAccess) -> ComponentTypeId {
        let id = registry.register::<T>();
        access.require(id, T::type_name());
        id
    }

    fn fetch<'w>(id: ComponentTypeId, columns: &mut TableColumns<'w>) -> Self::Fetch<'w> {
        required_column(columns, id).iter_mut()
    }

    fn next<'w>(fetch: &mut Self::Fetch<'w>) -> &'w mut T {
        next_cell(fetch)
    }
}

impl<T: Component> QueryData for Option<&T> {
    type State = ComponentTypeId;
    type Fetch<'w> = Option<slice::Iter<'w, T>>;
    type Item<'w> = Option<&'w T>;

    fn init(registry: &mut ComponentRegistry, access: &mut QueryAccess) -> ComponentTypeId {
        let id = registry.register::<T>();
        access.optional(id, T::type_name());
        id
    }

    fn fetch<'w>(id: ComponentTypeId, columns: &mut TableColumns<'w>) -> Self::Fetch<'w> {
        columns.take::<T>(id).map(|column| column.iter())
    }

    fn next<'w>(fetch: &mut Self::Fetch<'w>) -> Option<&'w T> {
        fetch.as_mut().map(next_cell)
    }
}

impl<T: Component> QueryData for Option<&mut T> {
    type State = ComponentTypeId;
    type Fetch<'w> = Option<slice::IterMut<'w, T>>;
    type Item<'w> = Option<&'w mut T>;

    fn init(registry: &mut ComponentRegistry, access: &mut QueryAccess) -> ComponentTypeId {
        let id = registry.register::<T>();
        access.optional(id, T::type_name());
        id
    }

    fn fetch<'w>(id: ComponentTypeId, columns: &mut TableColumns<'w>) -> Self::Fetch<'w> {
        columns.take::<T>(id).map(<[T]>::iter_mut)
    }

    fn next<'w>(fetch: &mut Self::Fetch<'w>) -> Option<&'w mut T> {
        fetch.as_mut().map(next_cell)
    }
}

macro_rules! impl_query_data {
    ($($name:ident),+) => {
        #[allow(non_snake_case)]
        impl<$($name: QueryData),+> QueryData for ($($name,)+) {
            type State = ($($name::State,)+);
            type Fetch<'w> = ($($name::Fetch<'w>,)+);
            type Item<'w> = ($($name::Item<'w>,)+);

            fn init(registry: &mut ComponentRegistry, access: &mut QueryAccess) -> Self::State {
                ($($name::init(registry, access),)+)
            }

            fn fetch<'w>(state: Self::State, columns: &mut TableColumns<'w>) -> Self::Fetch<'w> {
                let ($($name,)+) = state;
                ($($name::fetch($name, columns),)+)
            }

            fn next<'w>(fetch: &mut Self::Fetch<'w>) -> Self::Item<'w> {
                let ($($name,)+) = fetch;
                ($($name::next($name),)+)
            }
        }
    };
}

impl_query_data!(A);
impl_query_data!(A, B);
impl_query_data!(A, B, C);
impl_query_data!(A, B, C, D);
impl_query_data!(A, B, C, D, E);
impl_query_data!(A, B, C, D, E, F);
impl_query_data!(A, B, C, D, E, F, G);
impl_query_data!(A, B, C, D, E, F, G, H);

impl QueryFilter for () {
    fn init(_: &mut ComponentRegistry, _: &mut QueryAccess) {}
}

impl<T: Component> QueryFilter for With<T> {
    fn init(registry: &mut ComponentRegistry, access: &mut QueryAccess) {
        access.with(registry.register::<T>());
    }
}

impl<T: Component> QueryFilter for Without<T> {
    fn init(registry: &mut ComponentRegistry, access: &mut QueryAccess) {
        access.without(registry.register::<T>());
    }
}

macro_rules! impl_query_filter {
    ($($name:ident),+) => {
        impl<$($name: QueryFilter),+> QueryFilter for ($($name,)+) {
            fn init(registry: &mut ComponentRegistry, access: &mut QueryAccess) {
                $($name::init(registry, access);)+
            }
        }
    };
}

impl_query_filter!(A);
impl_query_filter!(A, B);
impl_query_filter!(A, B, C);
impl_query_filter!(A, B, C, D);

/// A query descriptor plus its cached list of matching archetypes.
#[derive(Debug, Clone)]
pub struct CachedQuery {
    world: WorldId,
    descriptor: QueryDescriptor,
    archetypes: Vec<ArchetypeId>,
    generation: Option<u64>,
    rescans: u64,
}

impl CachedQuery {
    /// Create a query for `world` with an empty, invalid cache.
    #[must_use]
    pub fn new(world: WorldId, descriptor: QueryDescriptor) -> Self {
        Self {
            world,
            descriptor,
            archetypes: Vec::new(),
            generation: None,
            rescans: 0,
        }
    }

    /// The world this query was built for.
    #[must_use]
    pub fn world(&self) -> WorldId {
        self.world
    }

    /// The component sets this query matches on.
    #[must_use]
    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.descriptor
    }

    /// Directory generation the cache was built at, `None` before the first
    /// resolve.
    #[must_use]
    pub fn cached_generation(&self) -> Option<u64> {
        self.generation
    }

    /// How many times the archetype list has been rebuilt.
    #[must_use]
    pub fn rescans(&self) -> u64 {
        self.rescans
    }

    /// Matching archetypes in creation order.
    ///
    /// Rescans `directory` only if its generation differs from the cached
    /// one; otherwise returns the cached list as is.
    pub fn resolve(&mut self, directory: &ArchetypeDirectory) -> &[ArchetypeId] {
        let generation = directory.generation();
        if self.generation != Some(generation) {
            let descriptor = &self.descriptor;
            self.archetypes.clear();
            self.archetypes.extend(
                directory
                    .iter()
                    .filter(|table| descriptor.matches(table.signature()))
                    .map(ArchetypeTable::id),
            );
            self.generation = Some(generation);
            self.rescans += 1;
            debug!(
                matched = self.archetypes.len(),
                generation, "rescanned archetypes for query"
            );
        }
        &self.archetypes
    }
}

impl AsMut<CachedQuery> for CachedQuery {
    fn as_mut(&mut self) -> &mut CachedQuery {
        self
    }
}

/// A typed query: yields `(Entity, Q::Item)` for every entity whose
/// archetype has all of `Q`'s required components and passes `F`.
///
/// Built by [`World::query`](crate::World::query) or
/// [`World::query_filtered`](crate::World::query_filtered).
pub struct Query<Q: QueryData, F: QueryFilter = ()> {
    cache: CachedQuery,
    state: Q::State,
    _marker: PhantomData<fn() -> (Q, F)>,
}

impl<Q: QueryData, F: QueryFilter> Query<Q, F> {
    pub(crate) fn new(cache: CachedQuery, state: Q::State) -> Self {
        Self {
            cache,
            state,
            _marker: PhantomData,
        }
    }

    /// The untyped cache behind this query.
    #[must_use]
    pub fn cache(&self) -> &CachedQuery {
        &self.cache
    }

    /// The descriptor derived from `Q` and `F`.
    #[must_use]
    pub fn descriptor(&self) -> &QueryDescriptor {
        self.cache.descriptor()
    }

    pub(crate) fn parts(&mut self) -> (&mut CachedQuery, Q::State) {
        (&mut self.cache, self.state)
    }
}

impl<Q: QueryData, F: QueryFilter> AsMut<CachedQuery> for Query<Q, F> {
    fn as_mut(&mut self) -> &mut CachedQuery {
        &mut self.cache
    }
}

impl<Q: QueryData, F: QueryFilter> fmt::Debug for Query<Q, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("cache", &self.cache)
            .field("state", &self.state)
            .finish()
    }
}

/// Iterator over the rows matched by a [`Query`].
///
/// Each archetype's row count is fixed when its pass begins.
pub struct QueryIter<'w, Q: QueryData> {
    tables: slice::IterMut<'w, ArchetypeTable>,
    matched: slice::Iter<'w, ArchetypeId>,
    state: Q::State,
    current: Option<(slice::Iter<'w, Entity>, Q::Fetch<'w>)>,
}

impl<'w, Q: QueryData> QueryIter<'w, Q> {
    pub(crate) fn new(
        tables: &'w mut [ArchetypeTable],
        matched: &'w [ArchetypeId],
        state: Q::State,
    ) -> Self {
        Self {
            tables: tables.iter_mut(),
            matched: matched.iter(),
            state,
            current: None,
        }
    }
}

impl<'w, Q: QueryData> Iterator for QueryIter<'w, Q> {
    type Item = (Entity, Q::Item<'w>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((entities, fetch)) = &mut self.current {
                if let Some(&entity) = entities.next() {
                    return Some((entity, Q::next(fetch)));
                }
            }

            // Matched ids ascend, so the table cursor only moves forward.
            let id = *self.matched.next()?;
            let Some(table) = self.tables.find(|table| table.id() == id) else {
                panic!("matched archetype {id:?} is missing from the directory");
            };
            let mut columns = table.split_columns_mut();
            let entities = columns.entities().iter();
            let fetch = Q::fetch(self.state, &mut columns);
            self.current = Some((entities, fetch));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Position(f32);
    impl Component for Position {}

    struct Velocity(f32);
    impl Component for Velocity {}

    struct Frozen;
    impl Component for Frozen {}

    fn descriptor_of<Q: QueryData, F: QueryFilter>(registry: &mut ComponentRegistry) -> QueryDescriptor {
        let mut access = QueryAccess::new();
        Q::init(registry, &mut access);
        F::init(registry, &mut access);
        access.into_descriptor()
    }

    #[test]
    fn test_tuple_query_builds_descriptor() {
        let mut registry = ComponentRegistry::new();
        let descriptor =
            descriptor_of::<(&mut Position, Option<&Velocity>), Without<Frozen>>(&mut registry);

        assert_eq!(descriptor.required, Signature::from_ids([ComponentTypeId(0)]));
        assert_eq!(descriptor.optional, Signature::from_ids([ComponentTypeId(1)]));
        assert_eq!(descriptor.excluded, Signature::from_ids([ComponentTypeId(2)]));
    }

    #[test]
    fn test_with_filter_requires_without_fetching() {
        let mut registry = ComponentRegistry::new();
        let descriptor = descriptor_of::<(Entity, &Position), (With<Frozen>,)>(&mut registry);
        assert_eq!(
            descriptor.required,
            Signature::from_ids([ComponentTypeId(0), ComponentTypeId(1)])
        );
        assert!(descriptor.excluded.is_empty());
    }

    #[test]
    #[should_panic(expected = "more than once")]
    fn test_duplicate_access_panics() {
        let mut registry = ComponentRegistry::new();
        descriptor_of::<(&Position, &mut Position), ()>(&mut registry);
    }

    #[test]
    #[should_panic(expected = "more than once")]
    fn test_duplicate_optional_access_panics() {
        let mut registry = ComponentRegistry::new();
        descriptor_of::<(&Position, Option<&Position>), ()>(&mut registry);
    }

    #[test]
    fn test_resolve_only_rescans_on_new_generation() {
        let mut registry = ComponentRegistry::new();
        let pos = registry.register::<Position>();
        let vel = registry.register::<Velocity>();
        let mut directory = ArchetypeDirectory::new(4);
        let a = directory.get_or_create(&Signature::from_ids([pos]), &registry);

        let mut query = CachedQuery::new(WorldId::new(), QueryDescriptor::new().require(pos));
        assert_eq!(query.cached_generation(), None);
        assert_eq!(query.resolve(&directory), &[a]);
        assert_eq!(query.rescans(), 1);
        query.resolve(&directory);
        assert_eq!(query.rescans(), 1);

        directory.get_or_create(&Signature::from_ids([vel]), &registry);
        let b = directory.get_or_create(&Signature::from_ids([pos, vel]), &registry);
        assert_eq!(query.resolve(&directory), &[a, b]);
        assert_eq!(query.rescans(), 2);
        assert_eq!(query.cached_generation(), Some(3));
    }

    #[test]
    fn test_resolve_skips_excluded_archetypes() {
        let mut registry = ComponentRegistry::new();
        let pos = registry.register::<Position>();
        let frozen = registry.register::<Frozen>();
        let mut directory = ArchetypeDirectory::new(4);
        let moving = directory.get_or_create(&Signature::from_ids([pos]), &registry);
        directory.get_or_create(&Signature::from_ids([pos, frozen]), &registry);

        let descriptor = QueryDescriptor::new().require(pos).exclude(frozen);
        let mut query = CachedQuery::new(WorldId::new(), descriptor);
        assert_eq!(query.resolve(&directory), &[moving]);
    }

    #[test]
    fn test_iter_walks_matched_tables_in_order() {
        let mut registry = ComponentRegistry::new();
        let pos = registry.register::<Position>();
        let vel = registry.register::<Velocity>();
        let mut directory = ArchetypeDirectory::new(4);
        let a = directory.get_or_create(&Signature::from_ids([pos]), &registry);
        let b = directory.get_or_create(&Signature::from_ids([vel]), &registry);
        let c = directory.get_or_create(&Signature::from_ids([pos, vel]), &registry);
        directory[a].append_row(Entity(0), |t| t.push_cell(pos, Position(1.0)));
        directory[b].append_row(Entity(1), |t| t.push_cell(vel, Velocity(9.0)));
        directory[c].append_row(Entity(2), |t| {
            t.push_cell(pos, Position(2.0));
            t.push_cell(vel, Velocity(3.0));
        });

        let matched = vec![a, c];
        let state = <(&Position, Option<&Velocity>)>::init(&mut registry, &mut QueryAccess::new());
        let rows: Vec<(Entity, f32, Option<f32>)> =
            QueryIter::<(&Position, Option<&Velocity>)>::new(directory.tables_mut(), &matched, state)
                .map(|(entity, (position, velocity))| (entity, position.0, velocity.map(|v| v.0)))
                .collect();
        assert_eq!(
            rows,
            vec![(Entity(0), 1.0, None), (Entity(2), 2.0, Some(3.0))]
        );
    }
}
