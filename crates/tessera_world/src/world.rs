//! The [`World`]: entity lifecycle, component migration and queries.
//!
//! A world owns every registry of the engine: component ids, entity ids,
//! archetype tables, entity locations and state. Two worlds share nothing;
//! ids issued by one are meaningless to the other.
//!
//! Adding or removing a component moves the entity's row into the archetype
//! of its new signature. The destination row is reserved and its new cell
//! written before the source row is removed, so a migration never leaves an
//! entity half in one table and half in another.

use std::fmt;

use tessera_component::{
    ArchetypeId, Component, ComponentRegistry, ComponentTypeId, Entity, EntityAllocator,
    MovedRow, QueryDescriptor, Signature,
};
use tracing::{trace, warn};
use uuid::Uuid;

use crate::bundle::Bundle;
use crate::config::WorldConfig;
use crate::directory::ArchetypeDirectory;
use crate::error::{WorldError, WorldResult};
use crate::location::{EntityLocation, EntityLocations};
use crate::query::{CachedQuery, Query, QueryAccess, QueryData, QueryFilter, QueryIter};
use crate::state::StateRegistry;

/// Unique identity of a [`World`], recorded by every query built for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorldId(Uuid);

impl WorldId {
    /// Generate a new random world id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying uuid.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for WorldId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Archetype-based entity and component storage.
#[derive(Debug)]
pub struct World {
    id: WorldId,
    config: WorldConfig,
    registry: ComponentRegistry,
    allocator: EntityAllocator,
    directory: ArchetypeDirectory,
    locations: EntityLocations,
    state: StateRegistry,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Create an empty world with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::build(WorldConfig::default())
    }

    /// Create an empty world, rejecting an invalid configuration.
    pub fn with_config(config: WorldConfig) -> WorldResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: WorldConfig) -> Self {
        Self {
            id: WorldId::new(),
            registry: ComponentRegistry::with_capacity(config.signature_hint),
            allocator: EntityAllocator::new(),
            directory: ArchetypeDirectory::new(config.initial_capacity),
            locations: EntityLocations::new(),
            state: StateRegistry::new(),
            config,
        }
    }

    /// This world's identity.
    #[must_use]
    pub fn id(&self) -> WorldId {
        self.id
    }

    /// The configuration the world was built with.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Component types registered so far.
    #[must_use]
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Every archetype table, in creation order.
    #[must_use]
    pub fn directory(&self) -> &ArchetypeDirectory {
        &self.directory
    }

    /// Current archetype directory generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.directory.generation()
    }

    /// Number of archetypes created so far. Empty ones are kept.
    #[must_use]
    pub fn archetype_count(&self) -> usize {
        self.directory.len()
    }

    /// Number of entities that occupy a row in some archetype.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.locations.len()
    }

    /// Number of live entities, including those without components.
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.allocator.alive_count()
    }

    /// Register `T` ahead of its first use and return its id.
    pub fn register_component<T: Component>(&mut self) -> ComponentTypeId {
        self.registry.register::<T>()
    }

    /// The id of `T`, if it has been registered.
    #[must_use]
    pub fn component_id<T: Component>(&self) -> Option<ComponentTypeId> {
        self.registry.id_of::<T>()
    }

    /// Returns `true` if `entity` has been spawned and not destroyed.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.allocator.is_alive(entity)
    }

    /// Where `entity`'s row lives, if it has any component.
    #[must_use]
    pub fn location(&self, entity: Entity) -> Option<EntityLocation> {
        self.locations.get(entity)
    }

    /// The component set of `entity`, if it has any component.
    #[must_use]
    pub fn signature_of(&self, entity: Entity) -> Option<&Signature> {
        let location = self.locations.get(entity)?;
        Some(self.directory[location.archetype].signature())
    }

    // -- Entity lifecycle --

    /// Allocate an entity with no components.
    ///
    /// The entity is alive but occupies no archetype until its first
    /// component is added.
    pub fn spawn(&mut self) -> Entity {
        self.allocator.allocate()
    }

    /// Allocate an entity and place it directly into the archetype of
    /// `bundle`.
    pub fn spawn_with<B: Bundle>(&mut self, bundle: B) -> WorldResult<Entity> {
        let mut ids = Vec::new();
        B::register(&mut self.registry, &mut ids);
        let signature = Signature::from_ids(ids.iter().copied());
        if signature.len() != ids.len() {
            let duplicate = ids
                .iter()
                .enumerate()
                .find_map(|(i, id)| ids[..i].contains(id).then_some(*id))
                .map_or("<unknown>", |id| self.registry.name_of(id));
            warn!(component = duplicate, "rejected bundle with a repeated component");
            return Err(WorldError::DuplicateComponent(duplicate));
        }

        let entity = self.allocator.allocate();
        let archetype = self.directory.get_or_create(&signature, &self.registry);
        let registry = &mut self.registry;
        let row = self.directory[archetype].append_row(entity, |table| bundle.write(registry, table));
        self.locations.insert(entity, EntityLocation { archetype, row });
        Ok(entity)
    }

    /// Destroy `entity`, dropping all of its components and recycling its id.
    pub fn destroy(&mut self, entity: Entity) -> WorldResult<()> {
        self.ensure_alive(entity)?;
        if let Some(location) = self.locations.remove(entity) {
            let displaced = self.directory[location.archetype].swap_remove_row(location.row);
            if let Some(displaced) = displaced {
                self.locations.set_row(displaced, location.row);
            }
        }
        self.allocator.free(entity);
        trace!(entity = entity.0, "destroyed entity");
        Ok(())
    }

    // -- Components --

    /// Attach `value` to `entity`.
    ///
    /// If the entity already has a `T`, it is overwritten in place and the
    /// previous value returned. Otherwise the entity migrates to the
    /// archetype of its signature plus `T`.
    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) -> WorldResult<Option<T>> {
        self.ensure_alive(entity)?;
        let type_id = self.registry.register::<T>();

        let Some(location) = self.locations.get(entity) else {
            let archetype = self
                .directory
                .get_or_create(&Signature::from_ids([type_id]), &self.registry);
            let row = self.directory[archetype].append_row(entity, |table| table.push_cell(type_id, value));
            self.locations.insert(entity, EntityLocation { archetype, row });
            return Ok(None);
        };

        let source = &mut self.directory[location.archetype];
        if source.has_component(type_id) {
            let Some(cell) = source.get_mut::<T>(type_id, location.row) else {
                panic!("{entity} is recorded at a row its archetype does not have");
            };
            return Ok(Some(std::mem::replace(cell, value)));
        }

        let signature = source.signature().with(type_id);
        let target = self.directory.get_or_create(&signature, &self.registry);
        let (src, dst) = self.directory.pair_mut(location.archetype, target);
        dst.reserve_row();
        dst.push_cell(type_id, value);
        let moved = src.migrate_row(location.row, dst, None);
        self.relocate(entity, location, target, moved);
        Ok(None)
    }

    /// Detach and return `entity`'s `T`.
    ///
    /// Removing the last component destroys the entity: there is no
    /// archetype for the empty signature to move it into.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> WorldResult<T> {
        self.ensure_alive(entity)?;
        let location = self.locations.get(entity);
        let (Some(type_id), Some(location)) = (self.registry.id_of::<T>(), location) else {
            return Err(self.missing_component::<T>(entity));
        };
        let source = &self.directory[location.archetype];
        if !source.has_component(type_id) {
            return Err(self.missing_component::<T>(entity));
        }

        let signature = source.signature().without(type_id);
        let mut slot: Option<T> = None;
        if signature.is_empty() {
            let displaced =
                self.directory[location.archetype].take_row(location.row, type_id, &mut slot);
            if let Some(displaced) = displaced {
                self.locations.set_row(displaced, location.row);
            }
            self.locations.remove(entity);
            self.allocator.free(entity);
            trace!(entity = entity.0, "removed last component, entity destroyed");
        } else {
            let target = self.directory.get_or_create(&signature, &self.registry);
            let (src, dst) = self.directory.pair_mut(location.archetype, target);
            let moved = src.migrate_row(
                location.row,
                dst,
                Some((type_id, &mut slot as &mut dyn std::any::Any)),
            );
            self.relocate(entity, location, target, moved);
        }

        match slot {
            Some(value) => Ok(value),
            None => panic!("`{}` cell of {entity} was not handed back", T::type_name()),
        }
    }

    /// Borrow `entity`'s `T`.
    pub fn get_component<T: Component>(&self, entity: Entity) -> WorldResult<&T> {
        self.ensure_alive(entity)?;
        let missing = WorldError::MissingComponent {
            entity,
            component: T::type_name(),
        };
        let (Some(type_id), Some(location)) = (self.registry.id_of::<T>(), self.locations.get(entity)) else {
            return Err(missing);
        };
        self.directory[location.archetype]
            .get::<T>(type_id, location.row)
            .ok_or(missing)
    }

    /// Mutably borrow `entity`'s `T`.
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> WorldResult<&mut T> {
        self.ensure_alive(entity)?;
        let missing = WorldError::MissingComponent {
            entity,
            component: T::type_name(),
        };
        let (Some(type_id), Some(location)) = (self.registry.id_of::<T>(), self.locations.get(entity)) else {
            return Err(missing);
        };
        self.directory[location.archetype]
            .get_mut::<T>(type_id, location.row)
            .ok_or(missing)
    }

    /// Returns `true` if `entity` is alive and has a `T`.
    #[must_use]
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        match (self.registry.id_of::<T>(), self.locations.get(entity)) {
            (Some(type_id), Some(location)) => {
                self.directory[location.archetype].has_component(type_id)
            }
            _ => false,
        }
    }

    // -- Queries --

    /// Build a typed query, registering its component types as needed.
    ///
    /// # Panics
    ///
    /// Panics if `Q` accesses one component type more than once.
    pub fn query<Q: QueryData>(&mut self) -> Query<Q> {
        self.query_filtered::<Q, ()>()
    }

    /// Build a typed query with an archetype filter.
    ///
    /// # Panics
    ///
    /// Panics if `Q` accesses one component type more than once.
    pub fn query_filtered<Q: QueryData, F: QueryFilter>(&mut self) -> Query<Q, F> {
        let mut access = QueryAccess::new();
        let state = Q::init(&mut self.registry, &mut access);
        F::init(&mut self.registry, &mut access);
        Query::new(self.new_cache(access.into_descriptor()), state)
    }

    /// Build an untyped query from a descriptor of already registered ids.
    pub fn cached_query(&self, descriptor: QueryDescriptor) -> WorldResult<CachedQuery> {
        if let Some(id) = descriptor.mentioned().ids().find(|id| !self.registry.contains(*id)) {
            warn!(component = id.0, "query mentions an unregistered component id");
            return Err(WorldError::UnknownComponentId(id));
        }
        Ok(self.new_cache(descriptor))
    }

    /// Archetypes matching `query`, in creation order, rescanning only if an
    /// archetype was created since the last call.
    ///
    /// # Panics
    ///
    /// Panics if `query` was built for another world.
    pub fn resolve<'q>(&self, query: &'q mut impl AsMut<CachedQuery>) -> &'q [ArchetypeId] {
        let cache: &mut CachedQuery = query.as_mut();
        self.check_world(cache);
        cache.resolve(&self.directory)
    }

    /// Entities in every archetype matching `query`.
    pub fn entities(&self, query: &mut impl AsMut<CachedQuery>) -> Vec<Entity> {
        self.resolve(query)
            .iter()
            .flat_map(|&id| self.directory[id].entities().iter().copied())
            .collect()
    }

    /// Iterate the rows matched by `query`.
    ///
    /// The iterator holds the world mutably, so no entity can be spawned,
    /// destroyed or migrated until it is dropped. Cell values may be changed
    /// through `&mut T` items.
    ///
    /// # Panics
    ///
    /// Panics if `query` was built for another world.
    pub fn iter<'w, Q: QueryData, F: QueryFilter>(&'w mut self, query: &'w mut Query<Q, F>) -> QueryIter<'w, Q> {
        let (cache, state) = query.parts();
        self.check_world(cache);
        let matched = cache.resolve(&self.directory);
        QueryIter::new(self.directory.tables_mut(), matched, state)
    }

    /// Call `visit` for every row matched by `query`.
    pub fn for_each<'w, Q: QueryData, F: QueryFilter>(
        &'w mut self,
        query: &'w mut Query<Q, F>,
        mut visit: impl FnMut(Entity, Q::Item<'w>),
    ) {
        for (entity, item) in self.iter(query) {
            visit(entity, item);
        }
    }

    // -- State --

    /// Store a world-scoped value, replacing and returning any previous value
    /// of the same type.
    pub fn insert_state<S: 'static>(&mut self, value: S) -> Option<S> {
        self.state.insert(value)
    }

    /// Borrow the state value of type `S`.
    pub fn state<S: 'static>(&self) -> WorldResult<&S> {
        self.state.get::<S>().ok_or_else(missing_state::<S>)
    }

    /// Mutably borrow the state value of type `S`.
    pub fn state_mut<S: 'static>(&mut self) -> WorldResult<&mut S> {
        self.state.get_mut::<S>().ok_or_else(missing_state::<S>)
    }

    /// Take the state value of type `S` out of the world.
    pub fn remove_state<S: 'static>(&mut self) -> Option<S> {
        self.state.remove::<S>()
    }

    /// Returns `true` if a state value of type `S` is stored.
    #[must_use]
    pub fn has_state<S: 'static>(&self) -> bool {
        self.state.contains::<S>()
    }

    // -- Internals --

    fn ensure_alive(&self, entity: Entity) -> WorldResult<()> {
        if self.allocator.is_alive(entity) {
            return Ok(());
        }
        warn!(entity = entity.0, "operation on an entity that is not alive");
        Err(WorldError::NoSuchEntity(entity))
    }

    fn missing_component<T: Component>(&self, entity: Entity) -> WorldError {
        warn!(entity = entity.0, component = T::type_name(), "entity lacks component");
        WorldError::MissingComponent {
            entity,
            component: T::type_name(),
        }
    }

    fn new_cache(&self, descriptor: QueryDescriptor) -> CachedQuery {
        if descriptor.is_contradictory() {
            warn!(?descriptor, "query requires and excludes the same component and matches nothing");
        }
        CachedQuery::new(self.id, descriptor)
    }

    fn check_world(&self, query: &CachedQuery) {
        assert_eq!(
            query.world(),
            self.id,
            "query was built for world {} but used with world {}",
            query.world(),
            self.id
        );
    }

    /// Record a finished migration of `entity` out of `from`.
    fn relocate(&mut self, entity: Entity, from: EntityLocation, to: ArchetypeId, moved: MovedRow) {
        if let Some(displaced) = moved.displaced {
            self.locations.set_row(displaced, from.row);
        }
        self.locations.insert(entity, EntityLocation { archetype: to, row: moved.row });
    }
}

fn missing_state<S: 'static>() -> WorldError {
    let name = std::any::type_name::<S>();
    warn!(state = name, "state has not been inserted");
    WorldError::MissingState(name)
}
