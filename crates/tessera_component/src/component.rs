//! Core [`Component`] trait, component identifiers and the per-world registry.
//!
//! Every piece of data stored in the engine must implement [`Component`]. A
//! [`ComponentRegistry`] assigns each distinct Rust type a [`ComponentTypeId`]
//! the first time the type is seen. Ids are dense, start at 0 and are never
//! reused, so they double as bit positions in a [`Signature`](crate::Signature).
//!
//! The registry also remembers how to build an empty column for each type,
//! which is what lets an archetype allocate all of its columns up front from
//! nothing but a signature.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::column::{Column, ErasedColumn};

/// A compact identifier for a component type, assigned by a
/// [`ComponentRegistry`] in registration order.
///
/// Ids are only meaningful within the registry (and therefore the world) that
/// issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct ComponentTypeId(pub u32);

impl ComponentTypeId {
    /// Returns the id as a bit / slot index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentTypeId({})", self.0)
    }
}

/// The core component trait.
///
/// All data stored in the engine must implement this trait. The field layout
/// of a component is its Rust struct; each component type gets exactly one
/// column per archetype, holding a `Vec<Self>`.
///
/// # Examples
///
/// ```rust
/// use tessera_component::Component;
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl Component for Health {
///     fn type_name() -> &'static str { "Health" }
/// }
/// ```
pub trait Component: 'static {
    /// A human-readable name for this component type, used in errors and logs.
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Metadata about a registered component type.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    /// The id assigned by the registry.
    pub id: ComponentTypeId,
    /// The human-readable name of the component (e.g. `"Health"`).
    pub name: &'static str,
    /// The Rust type identity the id was assigned to.
    pub type_id: TypeId,
    /// Size and alignment of one component instance.
    pub layout: std::alloc::Layout,
    new_column: fn() -> Box<dyn ErasedColumn>,
}

impl ComponentInfo {
    fn of<T: Component>(id: ComponentTypeId) -> Self {
        Self {
            id,
            name: T::type_name(),
            type_id: TypeId::of::<T>(),
            layout: std::alloc::Layout::new::<T>(),
            new_column: || Box::new(Column::<T>::new()),
        }
    }

    /// Build an empty column able to hold values of this component type.
    #[must_use]
    pub fn new_column(&self) -> Box<dyn ErasedColumn> {
        (self.new_column)()
    }
}

/// Assigns stable, monotonically increasing ids to component types.
///
/// One registry belongs to one world. Registering a type that is already
/// known returns its existing id.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    by_type: HashMap<TypeId, ComponentTypeId>,
    infos: Vec<ComponentInfo>,
}

impl ComponentRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry sized for `capacity` component types.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            by_type: HashMap::with_capacity(capacity),
            infos: Vec::with_capacity(capacity),
        }
    }

    /// Returns the id of `T`, assigning the next free id on first use.
    pub fn register<T: Component>(&mut self) -> ComponentTypeId {
        if let Some(&id) = self.by_type.get(&TypeId::of::<T>()) {
            return id;
        }

        let id = ComponentTypeId(self.infos.len() as u32);
        self.infos.push(ComponentInfo::of::<T>(id));
        self.by_type.insert(TypeId::of::<T>(), id);
        trace!(component = T::type_name(), id = id.0, "registered component type");
        id
    }

    /// Returns the id of `T` if it has been registered.
    #[must_use]
    pub fn id_of<T: Component>(&self) -> Option<ComponentTypeId> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Returns the metadata for a registered id.
    #[must_use]
    pub fn info(&self, id: ComponentTypeId) -> Option<&ComponentInfo> {
        self.infos.get(id.index())
    }

    /// Returns the name of a registered id, or `"<unregistered>"`.
    #[must_use]
    pub fn name_of(&self, id: ComponentTypeId) -> &'static str {
        self.info(id).map_or("<unregistered>", |info| info.name)
    }

    /// Returns `true` if `id` was issued by this registry.
    #[must_use]
    pub fn contains(&self, id: ComponentTypeId) -> bool {
        id.index() < self.infos.len()
    }

    /// Build an empty column for a registered id.
    #[must_use]
    pub fn new_column(&self, id: ComponentTypeId) -> Option<Box<dyn ErasedColumn>> {
        self.info(id).map(ComponentInfo::new_column)
    }

    /// Returns the number of registered component types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Returns `true` if no component type has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Returns an iterator over all registered component types, in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentInfo> {
        self.infos.iter()
    }
}
