//! # tessera_component
//!
//! The "C" in ECS: it defines what a component is, how a set of component types
//! is represented, and how the values of one archetype are laid out in memory.
//!
//! This crate provides:
//!
//! - [`Component`] trait: the contract all stored data must satisfy.
//! - [`ComponentRegistry`]: hands out compact [`ComponentTypeId`]s on first use.
//! - [`Signature`]: bitset over component ids, the identity of an archetype.
//! - [`Entity`]: lightweight `u32` entity identifiers.
//! - [`EntityAllocator`]: id allocator with a free list for recycling.
//! - [`Column`] / [`ErasedColumn`]: typed and type-erased component columns.
//! - [`ArchetypeTable`]: SoA storage for every entity sharing one signature.
//! - [`QueryDescriptor`]: required / excluded / optional component sets.

pub mod archetype;
pub mod column;
pub mod component;
pub mod entity;
pub mod query;
pub mod signature;

pub use archetype::{ArchetypeId, ArchetypeTable, MovedRow, TableColumns};
pub use column::{Column, ErasedColumn};
pub use component::{Component, ComponentInfo, ComponentRegistry, ComponentTypeId};
pub use entity::{Entity, EntityAllocator};
pub use query::QueryDescriptor;
pub use signature::Signature;
