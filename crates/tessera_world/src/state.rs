//! World-scoped state: singleton values keyed by their Rust type.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

struct StateEntry {
    name: &'static str,
    value: Box<dyn Any>,
}

/// Holds at most one value per type.
#[derive(Default)]
pub struct StateRegistry {
    entries: HashMap<TypeId, StateEntry>,
}

impl StateRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value`, returning the one it replaced.
    pub fn insert<S: 'static>(&mut self, value: S) -> Option<S> {
        let entry = StateEntry {
            name: std::any::type_name::<S>(),
            value: Box::new(value),
        };
        self.entries
            .insert(TypeId::of::<S>(), entry)
            .and_then(|previous| previous.value.downcast::<S>().ok())
            .map(|previous| *previous)
    }

    /// Borrow the stored `S`.
    #[must_use]
    pub fn get<S: 'static>(&self) -> Option<&S> {
        self.entries.get(&TypeId::of::<S>())?.value.downcast_ref()
    }

    /// Mutably borrow the stored `S`.
    #[must_use]
    pub fn get_mut<S: 'static>(&mut self) -> Option<&mut S> {
        self.entries.get_mut(&TypeId::of::<S>())?.value.downcast_mut()
    }

    /// Take the stored `S` out of the registry.
    pub fn remove<S: 'static>(&mut self) -> Option<S> {
        let entry = self.entries.remove(&TypeId::of::<S>())?;
        entry.value.downcast::<S>().ok().map(|value| *value)
    }

    /// Returns `true` if an `S` is stored.
    #[must_use]
    pub fn contains<S: 'static>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<S>())
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for StateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.entries.values().map(|entry| entry.name))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Gravity(f32);

    #[derive(Debug, PartialEq)]
    struct Tick(u64);

    #[test]
    fn test_insert_and_get() {
        let mut state = StateRegistry::new();
        assert!(state.get::<Gravity>().is_none());
        assert_eq!(state.insert(Gravity(9.8)), None);
        assert_eq!(state.get::<Gravity>(), Some(&Gravity(9.8)));
        assert!(state.contains::<Gravity>());
        assert!(!state.contains::<Tick>());
    }

    #[test]
    fn test_insert_overwrites() {
        let mut state = StateRegistry::new();
        state.insert(Tick(1));
        assert_eq!(state.insert(Tick(2)), Some(Tick(1)));
        assert_eq!(state.get::<Tick>(), Some(&Tick(2)));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_get_mut_and_remove() {
        let mut state = StateRegistry::new();
        state.insert(Tick(0));
        state.get_mut::<Tick>().unwrap().0 += 5;
        assert_eq!(state.remove::<Tick>(), Some(Tick(5)));
        assert_eq!(state.remove::<Tick>(), None);
        assert!(state.is_empty());
    }

    #[test]
    fn test_debug_lists_type_names() {
        let mut state = StateRegistry::new();
        state.insert(Gravity(1.0));
        assert!(format!("{state:?}").contains("Gravity"));
    }
}
