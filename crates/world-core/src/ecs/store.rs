//! Component Store
//!
//! One store maps entities to at most one value of a single component kind.
//! Backed by a `BTreeMap` so iteration order is the allocation order of the
//! entity handles, which keeps every store-driven loop deterministic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use world_events::EntityId;

/// Mapping from entity to exactly one `T`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentStore<T> {
    items: BTreeMap<EntityId, T>,
}

impl<T> Default for ComponentStore<T> {
    fn default() -> Self {
        Self { items: BTreeMap::new() }
    }
}

impl<T> ComponentStore<T> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the entity's value. Returns the previous value
    /// when overwriting.
    pub fn set(&mut self, entity: EntityId, value: T) -> Option<T> {
        self.items.insert(entity, value)
    }

    pub fn get(&self, entity: EntityId) -> Option<&T> {
        self.items.get(&entity)
    }

    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        self.items.get_mut(&entity)
    }

    pub fn has(&self, entity: EntityId) -> bool {
        self.items.contains_key(&entity)
    }

    /// Removes the entity's value. Removing an absent value is a no-op.
    pub fn remove(&mut self, entity: EntityId) -> Option<T> {
        self.items.remove(&entity)
    }

    /// Iterates `(entity, value)` pairs in entity order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.items.iter().map(|(&id, value)| (id, value))
    }

    /// Iterates entity ids in order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.items.keys().copied()
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
