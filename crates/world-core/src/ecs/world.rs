//! World
//!
//! The entity store: the alive set, one [`ComponentStore`] per registered
//! kind, and a change journal observers drain once per tick. Entity ids
//! come from a monotonic counter and are never reused within a run.

use std::collections::{BTreeMap, BTreeSet};

use world_events::EntityId;

use super::component::{Component, ComponentKind};
use super::store::ComponentStore;

/// Changes accumulated since the journal was last drained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeJournal {
    /// `(entity, kind)` pairs written this period, in write order.
    pub changed: Vec<(EntityId, ComponentKind)>,
    /// Entities destroyed this period.
    pub removed: Vec<EntityId>,
}

impl ChangeJournal {
    fn note_change(&mut self, entity: EntityId, kind: ComponentKind) {
        if !self.changed.contains(&(entity, kind)) {
            self.changed.push((entity, kind));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty()
    }
}

/// Entities and their components.
#[derive(Debug, Clone, Default)]
pub struct World {
    alive: BTreeSet<EntityId>,
    next_id: u32,
    stores: BTreeMap<ComponentKind, ComponentStore<Component>>,
    journal: ChangeJournal,
}

impl World {
    /// Creates an empty world with no registered stores.
    pub fn new() -> Self {
        Self {
            alive: BTreeSet::new(),
            next_id: 1,
            stores: BTreeMap::new(),
            journal: ChangeJournal::default(),
        }
    }

    // ---- entities ----

    /// Allocates a fresh entity.
    pub fn create_entity(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        self.alive.insert(id);
        id
    }

    /// Re-creates an entity under a specific id (snapshot restore).
    ///
    /// Advances the allocation counter past the id so later creations
    /// cannot collide. Returns false if the id is already alive.
    pub fn insert_entity(&mut self, id: EntityId) -> bool {
        if !self.alive.insert(id) {
            return false;
        }
        self.next_id = self.next_id.max(id.0 + 1);
        true
    }

    /// Destroys an entity, removing every component it carries. The handle
    /// stays dead for the rest of the run.
    pub fn destroy_entity(&mut self, id: EntityId) -> bool {
        if !self.alive.remove(&id) {
            return false;
        }
        for store in self.stores.values_mut() {
            store.remove(id);
        }
        self.journal.removed.push(id);
        true
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.alive.contains(&id)
    }

    pub fn entity_count(&self) -> usize {
        self.alive.len()
    }

    /// Iterates alive entities in id order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.alive.iter().copied()
    }

    /// The id the next created entity will receive.
    pub fn next_entity_id(&self) -> u32 {
        self.next_id
    }

    /// Advances the allocation counter to at least `next` (restore).
    pub fn ensure_next_entity_id(&mut self, next: u32) {
        self.next_id = self.next_id.max(next);
    }

    // ---- components ----

    /// Registers a kind, creating its empty store. Idempotent.
    pub fn register_component(&mut self, kind: ComponentKind) {
        self.stores.entry(kind).or_default();
    }

    /// Kinds with a registered store, in kind order.
    pub fn registered_kinds(&self) -> Vec<ComponentKind> {
        self.stores.keys().copied().collect()
    }

    /// Attaches a component, registering its store on first use. At most
    /// one component per kind per entity; a second write overwrites.
    /// Returns false when the entity is not alive.
    pub fn add_component(&mut self, entity: EntityId, component: Component) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        let kind = component.kind();
        self.stores.entry(kind).or_default().set(entity, component);
        self.journal.note_change(entity, kind);
        true
    }

    pub fn get_component(&self, entity: EntityId, kind: ComponentKind) -> Option<&Component> {
        self.stores.get(&kind)?.get(entity)
    }

    /// Mutable component access. The write is recorded in the journal.
    pub fn get_component_mut(
        &mut self,
        entity: EntityId,
        kind: ComponentKind,
    ) -> Option<&mut Component> {
        let value = self.stores.get_mut(&kind)?.get_mut(entity)?;
        self.journal.note_change(entity, kind);
        Some(value)
    }

    pub fn has_component(&self, entity: EntityId, kind: ComponentKind) -> bool {
        self.stores
            .get(&kind)
            .map_or(false, |store| store.has(entity))
    }

    /// Detaches a component. Removing an absent component is a no-op.
    pub fn remove_component(&mut self, entity: EntityId, kind: ComponentKind) -> Option<Component> {
        let removed = self.stores.get_mut(&kind)?.remove(entity);
        if removed.is_some() {
            self.journal.note_change(entity, kind);
        }
        removed
    }

    /// Direct read access to a kind's store, if registered.
    pub fn store(&self, kind: ComponentKind) -> Option<&ComponentStore<Component>> {
        self.stores.get(&kind)
    }

    // ---- queries ----

    /// Entities carrying all of the given kinds, in id order.
    ///
    /// Scans the smallest participating store and filters by presence in
    /// the others.
    pub fn query(&self, kinds: &[ComponentKind]) -> Vec<EntityId> {
        if kinds.is_empty() {
            return Vec::new();
        }
        let mut stores = Vec::with_capacity(kinds.len());
        for kind in kinds {
            match self.stores.get(kind) {
                Some(store) => stores.push(store),
                // An unregistered kind can match nothing.
                None => return Vec::new(),
            }
        }
        let (smallest_idx, smallest) = stores
            .iter()
            .enumerate()
            .min_by_key(|(_, store)| store.count())
            .expect("kinds is non-empty");

        smallest
            .entities()
            .filter(|&id| self.alive.contains(&id))
            .filter(|&id| {
                stores
                    .iter()
                    .enumerate()
                    .all(|(i, store)| i == smallest_idx || store.has(id))
            })
            .collect()
    }

    // ---- change journal ----

    /// Drains and returns the changes accumulated since the last drain.
    pub fn take_changes(&mut self) -> ChangeJournal {
        std::mem::take(&mut self.journal)
    }
}
