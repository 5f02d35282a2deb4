//! Spatial Index
//!
//! Entity position lookup over the quadtree. The index enforces one
//! position per entity: adding again replaces, moving re-keys.

use std::collections::BTreeMap;

use world_events::EntityId;

use super::quadtree::{Quadtree, Rect};

/// Entity-keyed wrapper over [`Quadtree`].
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    tree: Quadtree<EntityId>,
    positions: BTreeMap<EntityId, (f64, f64)>,
}

impl SpatialIndex {
    /// Creates an index over a `width x height` area anchored at the origin.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            tree: Quadtree::new(Rect::new(0.0, 0.0, width, height)),
            positions: BTreeMap::new(),
        }
    }

    /// Places an entity, replacing any prior position. Returns false (and
    /// keeps the prior position) when the target is out of bounds.
    pub fn add_entity(&mut self, entity: EntityId, x: f64, y: f64) -> bool {
        if !self.tree.bounds().contains(x, y) {
            return false;
        }
        if let Some(&(old_x, old_y)) = self.positions.get(&entity) {
            self.tree.remove(old_x, old_y, &entity);
        }
        self.tree.insert(x, y, entity);
        self.positions.insert(entity, (x, y));
        true
    }

    /// Re-keys a tracked entity to a new position. Returns false for an
    /// untracked entity or an out-of-bounds target.
    pub fn move_entity(&mut self, entity: EntityId, x: f64, y: f64) -> bool {
        if !self.positions.contains_key(&entity) {
            return false;
        }
        self.add_entity(entity, x, y)
    }

    /// Forgets an entity entirely.
    pub fn remove_entity(&mut self, entity: EntityId) -> bool {
        match self.positions.remove(&entity) {
            Some((x, y)) => self.tree.remove(x, y, &entity),
            None => false,
        }
    }

    pub fn position_of(&self, entity: EntityId) -> Option<(f64, f64)> {
        self.positions.get(&entity).copied()
    }

    /// Entities within `radius` of `(x, y)`, boundary included.
    pub fn entities_in_radius(&self, x: f64, y: f64, radius: f64) -> Vec<EntityId> {
        self.tree
            .query_radius(x, y, radius)
            .into_iter()
            .map(|(_, _, &entity)| entity)
            .collect()
    }

    /// Entities inside the rectangle, edges included.
    pub fn entities_in_rect(&self, rect: &Rect) -> Vec<EntityId> {
        self.tree
            .query_rect(rect)
            .into_iter()
            .map(|(_, _, &entity)| entity)
            .collect()
    }

    /// Up to `k` entities nearest to `(x, y)`, closest first.
    pub fn nearest_entities(&self, x: f64, y: f64, k: usize) -> Vec<EntityId> {
        self.tree
            .query_nearest(x, y, k)
            .into_iter()
            .map(|(_, _, &entity)| entity)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn clear(&mut self) {
        self.tree.clear();
        self.positions.clear();
    }

    /// Rebuilds the quadtree from the position map. Intended after bulk
    /// loads or heavy churn.
    pub fn rebuild(&mut self) {
        self.tree.clear();
        for (&entity, &(x, y)) in &self.positions {
            self.tree.insert(x, y, entity);
        }
    }
}
