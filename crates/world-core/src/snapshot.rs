//! Snapshots
//!
//! Deep copies of the world graph at a point in time. Component values and
//! events are cloned at capture and cloned again at restore, so a snapshot
//! never aliases live state in either direction. Id counters are captured
//! so a restored world resumes allocation without collisions.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::{SystemTime, UNIX_EPOCH};

use world_events::{EntityId, WorldEvent};

use crate::clock::WorldClock;
use crate::ecs::{Component, ComponentKind, World};
use crate::error::CoreResult;
use crate::events::EventLog;

/// A captured world state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub id: u32,
    /// Tick the snapshot was taken at.
    pub tick: u64,
    pub label: String,
    /// Wall-clock capture time, unix seconds. Metadata only.
    pub created_at: u64,
    pub alive_entities: BTreeSet<EntityId>,
    /// Every registered kind, mapped to its per-entity values.
    pub component_data: BTreeMap<ComponentKind, BTreeMap<EntityId, Component>>,
    pub events: Vec<WorldEvent>,
    pub next_entity_id: u32,
    pub next_event_id: u32,
}

/// Captures and restores snapshots, allocating snapshot ids.
#[derive(Debug, Clone)]
pub struct SnapshotManager {
    next_id: u32,
}

impl Default for SnapshotManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotManager {
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    /// Deep-copies the world, clock, and log into a snapshot.
    pub fn snapshot(
        &mut self,
        world: &World,
        clock: &WorldClock,
        log: &EventLog,
        label: Option<&str>,
    ) -> WorldSnapshot {
        let id = self.next_id;
        self.next_id += 1;

        let mut component_data = BTreeMap::new();
        for kind in world.registered_kinds() {
            let store = world.store(kind).expect("kind is registered");
            let values: BTreeMap<EntityId, Component> = store
                .iter()
                .filter(|(entity, _)| world.is_alive(*entity))
                .map(|(entity, value)| (entity, value.clone()))
                .collect();
            component_data.insert(kind, values);
        }

        WorldSnapshot {
            id,
            tick: clock.current_tick(),
            label: label.unwrap_or("unlabelled").to_string(),
            created_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            alive_entities: world.entities().collect(),
            component_data,
            events: log.events_chronological().into_iter().cloned().collect(),
            next_entity_id: world.next_entity_id(),
            next_event_id: log.next_event_id(),
        }
    }

    /// Rebuilds a fresh world, clock, and log from a snapshot.
    pub fn restore(&self, snapshot: &WorldSnapshot) -> CoreResult<(World, WorldClock, EventLog)> {
        restore_snapshot(snapshot)
    }
}

/// Builds fresh instances from a snapshot, preserving every id.
pub fn restore_snapshot(snapshot: &WorldSnapshot) -> CoreResult<(World, WorldClock, EventLog)> {
    let mut world = World::new();
    for &entity in &snapshot.alive_entities {
        world.insert_entity(entity);
    }
    for (&kind, values) in &snapshot.component_data {
        world.register_component(kind);
        for (&entity, value) in values {
            world.add_component(entity, value.clone());
        }
    }
    world.ensure_next_entity_id(snapshot.next_entity_id);
    // Restoring is not a mutation observers should see.
    world.take_changes();

    let clock = WorldClock::at(snapshot.tick);

    let mut log = EventLog::new();
    for event in &snapshot.events {
        log.append_existing(event.clone());
    }
    log.ensure_next_event_id(snapshot.next_event_id);

    Ok((world, clock, log))
}
