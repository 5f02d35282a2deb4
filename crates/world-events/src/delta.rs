//! Observer Deltas
//!
//! Per-tick change records shipped across the engine/observer boundary, and
//! the command channel flowing the other way. Everything here is plain
//! serialized data: numeric ids, stringly-typed categories, no handles into
//! live engine state.

use serde::{Deserialize, Serialize};

use crate::data::EventData;
use crate::event::WorldEvent;
use crate::ids::EntityId;
use crate::time::WorldTime;

/// Serialized view of an event for observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventView {
    pub id: u32,
    pub category: String,
    pub subtype: String,
    pub timestamp: u64,
    pub significance: u8,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub participants: Vec<u32>,
    #[serde(default, skip_serializing_if = "EventData::is_null")]
    pub data: EventData,
}

impl From<&WorldEvent> for EventView {
    fn from(event: &WorldEvent) -> Self {
        Self {
            id: event.id.raw(),
            category: event.category.as_str().to_string(),
            subtype: event.subtype.clone(),
            timestamp: event.timestamp,
            significance: event.significance,
            participants: event.participants.iter().map(|p| p.raw()).collect(),
            data: event.data.clone(),
        }
    }
}

/// One changed component on one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangedEntity {
    pub id: EntityId,
    /// Component kind name, e.g. `"Position"`.
    pub kind: String,
    /// Serialized projection of the new component value.
    pub data: EventData,
}

/// Compact entity snapshot for map-style observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityUpdate {
    pub id: EntityId,
    /// Entity type tag, e.g. `"character"` or `"site"`.
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub x: f64,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faction: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub population: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub military: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wealth: Option<i64>,
    /// Unit movement direction, if the entity moved this tick.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<(f64, f64)>,
}

impl EntityUpdate {
    /// Creates an update with only the required fields.
    pub fn new(id: EntityId, tag: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id,
            tag: tag.into(),
            name: None,
            x,
            y,
            faction: None,
            population: None,
            tier: None,
            military: None,
            wealth: None,
            direction: None,
        }
    }
}

/// Everything an observer learns about one completed tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickDelta {
    pub tick: u64,
    pub time: WorldTime,
    /// New events since the previous delta, most significant first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<EventView>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed_entities: Vec<ChangedEntity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed_entities: Vec<EntityId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entity_updates: Vec<EntityUpdate>,
}

impl TickDelta {
    /// Creates an empty delta for a tick.
    pub fn new(tick: u64, time: WorldTime) -> Self {
        Self {
            tick,
            time,
            events: Vec::new(),
            changed_entities: Vec::new(),
            removed_entities: Vec::new(),
            entity_updates: Vec::new(),
        }
    }
}

/// Commands observers send to the engine loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ObserverCommand {
    SetSpeed { ticks_per_second: f64 },
    Pause,
    Resume,
    Step { ticks: u64 },
}
