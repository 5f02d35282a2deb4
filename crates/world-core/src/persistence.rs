//! Persistence
//!
//! Self-describing JSON save format: schema version, seed, final tick, the
//! full snapshot record, serialized system stores by name, and an optional
//! event-log slice. Everything is numbers and strings; ids are serialized
//! verbatim and re-applied on load with the counters advanced past them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use world_events::{EventData, WorldEvent};

use crate::clock::WorldClock;
use crate::ecs::World;
use crate::error::{CoreError, CoreResult};
use crate::events::EventLog;
use crate::snapshot::{restore_snapshot, WorldSnapshot};

/// Current save format version.
pub const SAVE_SCHEMA_VERSION: u32 = 1;

/// A complete save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveFile {
    pub schema_version: u32,
    pub seed: u32,
    pub final_tick: u64,
    pub snapshot: WorldSnapshot,
    /// System-owned serialized stores, keyed by system name.
    #[serde(default)]
    pub system_stores: BTreeMap<String, EventData>,
    /// Optional slice of recent events for observers; the authoritative
    /// history is in the snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_slice: Option<Vec<WorldEvent>>,
}

impl SaveFile {
    /// Assembles a save from a snapshot and system stores.
    pub fn build(
        seed: u32,
        snapshot: WorldSnapshot,
        system_stores: BTreeMap<String, EventData>,
        event_slice: Option<Vec<WorldEvent>>,
    ) -> Self {
        Self {
            schema_version: SAVE_SCHEMA_VERSION,
            seed,
            final_tick: snapshot.tick,
            snapshot,
            system_stores,
            event_slice,
        }
    }

    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses and validates a save.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let save: SaveFile = serde_json::from_str(json)?;
        if save.schema_version != SAVE_SCHEMA_VERSION {
            return Err(CoreError::Serialization(format!(
                "unsupported save schema {} (expected {})",
                save.schema_version, SAVE_SCHEMA_VERSION
            )));
        }
        Ok(save)
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> CoreResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn read_from(path: impl AsRef<Path>) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Rebuilds the world graph the save captured.
    pub fn restore(&self) -> CoreResult<(World, WorldClock, EventLog)> {
        restore_snapshot(&self.snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Component;
    use crate::snapshot::SnapshotManager;
    use world_events::{EventCategory, WorldEvent};

    fn sample_save() -> SaveFile {
        let mut world = World::new();
        let hero = world.create_entity();
        world.add_component(hero, Component::Position { x: 12.0, y: 8.0 });
        let clock = WorldClock::at(77);
        let mut log = EventLog::new();
        log.append(
            WorldEvent::builder(EventCategory::Cultural, "saga.composed")
                .timestamp(60)
                .participant(hero)
                .significance(55)
                .build(),
        );
        let snapshot = SnapshotManager::new().snapshot(&world, &clock, &log, Some("autosave"));
        let mut stores = BTreeMap::new();
        stores.insert(
            "grudges".to_string(),
            EventData::map([("1", EventData::List(Vec::new()))]),
        );
        SaveFile::build(42, snapshot, stores, None)
    }

    #[test]
    fn test_save_json_roundtrip() {
        let save = sample_save();
        let json = save.to_json().unwrap();
        let back = SaveFile::from_json(&json).unwrap();
        assert_eq!(save, back);
    }

    #[test]
    fn test_schema_version_check() {
        let mut save = sample_save();
        save.schema_version = 99;
        let json = serde_json::to_string(&save).unwrap();
        assert!(matches!(
            SaveFile::from_json(&json),
            Err(CoreError::Serialization(_))
        ));
    }

    #[test]
    fn test_malformed_save_rejected() {
        assert!(SaveFile::from_json("{\"not\": \"a save\"}").is_err());
        assert!(SaveFile::from_json("garbage").is_err());
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.save.json");
        let save = sample_save();
        save.write_to(&path).unwrap();
        let back = SaveFile::read_from(&path).unwrap();
        assert_eq!(save, back);
    }

    #[test]
    fn test_restore_resumes_counters() {
        let save = sample_save();
        let (mut world, clock, mut log) = save.restore().unwrap();
        assert_eq!(clock.current_tick(), 77);
        assert_eq!(world.entity_count(), 1);
        assert!(world.create_entity().0 >= 2);
        let next = log.append(
            WorldEvent::builder(EventCategory::Personal, "x").timestamp(78).build(),
        );
        assert!(next.id.raw() >= 2);
    }
}
