//! Load-Time World View
//!
//! The snapshot an observer receives when it first attaches: terrain tiles,
//! entity updates, factions, and recent events. This is a read-only view
//! assembled by the engine side; tile generation itself is an external
//! collaborator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::delta::{EntityUpdate, EventView};

/// One terrain tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileView {
    pub biome: String,
    pub elevation: f64,
    pub temperature: f64,
    pub rainfall: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub river_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ley_line: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,
}

/// Faction summary for the map legend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactionView {
    pub name: String,
    /// Render color as `#rrggbb`.
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capital_id: Option<u32>,
}

/// Complete observer view of a loaded world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSnapshot {
    pub map_width: u32,
    pub map_height: u32,
    pub seed: u32,
    /// Row-major tiles, `tiles[y][x]`.
    pub tiles: Vec<Vec<TileView>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<EntityUpdate>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub factions: BTreeMap<u32, FactionView>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<EventView>,
}

impl MapSnapshot {
    /// Creates an empty snapshot of the given dimensions.
    pub fn new(map_width: u32, map_height: u32, seed: u32) -> Self {
        Self {
            map_width,
            map_height,
            seed,
            tiles: Vec::new(),
            entities: Vec::new(),
            factions: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    /// Looks up a tile, if in bounds.
    pub fn tile(&self, x: u32, y: u32) -> Option<&TileView> {
        self.tiles.get(y as usize).and_then(|row| row.get(x as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grass_tile() -> TileView {
        TileView {
            biome: "grassland".to_string(),
            elevation: 0.3,
            temperature: 0.6,
            rainfall: 0.4,
            river_id: None,
            ley_line: None,
            resources: vec!["grain".to_string()],
        }
    }

    #[test]
    fn test_tile_lookup() {
        let mut snapshot = MapSnapshot::new(2, 1, 42);
        snapshot.tiles.push(vec![grass_tile(), grass_tile()]);
        assert!(snapshot.tile(1, 0).is_some());
        assert!(snapshot.tile(2, 0).is_none());
        assert!(snapshot.tile(0, 1).is_none());
    }

    #[test]
    fn test_map_snapshot_roundtrip() {
        let mut snapshot = MapSnapshot::new(1, 1, 7);
        snapshot.tiles.push(vec![grass_tile()]);
        snapshot.factions.insert(
            3,
            FactionView {
                name: "Ironhold".to_string(),
                color: "#aa3311".to_string(),
                capital_id: Some(12),
            },
        );

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: MapSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snapshot, back);
    }
}
