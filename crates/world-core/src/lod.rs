//! Level-of-Detail Controller
//!
//! Classifies tiles by Euclidean distance to the focus point: full detail
//! within 50 tiles, reduced within 200, abstract beyond. High-significance
//! entities simulate regardless of zone, and explicit overrides promote a
//! tile to full detail for a bounded number of ticks.

use serde::Deserialize;
use std::collections::BTreeMap;

/// Distance thresholds and the significance override.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LodConfig {
    pub full_radius: f64,
    pub reduced_radius: f64,
    /// Entities at or above this significance always simulate.
    pub significance_override: u8,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            full_radius: 50.0,
            reduced_radius: 200.0,
            significance_override: 85,
        }
    }
}

/// Detail class of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailLevel {
    Full,
    Reduced,
    Abstract,
}

impl DetailLevel {
    /// Simulation frequency multiplier for the class.
    pub fn simulation_frequency(self) -> f64 {
        match self {
            DetailLevel::Full => 1.0,
            DetailLevel::Reduced => 0.1,
            DetailLevel::Abstract => 0.0,
        }
    }
}

/// Focus point, tick, and temporary promotions.
#[derive(Debug, Clone)]
pub struct LodController {
    config: LodConfig,
    focus: (i64, i64),
    current_tick: u64,
    /// Promoted tile -> tick the promotion expires on.
    overrides: BTreeMap<(i64, i64), u64>,
}

impl Default for LodController {
    fn default() -> Self {
        Self::new()
    }
}

impl LodController {
    /// Creates a controller focused on the origin.
    pub fn new() -> Self {
        Self::with_config(LodConfig::default())
    }

    pub fn with_config(config: LodConfig) -> Self {
        Self {
            config,
            focus: (0, 0),
            current_tick: 0,
            overrides: BTreeMap::new(),
        }
    }

    pub fn set_focus(&mut self, x: i64, y: i64) {
        self.focus = (x, y);
    }

    pub fn focus(&self) -> (i64, i64) {
        self.focus
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    fn distance_to_focus(&self, x: i64, y: i64) -> f64 {
        let dx = (x - self.focus.0) as f64;
        let dy = (y - self.focus.1) as f64;
        (dx * dx + dy * dy).sqrt()
    }

    fn override_active(&self, x: i64, y: i64) -> bool {
        self.overrides
            .get(&(x, y))
            .map_or(false, |&expire| expire > self.current_tick)
    }

    /// Detail class of a tile. Promoted tiles are full until they expire;
    /// distance boundaries are inclusive on the lower side.
    pub fn get_detail_level(&self, x: i64, y: i64) -> DetailLevel {
        if self.override_active(x, y) {
            return DetailLevel::Full;
        }
        let distance = self.distance_to_focus(x, y);
        if distance <= self.config.full_radius {
            DetailLevel::Full
        } else if distance <= self.config.reduced_radius {
            DetailLevel::Reduced
        } else {
            DetailLevel::Abstract
        }
    }

    /// Simulation frequency multiplier of a tile.
    pub fn get_simulation_frequency(&self, x: i64, y: i64) -> f64 {
        self.get_detail_level(x, y).simulation_frequency()
    }

    /// True when an entity at the position should simulate this tick:
    /// its zone frequency is positive, or its significance clears the
    /// override threshold.
    pub fn should_simulate_entity(&self, x: i64, y: i64, significance: Option<u8>) -> bool {
        if self.get_simulation_frequency(x, y) > 0.0 {
            return true;
        }
        significance.map_or(false, |s| s >= self.config.significance_override)
    }

    /// Promotes a tile to full detail for `ticks` ticks from now.
    pub fn promote_to_full_detail(&mut self, x: i64, y: i64, ticks: u64) {
        self.overrides.insert((x, y), self.current_tick + ticks);
    }

    /// Ticks a promotion has left, if one is active.
    pub fn remaining_ticks(&self, x: i64, y: i64) -> Option<u64> {
        self.overrides
            .get(&(x, y))
            .filter(|&&expire| expire > self.current_tick)
            .map(|&expire| expire - self.current_tick)
    }

    pub fn remove_override(&mut self, x: i64, y: i64) -> bool {
        self.overrides.remove(&(x, y)).is_some()
    }

    pub fn clear_overrides(&mut self) {
        self.overrides.clear();
    }

    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }

    /// Advances the controller's tick and garbage-collects promotions with
    /// `expire <= tick`.
    pub fn set_current_tick(&mut self, tick: u64) {
        self.current_tick = tick;
        self.overrides.retain(|_, &mut expire| expire > tick);
    }
}
