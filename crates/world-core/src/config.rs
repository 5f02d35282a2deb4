//! Engine Tuning
//!
//! Tuning parameters loadable from `tuning.toml`, so thresholds can be
//! adjusted without recompiling. Defaults carry the canonical constants.

use serde::Deserialize;
use std::path::Path;

use crate::error::CoreResult;
use crate::lod::LodConfig;

/// Default tuning file path.
pub const DEFAULT_TUNING_PATH: &str = "tuning.toml";

/// Top-level engine configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Ticks simulated during initialization to populate initial state.
    pub warmup_ticks: u64,
    /// Cascade depth limit.
    pub max_cascade_depth: u32,
    /// Level-of-detail thresholds.
    pub lod: LodConfig,
    /// Branch count limit.
    pub max_branches: usize,
    /// Observer-side auto-slowdown thresholds.
    pub auto_slowdown: AutoSlowdownConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            warmup_ticks: 30,
            max_cascade_depth: 10,
            lod: LodConfig::default(),
            max_branches: 3,
            auto_slowdown: AutoSlowdownConfig::default(),
        }
    }
}

/// Auto-slowdown trigger: `event_count` events at or above
/// `significance_threshold` within `window_ticks`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AutoSlowdownConfig {
    pub significance_threshold: u8,
    pub event_count: usize,
    pub window_ticks: u64,
}

impl Default for AutoSlowdownConfig {
    fn default() -> Self {
        Self {
            significance_threshold: 90,
            event_count: 3,
            window_ticks: 30,
        }
    }
}

impl EngineConfig {
    /// Loads configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Loads configuration if the file exists, falling back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(err) => {
                tracing::debug!(path = %path.as_ref().display(), %err, "using default tuning");
                Self::default()
            }
        }
    }
}
