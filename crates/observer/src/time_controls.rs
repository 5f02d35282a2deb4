//! Time Controls
//!
//! Speed tiers, pause/resume/step, and the auto-slowdown that drops a
//! tier when the world gets dramatic. The engine itself only ever sees
//! `run(n)`; everything here decides `n`.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::info;

use world_core::config::AutoSlowdownConfig;
use world_events::delta::ObserverCommand;
use world_events::WorldEvent;

/// Simulation speed tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimSpeed {
    Paused,
    /// One tick spread over many render frames; the frame gating is the
    /// renderer's concern, the engine still steps one tick at a time.
    SlowMotion,
    Normal,
    Fast7,
    Fast30,
    Fast365,
    UltraFast3650,
}

impl SimSpeed {
    /// Ticks the engine should run per observer step at this speed.
    pub fn ticks_per_step(self) -> u64 {
        match self {
            SimSpeed::Paused => 0,
            SimSpeed::SlowMotion => 1,
            SimSpeed::Normal => 1,
            SimSpeed::Fast7 => 7,
            SimSpeed::Fast30 => 30,
            SimSpeed::Fast365 => 365,
            SimSpeed::UltraFast3650 => 3650,
        }
    }

    /// One tier slower, never dropping below Normal. Paused and
    /// SlowMotion are user choices, not slowdown targets.
    pub fn one_tier_slower(self) -> SimSpeed {
        match self {
            SimSpeed::UltraFast3650 => SimSpeed::Fast365,
            SimSpeed::Fast365 => SimSpeed::Fast30,
            SimSpeed::Fast30 => SimSpeed::Fast7,
            SimSpeed::Fast7 => SimSpeed::Normal,
            other => other,
        }
    }

    /// Nearest tier for a requested ticks-per-second rate.
    pub fn from_rate(ticks_per_second: f64) -> SimSpeed {
        if ticks_per_second <= 0.0 {
            SimSpeed::Paused
        } else if ticks_per_second < 1.0 {
            SimSpeed::SlowMotion
        } else if ticks_per_second < 7.0 {
            SimSpeed::Normal
        } else if ticks_per_second < 30.0 {
            SimSpeed::Fast7
        } else if ticks_per_second < 365.0 {
            SimSpeed::Fast30
        } else if ticks_per_second < 3650.0 {
            SimSpeed::Fast365
        } else {
            SimSpeed::UltraFast3650
        }
    }
}

/// Decides how many ticks to run per observer step.
#[derive(Debug, Clone)]
pub struct TimeController {
    speed: SimSpeed,
    /// Speed to return to on Resume.
    resume_speed: SimSpeed,
    config: AutoSlowdownConfig,
    /// Ticks of recent high-significance events, oldest first.
    significant_ticks: VecDeque<u64>,
}

impl Default for TimeController {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeController {
    pub fn new() -> Self {
        Self::with_config(AutoSlowdownConfig::default())
    }

    pub fn with_config(config: AutoSlowdownConfig) -> Self {
        Self {
            speed: SimSpeed::Normal,
            resume_speed: SimSpeed::Normal,
            config,
            significant_ticks: VecDeque::new(),
        }
    }

    pub fn speed(&self) -> SimSpeed {
        self.speed
    }

    pub fn set_speed(&mut self, speed: SimSpeed) {
        self.speed = speed;
        if speed != SimSpeed::Paused {
            self.resume_speed = speed;
        }
    }

    pub fn pause(&mut self) {
        if self.speed != SimSpeed::Paused {
            self.resume_speed = self.speed;
        }
        self.speed = SimSpeed::Paused;
    }

    pub fn resume(&mut self) {
        self.speed = self.resume_speed;
    }

    pub fn is_paused(&self) -> bool {
        self.speed == SimSpeed::Paused
    }

    /// Ticks to run for the next observer step at the current speed.
    pub fn ticks_per_step(&self) -> u64 {
        self.speed.ticks_per_step()
    }

    /// Applies an observer command. Returns the ticks to run immediately
    /// (only `Step` asks for any).
    pub fn apply(&mut self, command: &ObserverCommand) -> u64 {
        match command {
            ObserverCommand::SetSpeed { ticks_per_second } => {
                self.set_speed(SimSpeed::from_rate(*ticks_per_second));
                0
            }
            ObserverCommand::Pause => {
                self.pause();
                0
            }
            ObserverCommand::Resume => {
                self.resume();
                0
            }
            ObserverCommand::Step { ticks } => *ticks,
        }
    }

    /// Feeds an emitted event into the auto-slowdown window. Returns true
    /// when the controller dropped a tier in response.
    pub fn note_event(&mut self, event: &WorldEvent) -> bool {
        if event.significance < self.config.significance_threshold {
            return false;
        }
        let tick = event.timestamp;
        self.significant_ticks.push_back(tick);
        let horizon = tick.saturating_sub(self.config.window_ticks);
        while self
            .significant_ticks
            .front()
            .map_or(false, |&t| t < horizon)
        {
            self.significant_ticks.pop_front();
        }
        if self.significant_ticks.len() >= self.config.event_count {
            let slower = self.speed.one_tier_slower();
            if slower != self.speed {
                info!(from = ?self.speed, to = ?slower, "auto-slowdown");
                self.set_speed(slower);
                self.significant_ticks.clear();
                return true;
            }
            self.significant_ticks.clear();
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use world_events::EventCategory;

    fn dramatic(tick: u64, significance: u8) -> WorldEvent {
        WorldEvent::builder(EventCategory::Military, "battle.resolved")
            .timestamp(tick)
            .significance(significance)
            .build()
    }

    #[test]
    fn test_speed_tiers() {
        assert_eq!(SimSpeed::Paused.ticks_per_step(), 0);
        assert_eq!(SimSpeed::Normal.ticks_per_step(), 1);
        assert_eq!(SimSpeed::Fast7.ticks_per_step(), 7);
        assert_eq!(SimSpeed::Fast30.ticks_per_step(), 30);
        assert_eq!(SimSpeed::Fast365.ticks_per_step(), 365);
        assert_eq!(SimSpeed::UltraFast3650.ticks_per_step(), 3650);
    }

    #[test]
    fn test_pause_resume_restores_speed() {
        let mut controller = TimeController::new();
        controller.set_speed(SimSpeed::Fast30);
        controller.pause();
        assert!(controller.is_paused());
        assert_eq!(controller.ticks_per_step(), 0);
        controller.resume();
        assert_eq!(controller.speed(), SimSpeed::Fast30);
    }

    #[test]
    fn test_apply_commands() {
        let mut controller = TimeController::new();
        assert_eq!(controller.apply(&ObserverCommand::SetSpeed { ticks_per_second: 30.0 }), 0);
        assert_eq!(controller.speed(), SimSpeed::Fast30);
        assert_eq!(controller.apply(&ObserverCommand::Step { ticks: 5 }), 5);
        controller.apply(&ObserverCommand::Pause);
        assert!(controller.is_paused());
        controller.apply(&ObserverCommand::Resume);
        assert_eq!(controller.speed(), SimSpeed::Fast30);
    }

    #[test]
    fn test_auto_slowdown_triggers_on_third_event() {
        let mut controller = TimeController::new();
        controller.set_speed(SimSpeed::Fast365);
        assert!(!controller.note_event(&dramatic(100, 95)));
        assert!(!controller.note_event(&dramatic(110, 92)));
        assert!(controller.note_event(&dramatic(120, 99)));
        assert_eq!(controller.speed(), SimSpeed::Fast30);
    }

    #[test]
    fn test_auto_slowdown_ignores_low_significance() {
        let mut controller = TimeController::new();
        controller.set_speed(SimSpeed::Fast365);
        for tick in 0..10 {
            assert!(!controller.note_event(&dramatic(tick, 89)));
        }
        assert_eq!(controller.speed(), SimSpeed::Fast365);
    }

    #[test]
    fn test_auto_slowdown_window_expires() {
        let mut controller = TimeController::new();
        controller.set_speed(SimSpeed::Fast365);
        controller.note_event(&dramatic(0, 95));
        controller.note_event(&dramatic(10, 95));
        // Tick 50 is outside the 30-tick window of the first two.
        assert!(!controller.note_event(&dramatic(50, 95)));
        assert_eq!(controller.speed(), SimSpeed::Fast365);
    }

    #[test]
    fn test_auto_slowdown_never_drops_below_normal() {
        let mut controller = TimeController::new();
        controller.set_speed(SimSpeed::Normal);
        for tick in 0..10 {
            controller.note_event(&dramatic(tick, 95));
        }
        assert_eq!(controller.speed(), SimSpeed::Normal);
    }

    #[test]
    fn test_from_rate_mapping() {
        assert_eq!(SimSpeed::from_rate(0.0), SimSpeed::Paused);
        assert_eq!(SimSpeed::from_rate(0.5), SimSpeed::SlowMotion);
        assert_eq!(SimSpeed::from_rate(1.0), SimSpeed::Normal);
        assert_eq!(SimSpeed::from_rate(10.0), SimSpeed::Fast7);
        assert_eq!(SimSpeed::from_rate(100.0), SimSpeed::Fast30);
        assert_eq!(SimSpeed::from_rate(1000.0), SimSpeed::Fast365);
        assert_eq!(SimSpeed::from_rate(10000.0), SimSpeed::UltraFast3650);
    }
}
