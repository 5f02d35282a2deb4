//! Domain Systems
//!
//! The plug-in contract domain systems implement, the frequency tiers the
//! scheduler dispatches on, and the registry that orders execution.

pub mod grudges;
pub mod registry;

pub use grudges::{Grudge, GrudgeSystem};
pub use registry::SystemRegistry;

use world_events::EventData;

use crate::clock::WorldClock;
use crate::ecs::World;
use crate::error::CoreResult;
use crate::events::EventFabric;
use crate::rng::SeededRng;

/// How often a system runs, in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickFrequency {
    Daily,
    Weekly,
    Monthly,
    Seasonal,
    Annual,
    Decadal,
}

impl TickFrequency {
    /// Tick interval of the tier.
    pub fn ticks(self) -> u64 {
        match self {
            TickFrequency::Daily => 1,
            TickFrequency::Weekly => 7,
            TickFrequency::Monthly => 30,
            TickFrequency::Seasonal => 90,
            TickFrequency::Annual => 365,
            TickFrequency::Decadal => 3650,
        }
    }

    /// True when a system of this tier runs on `tick`.
    pub fn matches(self, tick: u64) -> bool {
        tick % self.ticks() == 0
    }
}

/// A pluggable domain system.
///
/// Systems are invoked sequentially within a tick in ascending
/// `execution_order`. They may query and mutate the world and emit events
/// through the fabric, but must not touch anything outside the arguments
/// they receive. A panicking system aborts the tick.
pub trait System {
    /// Unique name; doubles as the label of the system's RNG fork and its
    /// serialized-state key.
    fn name(&self) -> &str;

    fn frequency(&self) -> TickFrequency;

    fn execution_order(&self) -> i32;

    fn execute(&mut self, world: &mut World, clock: &WorldClock, events: &EventFabric);

    /// Receives the system's forked RNG during engine initialization.
    /// Systems without random behavior ignore it.
    fn bind_rng(&mut self, _rng: SeededRng) {}

    /// Serializes private state that must survive snapshot/restore.
    /// Systems whose state is purely cached return `None`.
    fn serialize_state(&self) -> Option<EventData> {
        None
    }

    /// Restores state captured by [`System::serialize_state`].
    fn restore_state(&mut self, _state: &EventData) -> CoreResult<()> {
        Ok(())
    }
}
