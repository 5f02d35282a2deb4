//! Timeline Branches
//!
//! "What-if" timelines forked from a snapshot. A branch owns a fully
//! independent world, clock, and log; the divergence action is applied
//! during creation without emitting any events, and each run gets a fresh
//! bus so observers of the source simulation never hear branch events.

use serde::{Deserialize, Serialize};
use tracing::info;
use world_events::{EntityId, EventData, EventId, WorldEvent};

use crate::clock::WorldClock;
use crate::ecs::{ComponentKind, World};
use crate::engine::SimulationEngine;
use crate::error::{CoreError, CoreResult};
use crate::events::EventLog;
use crate::snapshot::{restore_snapshot, WorldSnapshot};

/// Most branches that may exist at once.
pub const MAX_BRANCHES: usize = 3;

/// The change that makes a branch diverge from its snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DivergenceAction {
    /// Append a `<subtype>.reversed` event over the original's data.
    ReverseOutcome { event_id: EventId, patch: EventData },
    /// Destroy a character entity if it is alive.
    RemoveCharacter { id: EntityId },
    /// Merge a patch into one of an entity's components (no-op if absent).
    ChangeDecision {
        id: EntityId,
        kind: ComponentKind,
        patch: EventData,
    },
    /// Append a deep clone of an event.
    AddEvent { event: WorldEvent },
    /// Re-seed the branch; the engine factory re-forks system RNGs from it.
    DifferentSeed { seed: u32 },
}

/// An independent timeline.
#[derive(Debug)]
pub struct Branch {
    pub id: u32,
    pub label: String,
    pub seed: u32,
    pub action: DivergenceAction,
    pub world: World,
    pub clock: WorldClock,
    pub log: EventLog,
}

/// Result of running a branch.
#[derive(Debug, Clone)]
pub struct BranchRun {
    pub branch_id: u32,
    /// Events emitted during the run, in emission order.
    pub events: Vec<WorldEvent>,
    pub final_tick: u64,
}

/// Owns and runs up to [`MAX_BRANCHES`] branches.
#[derive(Debug)]
pub struct BranchRunner {
    branches: Vec<Branch>,
    next_id: u32,
    limit: usize,
    base_seed: u32,
}

impl BranchRunner {
    /// Creates a runner with the default branch limit.
    pub fn new(base_seed: u32) -> Self {
        Self {
            branches: Vec::new(),
            next_id: 1,
            limit: MAX_BRANCHES,
            base_seed,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Restores the snapshot, applies the divergence, and stores the
    /// branch. The apply step emits no events.
    pub fn create_branch(
        &mut self,
        snapshot: &WorldSnapshot,
        action: DivergenceAction,
        label: Option<&str>,
    ) -> CoreResult<u32> {
        if self.branches.len() >= self.limit {
            return Err(CoreError::BranchLimitReached { limit: self.limit });
        }
        let (mut world, clock, mut log) = restore_snapshot(snapshot)?;
        let mut seed = self.base_seed;

        match &action {
            DivergenceAction::ReverseOutcome { event_id, patch } => {
                let original = log.get(*event_id).cloned().ok_or(CoreError::NotFound {
                    kind: "event",
                    id: event_id.raw() as u64,
                })?;
                let mut data = original.data.clone();
                data.merge(patch);
                data.set("reversed", true);
                let reversal = WorldEvent::builder(
                    original.category,
                    format!("{}.reversed", original.subtype),
                )
                .timestamp(clock.current_tick())
                .participants(original.participants.iter().copied())
                .cause(original.id)
                .data(data)
                .significance(original.significance)
                .build();
                // The original stays in the log; only the reversal lands.
                log.append(reversal);
            }
            DivergenceAction::RemoveCharacter { id } => {
                if world.is_alive(*id) {
                    world.destroy_entity(*id);
                }
            }
            DivergenceAction::ChangeDecision { id, kind, patch } => {
                if let Some(component) = world.get_component_mut(*id, *kind) {
                    component.merge_patch(patch)?;
                }
            }
            DivergenceAction::AddEvent { event } => {
                let clone = event.clone();
                if clone.id.is_assigned() {
                    log.append_existing(clone);
                } else {
                    log.append(clone);
                }
            }
            DivergenceAction::DifferentSeed { seed: new_seed } => {
                seed = *new_seed;
            }
        }

        let id = self.next_id;
        self.next_id += 1;
        info!(branch = id, ?action, "branch created");
        self.branches.push(Branch {
            id,
            label: label.unwrap_or("branch").to_string(),
            seed,
            action,
            world,
            clock,
            log,
        });
        Ok(id)
    }

    /// Runs a branch for `ticks` ticks. The factory receives the branch's
    /// world graph and seed and wires an engine around them (with a fresh
    /// bus); emitted events are collected and returned.
    pub fn run_branch<F>(&mut self, id: u32, ticks: u64, factory: F) -> CoreResult<BranchRun>
    where
        F: FnOnce(World, WorldClock, EventLog, u32) -> SimulationEngine,
    {
        let index = self
            .branches
            .iter()
            .position(|b| b.id == id)
            .ok_or(CoreError::NotFound { kind: "branch", id: id as u64 })?;
        let branch = self.branches.swap_remove(index);
        let Branch { id, label, seed, action, world, clock, log } = branch;

        let mut engine = factory(world, clock, log, seed);
        let collector = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = std::rc::Rc::clone(&collector);
        engine.bus().on_any(move |event: &WorldEvent| {
            sink.borrow_mut().push(event.clone());
        });

        engine.initialize()?;
        engine.run(ticks)?;

        let final_tick = engine.clock().current_tick();
        let (world, clock, log) = engine.into_parts();
        self.branches.push(Branch { id, label, seed, action, world, clock, log });

        Ok(BranchRun {
            branch_id: id,
            events: collector.take(),
            final_tick,
        })
    }

    pub fn get_branch(&self, id: u32) -> Option<&Branch> {
        self.branches.iter().find(|b| b.id == id)
    }

    /// Drops a branch and everything it owns.
    pub fn delete_branch(&mut self, id: u32) -> bool {
        let before = self.branches.len();
        self.branches.retain(|b| b.id != id);
        self.branches.len() != before
    }

    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    pub fn branches(&self) -> impl Iterator<Item = &Branch> {
        self.branches.iter()
    }
}
