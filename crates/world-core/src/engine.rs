//! Simulation Engine
//!
//! The tick loop. A tick executes at the clock's current value: cascade
//! consequences due on the tick are released first, then the systems
//! scheduled for it run in execution order, then the LOD controller learns
//! the tick and the clock advances. A panicking system aborts the tick
//! with the clock un-advanced, so no tick is ever half-applied across
//! runs.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;
use std::time::Instant;

use tracing::{debug, error, info};
use world_events::{EventCategory, WorldEvent};

use crate::clock::WorldClock;
use crate::config::EngineConfig;
use crate::ecs::World;
use crate::error::{CoreError, CoreResult};
use crate::events::{CascadeEngine, EventBus, EventFabric, EventLog};
use crate::lod::LodController;
use crate::rng::SeededRng;
use crate::systems::SystemRegistry;

/// Counters from one `run` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub ticks_run: u64,
    pub events_emitted: u64,
    pub cascades_fired: u64,
    /// Wall-clock microseconds of the slowest tick.
    pub slowest_tick_micros: u128,
    /// Total wall-clock microseconds spent in the run.
    pub elapsed_micros: u128,
}

/// Owns the world graph and advances it tick by tick.
pub struct SimulationEngine {
    world: World,
    clock: WorldClock,
    bus: Rc<EventBus>,
    log: Rc<RefCell<EventLog>>,
    cascade: Rc<RefCell<CascadeEngine>>,
    fabric: EventFabric,
    registry: SystemRegistry,
    lod: LodController,
    seed: u32,
    rng_forks: BTreeMap<String, u32>,
    config: EngineConfig,
    initialized: bool,
}

impl SimulationEngine {
    /// Wires an engine from its parts.
    pub fn new(
        world: World,
        clock: WorldClock,
        bus: EventBus,
        log: EventLog,
        cascade: CascadeEngine,
        registry: SystemRegistry,
        seed: u32,
    ) -> Self {
        let bus = Rc::new(bus);
        let log = Rc::new(RefCell::new(log));
        let cascade = Rc::new(RefCell::new(cascade));
        let fabric = EventFabric::new(Rc::clone(&bus), Rc::clone(&log), Rc::clone(&cascade));
        Self {
            world,
            clock,
            bus,
            log,
            cascade,
            fabric,
            registry,
            lod: LodController::new(),
            seed,
            rng_forks: BTreeMap::new(),
            config: EngineConfig::default(),
            initialized: false,
        }
    }

    /// Replaces the default tuning.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.lod = LodController::with_config(config.lod.clone());
        self.config = config;
        self
    }

    /// Forks per-system RNG streams, seeds the cascade engine, and runs
    /// the warmup. Warmup only applies to a fresh world (clock at 0);
    /// restored worlds resume where they were.
    pub fn initialize(&mut self) -> CoreResult<()> {
        if self.initialized {
            return Ok(());
        }
        let root = SeededRng::new(self.seed);
        self.cascade.borrow_mut().reseed(root.fork("cascade"));
        self.rng_forks.insert("cascade".to_string(), root.fork("cascade").seed());
        for system in self.registry.iter_mut() {
            let fork = root.fork(system.name());
            self.rng_forks.insert(system.name().to_string(), fork.seed());
            system.bind_rng(fork);
        }
        self.initialized = true;

        if self.clock.current_tick() == 0 && self.config.warmup_ticks > 0 {
            debug!(ticks = self.config.warmup_ticks, "running warmup");
            self.run(self.config.warmup_ticks)?;
        }
        Ok(())
    }

    /// Runs `n` ticks. Synchronous and not cancellable mid-call; callers
    /// needing pause or step invoke with small `n`.
    pub fn run(&mut self, n: u64) -> CoreResult<RunReport> {
        if !self.initialized {
            self.initialize()?;
        }
        let mut report = RunReport::default();
        let events_before = self.log.borrow().len() as u64;
        let cascades_before = self.cascade.borrow().fired_count();
        let run_start = Instant::now();

        for _ in 0..n {
            let tick_start = Instant::now();
            self.step()?;
            let tick_micros = tick_start.elapsed().as_micros();
            report.slowest_tick_micros = report.slowest_tick_micros.max(tick_micros);
            report.ticks_run += 1;
        }

        report.elapsed_micros = run_start.elapsed().as_micros();
        report.events_emitted = self.log.borrow().len() as u64 - events_before;
        report.cascades_fired = self.cascade.borrow().fired_count() - cascades_before;
        Ok(report)
    }

    /// Executes the tick the clock currently points at, then advances.
    fn step(&mut self) -> CoreResult<()> {
        let tick = self.clock.current_tick();

        // Cascade events due at this tick land before any system runs.
        self.fabric.drain_due(tick);

        for index in self.registry.schedule_for_tick(tick) {
            let world = &mut self.world;
            let clock = &self.clock;
            let fabric = &self.fabric;
            let system = self
                .registry
                .get_mut(index)
                .expect("schedule indices are in range");
            let name = system.name().to_string();

            let outcome = catch_unwind(AssertUnwindSafe(|| {
                system.execute(world, clock, fabric);
            }));
            if let Err(payload) = outcome {
                let message = panic_message(payload);
                error!(system = %name, tick, %message, "system panicked; tick aborted");
                self.fabric.emit(
                    WorldEvent::builder(EventCategory::Disaster, "engine.system_failure")
                        .timestamp(tick)
                        .significance(100)
                        .data_entry("system", name.as_str())
                        .data_entry("message", message.as_str())
                        .build(),
                );
                // The clock stays on the faulted tick.
                return Err(CoreError::EngineFault { system: name, tick, message });
            }
        }

        self.lod.set_current_tick(tick);
        self.clock.advance();
        Ok(())
    }

    // ---- accessors ----

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn clock(&self) -> &WorldClock {
        &self.clock
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    pub fn log(&self) -> &Rc<RefCell<EventLog>> {
        &self.log
    }

    pub fn fabric(&self) -> &EventFabric {
        &self.fabric
    }

    pub fn lod(&self) -> &LodController {
        &self.lod
    }

    pub fn lod_mut(&mut self) -> &mut LodController {
        &mut self.lod
    }

    pub fn registry(&self) -> &SystemRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut SystemRegistry {
        &mut self.registry
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Seeds of the per-system forks created at initialization.
    pub fn rng_fork_seeds(&self) -> &BTreeMap<String, u32> {
        &self.rng_forks
    }

    /// Dismantles the engine and returns the world graph. Used by the
    /// branch runner to store a branch back after a run.
    pub fn into_parts(self) -> (World, WorldClock, EventLog) {
        let SimulationEngine { world, clock, log, fabric, bus, cascade, .. } = self;
        drop(fabric);
        drop(bus);
        drop(cascade);
        let log = Rc::try_unwrap(log)
            .map(RefCell::into_inner)
            .unwrap_or_else(|shared| shared.borrow().clone());
        (world, clock, log)
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Convenience constructor: a fresh engine over empty parts.
pub fn build_engine(registry: SystemRegistry, seed: u32, config: EngineConfig) -> SimulationEngine {
    let cascade = CascadeEngine::new(SeededRng::new(seed).fork("cascade"))
        .with_max_depth(config.max_cascade_depth);
    info!(seed, "building engine");
    SimulationEngine::new(
        World::new(),
        WorldClock::new(),
        EventBus::new(),
        EventLog::new(),
        cascade,
        registry,
        seed,
    )
    .with_config(config)
}
