//! End-to-end engine scenarios
//!
//! Exercises the assembled core: warmup arithmetic, cascade release,
//! determinism across runs, snapshot round-trips, and branch independence.

use world_core::config::EngineConfig;
use world_core::ecs::{Component, ComponentKind, World};
use world_core::engine::{build_engine, SimulationEngine};
use world_core::events::{CascadeEngine, EventBus, EventFabric, EventLog};
use world_core::lod::{DetailLevel, LodController};
use world_core::rng::SeededRng;
use world_core::snapshot::SnapshotManager;
use world_core::spatial::SpatialIndex;
use world_core::branch::{BranchRunner, DivergenceAction};
use world_core::clock::WorldClock;
use world_core::systems::{System, SystemRegistry, TickFrequency};
use world_events::{ConsequenceRule, EntityId, EventCategory, WorldEvent};

/// Emits one low-significance Personal event per execution.
struct DailyScribe;

impl System for DailyScribe {
    fn name(&self) -> &str {
        "scribe"
    }
    fn frequency(&self) -> TickFrequency {
        TickFrequency::Daily
    }
    fn execution_order(&self) -> i32 {
        0
    }
    fn execute(&mut self, _world: &mut World, clock: &WorldClock, events: &EventFabric) {
        events.emit(
            WorldEvent::builder(EventCategory::Personal, "scribe.entry")
                .timestamp(clock.current_tick())
                .significance(10)
                .build(),
        );
    }
}

/// Emits one rule-bearing event at tick 0 and nothing afterwards.
struct OriginSpark;

impl System for OriginSpark {
    fn name(&self) -> &str {
        "origin"
    }
    fn frequency(&self) -> TickFrequency {
        TickFrequency::Daily
    }
    fn execution_order(&self) -> i32 {
        0
    }
    fn execute(&mut self, _world: &mut World, clock: &WorldClock, events: &EventFabric) {
        if clock.current_tick() == 0 {
            events.emit(
                WorldEvent::builder(EventCategory::Personal, "spark")
                    .timestamp(0)
                    .significance(20)
                    .rule(ConsequenceRule::new("x.y", 1.0, EventCategory::Personal, 2))
                    .build(),
            );
        }
    }
}

/// Random behavior driven entirely by the bound fork.
struct RestlessOracle {
    rng: Option<SeededRng>,
}

impl System for RestlessOracle {
    fn name(&self) -> &str {
        "oracle"
    }
    fn frequency(&self) -> TickFrequency {
        TickFrequency::Daily
    }
    fn execution_order(&self) -> i32 {
        5
    }
    fn bind_rng(&mut self, rng: SeededRng) {
        self.rng = Some(rng);
    }
    fn execute(&mut self, world: &mut World, clock: &WorldClock, events: &EventFabric) {
        let rng = self.rng.as_mut().expect("rng bound at initialization");
        let significance = rng.next_int(0, 100).unwrap() as u8;
        let subject = world.create_entity();
        world.add_component(
            subject,
            Component::Position { x: rng.next_float(0.0, 100.0), y: rng.next_float(0.0, 100.0) },
        );
        let mut builder = WorldEvent::builder(EventCategory::Magical, "omen.cast")
            .timestamp(clock.current_tick())
            .participant(subject)
            .significance(significance);
        if significance > 60 {
            builder = builder.rule(
                ConsequenceRule::new("omen.echo", 0.5, EventCategory::Magical, 3)
                    .with_dampening(0.5),
            );
        }
        events.emit(builder.build());
    }
}

fn engine_with(systems: Vec<Box<dyn System>>, seed: u32, warmup: u64) -> SimulationEngine {
    let mut registry = SystemRegistry::new();
    for system in systems {
        registry.register(system).unwrap();
    }
    let config = EngineConfig { warmup_ticks: warmup, ..EngineConfig::default() };
    build_engine(registry, seed, config)
}

// S1: one daily system, warmup 30, run 3.
#[test]
fn scenario_warmup_and_run_produce_contiguous_timestamps() {
    let mut engine = engine_with(vec![Box::new(DailyScribe)], 42, 30);
    engine.initialize().unwrap();
    engine.run(3).unwrap();

    let log = engine.log().borrow();
    assert_eq!(log.len(), 33);
    let stamps: Vec<u64> = log.events_chronological().iter().map(|e| e.timestamp).collect();
    assert_eq!(stamps, (0..=32).collect::<Vec<u64>>());
}

// S2: a certain consequence with delay 2 under cascade depth 1.
#[test]
fn scenario_single_cascade_hop() {
    let mut registry = SystemRegistry::new();
    registry.register(Box::new(OriginSpark)).unwrap();
    let config = EngineConfig { warmup_ticks: 0, max_cascade_depth: 1, ..EngineConfig::default() };
    let mut engine = build_engine(registry, 42, config);
    engine.run(3).unwrap();

    let log = engine.log().borrow();
    assert_eq!(log.len(), 2);

    let spark = log
        .events_chronological()
        .into_iter()
        .find(|e| e.subtype == "spark")
        .unwrap();
    let echo = log
        .events_chronological()
        .into_iter()
        .find(|e| e.subtype == "x.y")
        .unwrap();
    assert_eq!(echo.timestamp, 2);
    assert_eq!(echo.causes, vec![spark.id]);
    assert_eq!(spark.consequences, vec![echo.id]);
}

// S3: LOD zones and timed promotion.
#[test]
fn scenario_lod_zones_and_promotion() {
    let mut lod = LodController::new();
    assert_eq!(lod.get_detail_level(50, 0), DetailLevel::Full);
    assert_eq!(lod.get_detail_level(51, 0), DetailLevel::Reduced);
    assert_eq!(lod.get_detail_level(201, 0), DetailLevel::Abstract);

    lod.promote_to_full_detail(500, 0, 10);
    assert_eq!(lod.get_detail_level(500, 0), DetailLevel::Full);
    lod.set_current_tick(11);
    assert_eq!(lod.get_detail_level(500, 0), DetailLevel::Abstract);
}

// S4: radius queries before and after a move.
#[test]
fn scenario_spatial_radius_after_move() {
    let mut index = SpatialIndex::new(1000.0, 1000.0);
    index.add_entity(EntityId(1), 10.0, 10.0);
    index.add_entity(EntityId(2), 15.0, 15.0);
    index.add_entity(EntityId(3), 900.0, 900.0);

    let near = index.entities_in_radius(10.0, 10.0, 20.0);
    assert!(near.contains(&EntityId(1)) && near.contains(&EntityId(2)));
    assert!(!near.contains(&EntityId(3)));

    index.move_entity(EntityId(1), 900.0, 900.0);
    assert_eq!(index.entities_in_radius(10.0, 10.0, 20.0), vec![EntityId(2)]);
    let far = index.entities_in_radius(900.0, 900.0, 20.0);
    assert_eq!(far.len(), 2);
    assert!(far.contains(&EntityId(1)) && far.contains(&EntityId(3)));
}

// S5: a branch removing a character never touches the source world.
#[test]
fn scenario_branch_removal_is_isolated() {
    let mut world = World::new();
    let character = world.create_entity();
    world.add_component(character, Component::Health { current: 8, maximum: 10 });
    let clock = WorldClock::at(10);
    let log = EventLog::new();

    let mut manager = SnapshotManager::new();
    let snapshot = manager.snapshot(&world, &clock, &log, Some("tick 10"));

    let mut runner = BranchRunner::new(42);
    let branch_id = runner
        .create_branch(&snapshot, DivergenceAction::RemoveCharacter { id: character }, None)
        .unwrap();
    runner
        .run_branch(branch_id, 1, |world, clock, log, seed| {
            SimulationEngine::new(
                world,
                clock,
                EventBus::new(),
                log,
                CascadeEngine::new(SeededRng::new(seed).fork("cascade")),
                SystemRegistry::new(),
                seed,
            )
        })
        .unwrap();

    // Source world at tick 10 still has the character.
    assert!(world.is_alive(character));
    assert_eq!(clock.current_tick(), 10);
    // The branch does not.
    let branch = runner.get_branch(branch_id).unwrap();
    assert!(!branch.world.is_alive(character));
    assert_eq!(branch.clock.current_tick(), 11);
}

// S6: labelled forks are independent and reproducible.
#[test]
fn scenario_fork_independence() {
    let mut a1 = SeededRng::new(42).fork("a");
    let mut b1 = SeededRng::new(42).fork("b");
    assert_ne!(a1.next(), b1.next());

    let mut a2 = SeededRng::new(42).fork("a");
    let mut b2 = SeededRng::new(42).fork("b");
    let first: Vec<f64> = (0..32).map(|_| a2.next()).collect();
    let second: Vec<f64> = {
        let mut a3 = SeededRng::new(42).fork("a");
        (0..32).map(|_| a3.next()).collect()
    };
    assert_eq!(first, second);
    assert_ne!(first, (0..32).map(|_| b2.next()).collect::<Vec<f64>>());
}

fn log_fingerprint(engine: &SimulationEngine) -> Vec<(u32, String, String, u64, u8, Vec<u32>)> {
    engine
        .log()
        .borrow()
        .events_chronological()
        .iter()
        .map(|e| {
            (
                e.id.raw(),
                e.category.as_str().to_string(),
                e.subtype.clone(),
                e.timestamp,
                e.significance,
                e.participants.iter().map(|p| p.raw()).collect(),
            )
        })
        .collect()
}

// Invariant 1: equal seeds, equal configuration, equal histories.
#[test]
fn determinism_across_independent_runs() {
    let build = || engine_with(vec![Box::new(RestlessOracle { rng: None })], 1234, 10);

    let mut first = build();
    first.initialize().unwrap();
    first.run(60).unwrap();

    let mut second = build();
    second.initialize().unwrap();
    second.run(60).unwrap();

    assert_eq!(log_fingerprint(&first), log_fingerprint(&second));
    assert_eq!(
        first.world().entity_count(),
        second.world().entity_count()
    );
    for entity in first.world().entities() {
        assert_eq!(
            first.world().get_component(entity, ComponentKind::Position),
            second.world().get_component(entity, ComponentKind::Position)
        );
    }

    let mut third = engine_with(vec![Box::new(RestlessOracle { rng: None })], 99, 10);
    third.initialize().unwrap();
    third.run(60).unwrap();
    assert_ne!(log_fingerprint(&first), log_fingerprint(&third));
}

// Invariants 2 and 3: emission-order monotonicity and causal closure.
#[test]
fn timestamps_monotonic_and_causes_closed() {
    let mut engine = engine_with(vec![Box::new(RestlessOracle { rng: None })], 7, 0);
    engine.run(120).unwrap();

    let log = engine.log().borrow();
    // Emission order is id order.
    let mut by_id: Vec<&WorldEvent> = log.events_chronological().into_iter().collect();
    by_id.sort_by_key(|e| e.id);
    let mut previous = 0u64;
    for event in &by_id {
        assert!(event.timestamp >= previous, "timestamps regressed at {}", event.id);
        previous = event.timestamp;
    }
    for event in &by_id {
        for cause in &event.causes {
            let parent = log.get(*cause).expect("cause is in the log");
            assert!(parent.timestamp <= event.timestamp);
        }
    }
}

// Invariant 4: restore(snapshot(W)) is observationally W.
#[test]
fn snapshot_roundtrip_after_live_run() {
    let mut engine = engine_with(vec![Box::new(RestlessOracle { rng: None })], 55, 5);
    engine.initialize().unwrap();
    engine.run(40).unwrap();

    let mut manager = SnapshotManager::new();
    let snapshot = {
        let log = engine.log().borrow();
        manager.snapshot(engine.world(), engine.clock(), &log, None)
    };
    let (world, clock, log) = manager.restore(&snapshot).unwrap();

    assert_eq!(clock.current_tick(), engine.clock().current_tick());
    assert_eq!(world.entity_count(), engine.world().entity_count());
    for entity in engine.world().entities() {
        for kind in engine.world().registered_kinds() {
            assert_eq!(
                world.get_component(entity, kind),
                engine.world().get_component(entity, kind)
            );
        }
    }
    let source_log = engine.log().borrow();
    assert_eq!(log.len(), source_log.len());
    for event in source_log.events_chronological() {
        let restored = log.get(event.id).expect("event survives restore");
        assert_eq!(restored, event);
    }
}

// Invariant 5 (other direction): source mutations never reach a branch.
#[test]
fn branch_runs_do_not_alias_source_log() {
    let mut engine = engine_with(vec![Box::new(DailyScribe)], 3, 0);
    engine.run(10).unwrap();

    let mut manager = SnapshotManager::new();
    let snapshot = {
        let log = engine.log().borrow();
        manager.snapshot(engine.world(), engine.clock(), &log, None)
    };

    let mut runner = BranchRunner::new(3);
    let branch_id = runner
        .create_branch(&snapshot, DivergenceAction::DifferentSeed { seed: 404 }, None)
        .unwrap();

    // Keep the source running after the snapshot.
    engine.run(10).unwrap();

    let branch = runner.get_branch(branch_id).unwrap();
    assert_eq!(branch.log.len(), 10);
    assert_eq!(engine.log().borrow().len(), 20);
    assert_eq!(branch.seed, 404);
}
