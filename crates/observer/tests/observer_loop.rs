//! Observer loop integration
//!
//! Drives a live engine the way a TUI would: the time controller picks the
//! tick budget, the feed turns each run into deltas, and bookmarks mark
//! the dramatic moments.

use observer::{Bookmark, BookmarkStore, ObserverFeed, SimSpeed, TimeController};
use world_core::config::EngineConfig;
use world_core::engine::build_engine;
use world_core::events::EventFabric;
use world_core::systems::{System, SystemRegistry, TickFrequency};
use world_core::{World, WorldClock};
use world_events::delta::ObserverCommand;
use world_events::{EventCategory, WorldEvent};

/// Emits a dramatic event every tenth tick, quiet ones otherwise.
struct WarDrums;

impl System for WarDrums {
    fn name(&self) -> &str {
        "war_drums"
    }
    fn frequency(&self) -> TickFrequency {
        TickFrequency::Daily
    }
    fn execution_order(&self) -> i32 {
        0
    }
    fn execute(&mut self, _world: &mut World, clock: &WorldClock, events: &EventFabric) {
        let tick = clock.current_tick();
        let (subtype, significance) = if tick % 10 == 0 {
            ("battle.resolved", 95)
        } else {
            ("camp.quiet", 5)
        };
        events.emit(
            WorldEvent::builder(EventCategory::Military, subtype)
                .timestamp(tick)
                .significance(significance)
                .build(),
        );
    }
}

#[test]
fn observer_drives_engine_and_reads_deltas() {
    let mut registry = SystemRegistry::new();
    registry.register(Box::new(WarDrums)).unwrap();
    let config = EngineConfig { warmup_ticks: 0, ..EngineConfig::default() };
    let mut engine = build_engine(registry, 42, config);
    engine.initialize().unwrap();

    let mut feed = ObserverFeed::new();
    feed.attach(engine.bus());

    let mut controller = TimeController::new();
    let mut bookmarks = BookmarkStore::new();
    controller.apply(&ObserverCommand::SetSpeed { ticks_per_second: 30.0 });
    assert_eq!(controller.speed(), SimSpeed::Fast30);

    let mut slowdowns = 0;
    for _ in 0..4 {
        let budget = controller.ticks_per_step();
        if budget == 0 {
            break;
        }
        engine.run(budget).unwrap();
        let tick = engine.clock().current_tick() - 1;
        let delta = feed.collect_delta(engine.world_mut(), tick);

        for view in &delta.events {
            if view.significance >= 90 {
                bookmarks.add(Bookmark::new(format!("battle at tick {}", view.timestamp), view.timestamp));
            }
        }
        // Feed the raw log back into the slowdown window.
        let log = engine.log().borrow();
        for event in log.get_by_time_range(tick.saturating_sub(budget) + 1, tick) {
            if controller.note_event(event) {
                slowdowns += 1;
            }
        }
    }

    // 30-tick steps hold several significance-95 battles, so the
    // controller must have backed off at least one tier.
    assert!(slowdowns >= 1);
    assert!(matches!(
        controller.speed(),
        SimSpeed::Fast7 | SimSpeed::Normal
    ));
    assert!(!bookmarks.is_empty());

    // Deltas drained everything they reported.
    assert_eq!(feed.pending_events(), 0);
}

#[test]
fn paused_controller_runs_nothing() {
    let mut controller = TimeController::new();
    controller.apply(&ObserverCommand::Pause);
    assert_eq!(controller.ticks_per_step(), 0);
    // A manual step still yields a budget while paused.
    assert_eq!(controller.apply(&ObserverCommand::Step { ticks: 3 }), 3);
    controller.apply(&ObserverCommand::Resume);
    assert_eq!(controller.speed(), SimSpeed::Normal);
}
