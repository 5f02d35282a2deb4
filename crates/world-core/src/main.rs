//! World Simulation CLI
//!
//! Thin driver around the engine: build or load a world, run it for a
//! number of ticks, and optionally write a save.

use clap::Parser;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use world_core::config::{EngineConfig, DEFAULT_TUNING_PATH};
use world_core::engine::SimulationEngine;
use world_core::events::{CascadeEngine, EventBus};
use world_core::persistence::SaveFile;
use world_core::rng::SeededRng;
use world_core::snapshot::SnapshotManager;
use world_core::systems::{GrudgeSystem, SystemRegistry};
use world_core::{build_engine, CoreResult};

/// Command line arguments for the simulation.
#[derive(Parser, Debug)]
#[command(name = "world_sim")]
#[command(about = "Deterministic fantasy-world simulation engine")]
struct Args {
    /// Random seed for reproducibility
    #[arg(long, default_value_t = 42)]
    seed: u32,

    /// Number of ticks to simulate after initialization
    #[arg(long, default_value_t = 360)]
    ticks: u64,

    /// Tuning file path
    #[arg(long, default_value = DEFAULT_TUNING_PATH)]
    tuning: PathBuf,

    /// Load a save file before running
    #[arg(long)]
    load: Option<PathBuf>,

    /// Write a save file after running
    #[arg(long)]
    save: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> CoreResult<()> {
    println!("World Simulation Engine");
    println!("=======================");
    println!("Seed: {}", args.seed);
    println!("Ticks: {}", args.ticks);
    println!();

    let config = EngineConfig::load_or_default(&args.tuning);

    let mut registry = SystemRegistry::new();
    registry.register(Box::new(GrudgeSystem::new()))?;

    let mut engine = match &args.load {
        Some(path) => {
            println!("Loading {}...", path.display());
            let save = SaveFile::read_from(path)?;
            let (world, clock, log) = save.restore()?;
            let cascade = CascadeEngine::new(SeededRng::new(save.seed).fork("cascade"))
                .with_max_depth(config.max_cascade_depth);
            let mut engine = SimulationEngine::new(
                world,
                clock,
                EventBus::new(),
                log,
                cascade,
                registry,
                save.seed,
            )
            .with_config(config);
            engine.registry_mut().restore_states(&save.system_stores)?;
            engine
        }
        None => build_engine(registry, args.seed, config),
    };

    engine.initialize()?;
    let report = engine.run(args.ticks)?;

    println!("Ran {} ticks to {}", report.ticks_run, engine.clock().current_time());
    println!("  Events emitted: {}", report.events_emitted);
    println!("  Cascades fired: {}", report.cascades_fired);
    println!(
        "  Elapsed: {}us (slowest tick {}us)",
        report.elapsed_micros, report.slowest_tick_micros
    );

    if let Some(path) = &args.save {
        let snapshot = {
            let log = engine.log().borrow();
            SnapshotManager::new().snapshot(engine.world(), engine.clock(), &log, Some("cli save"))
        };
        let stores: BTreeMap<String, world_events::EventData> =
            engine.registry().serialize_states();
        let save = SaveFile::build(engine.seed(), snapshot, stores, None);
        save.write_to(path)?;
        println!("Saved to {}", path.display());
    }

    Ok(())
}
