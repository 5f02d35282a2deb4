//! Simulation core: deterministic tick loop, ECS store, event fabric,
//! spatial index, LOD control, and snapshot/branch machinery.

pub mod branch;
pub mod clock;
pub mod config;
pub mod ecs;
pub mod engine;
pub mod error;
pub mod events;
pub mod lod;
pub mod persistence;
pub mod rng;
pub mod snapshot;
pub mod spatial;
pub mod systems;

pub use branch::{Branch, BranchRun, BranchRunner, DivergenceAction, MAX_BRANCHES};
pub use clock::WorldClock;
pub use config::{AutoSlowdownConfig, EngineConfig};
pub use ecs::{Component, ComponentKind, ComponentStore, World};
pub use engine::{build_engine, RunReport, SimulationEngine};
pub use error::{CoreError, CoreResult};
pub use events::{
    CascadeEngine, EventBus, EventFabric, EventLog, EventQueue, EventSink, ProbabilityModifier,
    SubscriberId,
};
pub use lod::{DetailLevel, LodConfig, LodController};
pub use persistence::{SaveFile, SAVE_SCHEMA_VERSION};
pub use rng::SeededRng;
pub use snapshot::{SnapshotManager, WorldSnapshot};
pub use spatial::{Quadtree, Rect, SpatialIndex};
pub use systems::{GrudgeSystem, System, SystemRegistry, TickFrequency};
