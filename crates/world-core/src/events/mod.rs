//! Event Fabric
//!
//! Bus, append-only log, significance queue, cascade engine, and the
//! emission pipeline binding them together.

pub mod bus;
pub mod cascade;
pub mod fabric;
pub mod log;
pub mod queue;

pub use bus::{EventBus, EventSink, SubscriberId};
pub use cascade::{CascadeEngine, ProbabilityModifier, ScheduledConsequence, DEFAULT_MAX_CASCADE_DEPTH};
pub use fabric::EventFabric;
pub use log::EventLog;
pub use queue::EventQueue;
