//! Entity-Component Store
//!
//! Entities are bare identities; all state hangs off typed component
//! stores keyed by kind.

pub mod component;
pub mod store;
pub mod world;

pub use component::{Component, ComponentKind};
pub use store::ComponentStore;
pub use world::{ChangeJournal, World};
