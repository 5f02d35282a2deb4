//! Spatial Queries
//!
//! Quadtree storage and the entity-keyed index over it.

pub mod index;
pub mod quadtree;

pub use index::SpatialIndex;
pub use quadtree::{Quadtree, Rect, DEFAULT_MAX_DEPTH, DEFAULT_MAX_ENTRIES};
