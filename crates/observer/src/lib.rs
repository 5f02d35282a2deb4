//! Observer-side wrappers over the simulation core: time controls,
//! bookmarks, focus driving, and the per-tick delta feed.

pub mod bookmarks;
pub mod feed;
pub mod focus;
pub mod time_controls;

pub use bookmarks::{Bookmark, BookmarkStore};
pub use feed::ObserverFeed;
pub use focus::FocusDriver;
pub use time_controls::{SimSpeed, TimeController};
