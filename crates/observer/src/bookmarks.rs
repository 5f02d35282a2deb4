//! Bookmarks
//!
//! Named markers into world history. Duplicate names keep the first
//! bookmark (first-write-wins); `add` reports whether the write landed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use world_events::EventId;

/// A named point in world history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub name: String,
    pub tick: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<EventId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Bookmark {
    pub fn new(name: impl Into<String>, tick: u64) -> Self {
        Self {
            name: name.into(),
            tick,
            event: None,
            note: None,
        }
    }

    pub fn with_event(mut self, event: EventId) -> Self {
        self.event = Some(event);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Bookmark collection, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookmarkStore {
    bookmarks: BTreeMap<String, Bookmark>,
}

impl BookmarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a bookmark. A duplicate name keeps the existing bookmark and
    /// returns false.
    pub fn add(&mut self, bookmark: Bookmark) -> bool {
        if self.bookmarks.contains_key(&bookmark.name) {
            return false;
        }
        self.bookmarks.insert(bookmark.name.clone(), bookmark);
        true
    }

    pub fn get(&self, name: &str) -> Option<&Bookmark> {
        self.bookmarks.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Bookmark> {
        self.bookmarks.remove(name)
    }

    /// All bookmarks in name order.
    pub fn list(&self) -> impl Iterator<Item = &Bookmark> {
        self.bookmarks.values()
    }

    pub fn len(&self) -> usize {
        self.bookmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookmarks.is_empty()
    }
}
