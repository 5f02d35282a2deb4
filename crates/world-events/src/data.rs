//! Event Payload Values
//!
//! Events carry a heterogeneous payload. [`EventData`] is the tagged value
//! type that crosses every boundary that payload touches: event records,
//! snapshot clones, what-if patches, and observer serialization. Keys are
//! kept in a `BTreeMap` so iteration order is stable across runs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A JSON-like value carried by events, patches, and serialized components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum EventData {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<EventData>),
    Map(BTreeMap<String, EventData>),
}

impl EventData {
    /// Creates an empty map value.
    pub fn empty_map() -> Self {
        EventData::Map(BTreeMap::new())
    }

    /// Creates a map value from key/value pairs.
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<EventData>,
    {
        EventData::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, EventData::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            EventData::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            EventData::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the numeric value as a float, widening integers.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            EventData::Float(x) => Some(*x),
            EventData::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            EventData::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[EventData]> {
        match self {
            EventData::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, EventData>> {
        match self {
            EventData::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Looks up a key on a map value. Non-map values have no keys.
    pub fn get(&self, key: &str) -> Option<&EventData> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Inserts a key on a map value, converting `self` to a map first if it
    /// is not one already.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<EventData>) {
        if !matches!(self, EventData::Map(_)) {
            *self = EventData::empty_map();
        }
        if let EventData::Map(m) = self {
            m.insert(key.into(), value.into());
        }
    }

    /// Merges `patch` over `self` with replace-on-conflict semantics.
    ///
    /// Maps merge key-wise (recursively); any other pairing replaces the
    /// original value. This is the `{..orig, ..patch}` operation used by
    /// divergence actions.
    pub fn merge(&mut self, patch: &EventData) {
        match (self, patch) {
            (EventData::Map(base), EventData::Map(over)) => {
                for (key, value) in over {
                    match base.get_mut(key) {
                        Some(existing) => existing.merge(value),
                        None => {
                            base.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
            (slot, other) => *slot = other.clone(),
        }
    }
}

impl From<bool> for EventData {
    fn from(b: bool) -> Self {
        EventData::Bool(b)
    }
}

impl From<i64> for EventData {
    fn from(n: i64) -> Self {
        EventData::Int(n)
    }
}

impl From<i32> for EventData {
    fn from(n: i32) -> Self {
        EventData::Int(n as i64)
    }
}

impl From<u32> for EventData {
    fn from(n: u32) -> Self {
        EventData::Int(n as i64)
    }
}

impl From<u64> for EventData {
    fn from(n: u64) -> Self {
        EventData::Int(n as i64)
    }
}

impl From<f64> for EventData {
    fn from(x: f64) -> Self {
        EventData::Float(x)
    }
}

impl From<&str> for EventData {
    fn from(s: &str) -> Self {
        EventData::Text(s.to_string())
    }
}

impl From<String> for EventData {
    fn from(s: String) -> Self {
        EventData::Text(s)
    }
}

impl<T: Into<EventData>> From<Vec<T>> for EventData {
    fn from(items: Vec<T>) -> Self {
        EventData::List(items.into_iter().map(Into::into).collect())
    }
}
