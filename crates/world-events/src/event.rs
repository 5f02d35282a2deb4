//! Event Types
//!
//! [`WorldEvent`] is the atomic unit of world history. Events are immutable
//! once appended to the log, with one exception: the log itself appends to
//! an event's `consequences` list as cascades fire. Everything else about
//! an event is fixed at emission.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data::EventData;
use crate::ids::{EntityId, EventId, SiteId};

/// Maximum significance rating.
pub const MAX_SIGNIFICANCE: u8 = 100;

/// Primary event categories, one per simulated domain.
///
/// `Disaster` doubles as the category of engine-level failure events.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Personal,
    Political,
    Military,
    Economic,
    Religious,
    Cultural,
    Natural,
    Magical,
    Social,
    Disaster,
}

impl EventCategory {
    /// Returns all category variants.
    pub fn all() -> &'static [EventCategory] {
        &[
            EventCategory::Personal,
            EventCategory::Political,
            EventCategory::Military,
            EventCategory::Economic,
            EventCategory::Religious,
            EventCategory::Cultural,
            EventCategory::Natural,
            EventCategory::Magical,
            EventCategory::Social,
            EventCategory::Disaster,
        ]
    }

    /// Stable name used in serialized forms and observer output.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Personal => "personal",
            EventCategory::Political => "political",
            EventCategory::Military => "military",
            EventCategory::Economic => "economic",
            EventCategory::Religious => "religious",
            EventCategory::Cultural => "cultural",
            EventCategory::Natural => "natural",
            EventCategory::Magical => "magical",
            EventCategory::Social => "social",
            EventCategory::Disaster => "disaster",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A delayed consequence an event may trigger.
///
/// At cascade depth `d` the rule fires when a uniform draw falls below
/// `base_probability * dampening^d` (times any named modifier).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsequenceRule {
    /// Subtype of the event the rule emits, e.g. `"battle.retaliation"`.
    pub event_subtype: String,
    /// Firing probability at depth zero, in `[0, 1]`.
    pub base_probability: f64,
    /// Category of the emitted event.
    pub category: EventCategory,
    /// Ticks between the parent event and the consequence.
    pub delay_ticks: u64,
    /// Per-depth probability multiplier, in `[0, 1]`.
    pub dampening: f64,
    /// Optional name of a registered probability modifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluator: Option<String>,
}

impl ConsequenceRule {
    /// Creates a rule with no dampening and no evaluator.
    pub fn new(
        event_subtype: impl Into<String>,
        base_probability: f64,
        category: EventCategory,
        delay_ticks: u64,
    ) -> Self {
        Self {
            event_subtype: event_subtype.into(),
            base_probability: base_probability.clamp(0.0, 1.0),
            category,
            delay_ticks,
            dampening: 1.0,
            evaluator: None,
        }
    }

    /// Sets the per-depth dampening factor.
    pub fn with_dampening(mut self, dampening: f64) -> Self {
        self.dampening = dampening.clamp(0.0, 1.0);
        self
    }

    /// Names a probability modifier to consult when the rule is evaluated.
    pub fn with_evaluator(mut self, evaluator: impl Into<String>) -> Self {
        self.evaluator = Some(evaluator.into());
        self
    }
}

/// A complete world event.
///
/// `participants` order is significant: some domain systems read the first
/// entry as the instigator and the second as the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldEvent {
    /// Log-allocated id; [`EventId::UNASSIGNED`] until appended.
    pub id: EventId,
    /// Primary category.
    pub category: EventCategory,
    /// Dotted subtype within the category, e.g. `"battle.resolved"`.
    pub subtype: String,
    /// Tick the event occurred on.
    pub timestamp: u64,
    /// Entities involved, in role order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub participants: Vec<EntityId>,
    /// Site the event occurred at, if localized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SiteId>,
    /// Events that caused this one; all must already be in the log.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<EventId>,
    /// Events this one caused. Appended by the log as cascades fire.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub consequences: Vec<EventId>,
    /// Free-form payload.
    #[serde(default, skip_serializing_if = "EventData::is_null")]
    pub data: EventData,
    /// Importance rating, 0-100.
    pub significance: u8,
    /// Delayed consequences this event may trigger.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub consequence_potential: Vec<ConsequenceRule>,
    /// Offset applied by systems that back- or fore-date derived records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporal_offset: Option<i64>,
}

impl WorldEvent {
    /// Starts building an event of the given category and subtype.
    pub fn builder(category: EventCategory, subtype: impl Into<String>) -> EventBuilder {
        EventBuilder::new(category, subtype)
    }

    /// True when the entity appears among the participants.
    pub fn involves(&self, entity: EntityId) -> bool {
        self.participants.contains(&entity)
    }

    /// True when significance meets or exceeds the threshold.
    pub fn is_significant(&self, threshold: u8) -> bool {
        self.significance >= threshold
    }

    /// Serializes the event to a JSON line (for JSONL streams).
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes an event from a JSON line.
    pub fn from_jsonl(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// Fluent builder for [`WorldEvent`].
///
/// # Example
///
/// ```
/// use world_events::{EntityId, EventCategory, WorldEvent};
///
/// let event = WorldEvent::builder(EventCategory::Military, "battle.resolved")
///     .timestamp(412)
///     .participant(EntityId(3))
///     .participant(EntityId(9))
///     .significance(75)
///     .build();
/// assert_eq!(event.subtype, "battle.resolved");
/// assert_eq!(event.participants.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct EventBuilder {
    category: EventCategory,
    subtype: String,
    timestamp: u64,
    participants: Vec<EntityId>,
    location: Option<SiteId>,
    causes: Vec<EventId>,
    data: EventData,
    significance: u8,
    consequence_potential: Vec<ConsequenceRule>,
    temporal_offset: Option<i64>,
}

impl EventBuilder {
    /// Creates a builder with the required category and subtype.
    pub fn new(category: EventCategory, subtype: impl Into<String>) -> Self {
        Self {
            category,
            subtype: subtype.into(),
            timestamp: 0,
            participants: Vec::new(),
            location: None,
            causes: Vec::new(),
            data: EventData::Null,
            significance: 0,
            consequence_potential: Vec::new(),
            temporal_offset: None,
        }
    }

    /// Sets the tick the event occurred on.
    pub fn timestamp(mut self, tick: u64) -> Self {
        self.timestamp = tick;
        self
    }

    /// Appends a participant.
    pub fn participant(mut self, entity: impl Into<EntityId>) -> Self {
        self.participants.push(entity.into());
        self
    }

    /// Appends several participants, preserving order.
    pub fn participants(mut self, entities: impl IntoIterator<Item = EntityId>) -> Self {
        self.participants.extend(entities);
        self
    }

    /// Sets the site the event occurred at.
    pub fn location(mut self, site: SiteId) -> Self {
        self.location = Some(site);
        self
    }

    /// Appends a causing event id.
    pub fn cause(mut self, cause: EventId) -> Self {
        self.causes.push(cause);
        self
    }

    /// Replaces the payload.
    pub fn data(mut self, data: EventData) -> Self {
        self.data = data;
        self
    }

    /// Sets one payload key, promoting the payload to a map if needed.
    pub fn data_entry(mut self, key: impl Into<String>, value: impl Into<EventData>) -> Self {
        self.data.set(key, value);
        self
    }

    /// Sets significance, clamped to 100.
    pub fn significance(mut self, significance: u8) -> Self {
        self.significance = significance.min(MAX_SIGNIFICANCE);
        self
    }

    /// Appends a consequence rule.
    pub fn rule(mut self, rule: ConsequenceRule) -> Self {
        self.consequence_potential.push(rule);
        self
    }

    /// Sets the temporal offset.
    pub fn temporal_offset(mut self, offset: i64) -> Self {
        self.temporal_offset = Some(offset);
        self
    }

    /// Builds the event. The id stays [`EventId::UNASSIGNED`] until the
    /// event is appended to a log.
    pub fn build(self) -> WorldEvent {
        WorldEvent {
            id: EventId::UNASSIGNED,
            category: self.category,
            subtype: self.subtype,
            timestamp: self.timestamp,
            participants: self.participants,
            location: self.location,
            causes: self.causes,
            consequences: Vec::new(),
            data: self.data,
            significance: self.significance,
            consequence_potential: self.consequence_potential,
            temporal_offset: self.temporal_offset,
        }
    }
}
