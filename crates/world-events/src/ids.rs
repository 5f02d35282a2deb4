//! Entity Handles
//!
//! Opaque integer handles for entities and the tagged id types layered on
//! top of them. Handles are allocated from monotonic counters and never
//! reused within a run, so a stale handle can never silently alias a new
//! entity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle to an entity in the world.
///
/// The inner value is an allocation counter, not an index; holders must not
/// assume anything about it beyond identity and ordering.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct EntityId(pub u32);

impl EntityId {
    /// Returns the raw counter value.
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity_{}", self.0)
    }
}

macro_rules! tagged_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            Serialize, Deserialize, Default,
        )]
        #[serde(transparent)]
        pub struct $name(pub EntityId);

        impl $name {
            /// Returns the raw counter value.
            pub fn raw(self) -> u32 {
                self.0 .0
            }
        }

        impl From<$name> for EntityId {
            fn from(id: $name) -> EntityId {
                id.0
            }
        }

        impl From<EntityId> for $name {
            fn from(id: EntityId) -> $name {
                $name(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "_{}"), self.raw())
            }
        }
    };
}

tagged_id!(
    /// Id of an event in the event log. Allocated by the log, not the world.
    EventId,
    "evt"
);
tagged_id!(
    /// Id of a site (settlement, ruin, landmark) entity.
    SiteId,
    "site"
);
tagged_id!(
    /// Id of a faction entity.
    FactionId,
    "faction"
);
tagged_id!(
    /// Id of a deity entity.
    DeityId,
    "deity"
);
tagged_id!(
    /// Id of a character entity.
    CharacterId,
    "char"
);

impl EventId {
    /// Sentinel for an event that has not yet been appended to a log.
    pub const UNASSIGNED: EventId = EventId(EntityId(0));

    /// True once the log has allocated a real id for this event.
    pub fn is_assigned(self) -> bool {
        self.raw() != 0
    }
}
