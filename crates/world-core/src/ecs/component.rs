//! Components
//!
//! The closed set of component kinds entities may carry, as one tagged sum
//! type. Each variant is plain data; `to_data`/`from_data` are the pure
//! serialization projections used by observer deltas and what-if patches.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use world_events::{CharacterId, DeityId, EntityId, EventData, FactionId, SiteId};

use crate::error::{CoreError, CoreResult};

/// Tag identifying a component variant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ComponentKind {
    Position,
    Health,
    Status,
    Personality,
    Government,
    Membership,
    Ownership,
    Population,
    Territory,
    CreatureType,
    HiddenLocation,
    Domain,
    CreationHistory,
    OwnershipChain,
    Structures,
    Worshiper,
}

impl ComponentKind {
    /// Returns all component kinds.
    pub fn all() -> &'static [ComponentKind] {
        use ComponentKind::*;
        &[
            Position,
            Health,
            Status,
            Personality,
            Government,
            Membership,
            Ownership,
            Population,
            Territory,
            CreatureType,
            HiddenLocation,
            Domain,
            CreationHistory,
            OwnershipChain,
            Structures,
            Worshiper,
        ]
    }

    /// Stable kind name used in serialized forms.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Position => "Position",
            ComponentKind::Health => "Health",
            ComponentKind::Status => "Status",
            ComponentKind::Personality => "Personality",
            ComponentKind::Government => "Government",
            ComponentKind::Membership => "Membership",
            ComponentKind::Ownership => "Ownership",
            ComponentKind::Population => "Population",
            ComponentKind::Territory => "Territory",
            ComponentKind::CreatureType => "CreatureType",
            ComponentKind::HiddenLocation => "HiddenLocation",
            ComponentKind::Domain => "Domain",
            ComponentKind::CreationHistory => "CreationHistory",
            ComponentKind::OwnershipChain => "OwnershipChain",
            ComponentKind::Structures => "Structures",
            ComponentKind::Worshiper => "Worshiper",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComponentKind::all()
            .iter()
            .find(|kind| kind.as_str() == s)
            .copied()
            .ok_or_else(|| CoreError::Serialization(format!("unknown component kind '{s}'")))
    }
}

/// A component value attached to an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Component {
    Position { x: f64, y: f64 },
    Health { current: i32, maximum: i32 },
    Status { tags: Vec<String> },
    Personality {
        boldness: f64,
        ambition: f64,
        piety: f64,
        loyalty: f64,
    },
    Government {
        form: String,
        ruler: Option<CharacterId>,
    },
    Membership { faction: FactionId, role: String },
    Ownership { owner: EntityId },
    Population { count: u32 },
    Territory { sites: Vec<SiteId> },
    CreatureType { species: String },
    HiddenLocation {
        hidden: bool,
        discovery_difficulty: u8,
    },
    Domain { spheres: Vec<String> },
    CreationHistory {
        created_tick: u64,
        creator: Option<EntityId>,
    },
    OwnershipChain { owners: Vec<EntityId> },
    Structures { buildings: Vec<String> },
    Worshiper { deity: DeityId, devotion: f64 },
}

impl Component {
    /// The kind tag of this value.
    pub fn kind(&self) -> ComponentKind {
        match self {
            Component::Position { .. } => ComponentKind::Position,
            Component::Health { .. } => ComponentKind::Health,
            Component::Status { .. } => ComponentKind::Status,
            Component::Personality { .. } => ComponentKind::Personality,
            Component::Government { .. } => ComponentKind::Government,
            Component::Membership { .. } => ComponentKind::Membership,
            Component::Ownership { .. } => ComponentKind::Ownership,
            Component::Population { .. } => ComponentKind::Population,
            Component::Territory { .. } => ComponentKind::Territory,
            Component::CreatureType { .. } => ComponentKind::CreatureType,
            Component::HiddenLocation { .. } => ComponentKind::HiddenLocation,
            Component::Domain { .. } => ComponentKind::Domain,
            Component::CreationHistory { .. } => ComponentKind::CreationHistory,
            Component::OwnershipChain { .. } => ComponentKind::OwnershipChain,
            Component::Structures { .. } => ComponentKind::Structures,
            Component::Worshiper { .. } => ComponentKind::Worshiper,
        }
    }

    /// Pure projection to an [`EventData`] record.
    pub fn to_data(&self) -> EventData {
        fn text_list(items: &[String]) -> EventData {
            EventData::List(items.iter().map(|s| EventData::from(s.as_str())).collect())
        }
        fn id_list<I: Copy + Into<EntityId>>(items: &[I]) -> EventData {
            EventData::List(
                items
                    .iter()
                    .map(|&id| EventData::from(Into::<EntityId>::into(id).raw()))
                    .collect(),
            )
        }
        fn opt_id<I: Copy + Into<EntityId>>(id: Option<I>) -> EventData {
            match id {
                Some(id) => EventData::from(Into::<EntityId>::into(id).raw()),
                None => EventData::Null,
            }
        }

        let mut map = BTreeMap::new();
        match self {
            Component::Position { x, y } => {
                map.insert("x".into(), EventData::Float(*x));
                map.insert("y".into(), EventData::Float(*y));
            }
            Component::Health { current, maximum } => {
                map.insert("current".into(), EventData::Int(*current as i64));
                map.insert("maximum".into(), EventData::Int(*maximum as i64));
            }
            Component::Status { tags } => {
                map.insert("tags".into(), text_list(tags));
            }
            Component::Personality {
                boldness,
                ambition,
                piety,
                loyalty,
            } => {
                map.insert("boldness".into(), EventData::Float(*boldness));
                map.insert("ambition".into(), EventData::Float(*ambition));
                map.insert("piety".into(), EventData::Float(*piety));
                map.insert("loyalty".into(), EventData::Float(*loyalty));
            }
            Component::Government { form, ruler } => {
                map.insert("form".into(), EventData::from(form.as_str()));
                map.insert("ruler".into(), opt_id(*ruler));
            }
            Component::Membership { faction, role } => {
                map.insert("faction".into(), EventData::from(faction.raw()));
                map.insert("role".into(), EventData::from(role.as_str()));
            }
            Component::Ownership { owner } => {
                map.insert("owner".into(), EventData::from(owner.raw()));
            }
            Component::Population { count } => {
                map.insert("count".into(), EventData::from(*count));
            }
            Component::Territory { sites } => {
                map.insert("sites".into(), id_list(sites));
            }
            Component::CreatureType { species } => {
                map.insert("species".into(), EventData::from(species.as_str()));
            }
            Component::HiddenLocation {
                hidden,
                discovery_difficulty,
            } => {
                map.insert("hidden".into(), EventData::Bool(*hidden));
                map.insert(
                    "discovery_difficulty".into(),
                    EventData::Int(*discovery_difficulty as i64),
                );
            }
            Component::Domain { spheres } => {
                map.insert("spheres".into(), text_list(spheres));
            }
            Component::CreationHistory {
                created_tick,
                creator,
            } => {
                map.insert("created_tick".into(), EventData::from(*created_tick));
                map.insert("creator".into(), opt_id(*creator));
            }
            Component::OwnershipChain { owners } => {
                map.insert("owners".into(), id_list(owners));
            }
            Component::Structures { buildings } => {
                map.insert("buildings".into(), text_list(buildings));
            }
            Component::Worshiper { deity, devotion } => {
                map.insert("deity".into(), EventData::from(deity.raw()));
                map.insert("devotion".into(), EventData::Float(*devotion));
            }
        }
        EventData::Map(map)
    }

    /// Rebuilds a component of `kind` from its serialized projection.
    pub fn from_data(kind: ComponentKind, data: &EventData) -> CoreResult<Component> {
        fn missing(kind: ComponentKind, field: &str) -> CoreError {
            CoreError::Serialization(format!("{kind} record is missing '{field}'"))
        }
        fn float(kind: ComponentKind, data: &EventData, field: &str) -> CoreResult<f64> {
            data.get(field)
                .and_then(EventData::as_float)
                .ok_or_else(|| missing(kind, field))
        }
        fn int(kind: ComponentKind, data: &EventData, field: &str) -> CoreResult<i64> {
            data.get(field)
                .and_then(EventData::as_int)
                .ok_or_else(|| missing(kind, field))
        }
        fn text(kind: ComponentKind, data: &EventData, field: &str) -> CoreResult<String> {
            data.get(field)
                .and_then(EventData::as_text)
                .map(str::to_string)
                .ok_or_else(|| missing(kind, field))
        }
        fn text_list(kind: ComponentKind, data: &EventData, field: &str) -> CoreResult<Vec<String>> {
            let items = data
                .get(field)
                .and_then(EventData::as_list)
                .ok_or_else(|| missing(kind, field))?;
            items
                .iter()
                .map(|v| {
                    v.as_text()
                        .map(str::to_string)
                        .ok_or_else(|| missing(kind, field))
                })
                .collect()
        }
        fn id_list(kind: ComponentKind, data: &EventData, field: &str) -> CoreResult<Vec<EntityId>> {
            let items = data
                .get(field)
                .and_then(EventData::as_list)
                .ok_or_else(|| missing(kind, field))?;
            items
                .iter()
                .map(|v| {
                    v.as_int()
                        .map(|n| EntityId(n as u32))
                        .ok_or_else(|| missing(kind, field))
                })
                .collect()
        }
        fn opt_id(data: &EventData, field: &str) -> Option<EntityId> {
            data.get(field)
                .and_then(EventData::as_int)
                .map(|n| EntityId(n as u32))
        }

        Ok(match kind {
            ComponentKind::Position => Component::Position {
                x: float(kind, data, "x")?,
                y: float(kind, data, "y")?,
            },
            ComponentKind::Health => Component::Health {
                current: int(kind, data, "current")? as i32,
                maximum: int(kind, data, "maximum")? as i32,
            },
            ComponentKind::Status => Component::Status {
                tags: text_list(kind, data, "tags")?,
            },
            ComponentKind::Personality => Component::Personality {
                boldness: float(kind, data, "boldness")?,
                ambition: float(kind, data, "ambition")?,
                piety: float(kind, data, "piety")?,
                loyalty: float(kind, data, "loyalty")?,
            },
            ComponentKind::Government => Component::Government {
                form: text(kind, data, "form")?,
                ruler: opt_id(data, "ruler").map(Into::into),
            },
            ComponentKind::Membership => Component::Membership {
                faction: EntityId(int(kind, data, "faction")? as u32).into(),
                role: text(kind, data, "role")?,
            },
            ComponentKind::Ownership => Component::Ownership {
                owner: EntityId(int(kind, data, "owner")? as u32),
            },
            ComponentKind::Population => Component::Population {
                count: int(kind, data, "count")? as u32,
            },
            ComponentKind::Territory => Component::Territory {
                sites: id_list(kind, data, "sites")?
                    .into_iter()
                    .map(Into::into)
                    .collect(),
            },
            ComponentKind::CreatureType => Component::CreatureType {
                species: text(kind, data, "species")?,
            },
            ComponentKind::HiddenLocation => Component::HiddenLocation {
                hidden: data
                    .get("hidden")
                    .and_then(EventData::as_bool)
                    .ok_or_else(|| missing(kind, "hidden"))?,
                discovery_difficulty: int(kind, data, "discovery_difficulty")? as u8,
            },
            ComponentKind::Domain => Component::Domain {
                spheres: text_list(kind, data, "spheres")?,
            },
            ComponentKind::CreationHistory => Component::CreationHistory {
                created_tick: int(kind, data, "created_tick")? as u64,
                creator: opt_id(data, "creator"),
            },
            ComponentKind::OwnershipChain => Component::OwnershipChain {
                owners: id_list(kind, data, "owners")?,
            },
            ComponentKind::Structures => Component::Structures {
                buildings: text_list(kind, data, "buildings")?,
            },
            ComponentKind::Worshiper => Component::Worshiper {
                deity: EntityId(int(kind, data, "deity")? as u32).into(),
                devotion: float(kind, data, "devotion")?,
            },
        })
    }

    /// Merges a patch record over this component's serialized projection
    /// and rebuilds it. Keys absent from the patch keep their values.
    pub fn merge_patch(&mut self, patch: &EventData) -> CoreResult<()> {
        let mut data = self.to_data();
        data.merge(patch);
        *self = Component::from_data(self.kind(), &data)?;
        Ok(())
    }
}
