//! Grudge Ledger
//!
//! Reference domain system: characters hold bounded grudge lists that
//! decay over time, drop below a forget threshold, and pass to heirs with
//! generational decay. Also the exemplar for the plug-in contract: lazy
//! bus subscription on first execute, private state keyed by entity id,
//! and snapshot participation through `serialize_state`.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use world_events::{EntityId, EventCategory, EventData, EventId, WorldEvent, DAYS_PER_YEAR};

use crate::clock::WorldClock;
use crate::ecs::World;
use crate::error::{CoreError, CoreResult};
use crate::events::{EventFabric, SubscriberId};

use super::{System, TickFrequency};

/// Tuning constants for grudge behavior.
pub mod grudge_constants {
    /// Most grudges one holder can carry; the weakest is evicted beyond this.
    pub const MAX_GRUDGES_PER_HOLDER: usize = 20;
    /// Severity multiplier per inheritance generation, applied to the
    /// original severity. Generations past the table inherit nothing.
    pub const INHERITANCE_DECAY: [f64; 4] = [1.0, 0.6, 0.3, 0.1];
    /// Grudges decayed below this severity are forgotten.
    pub const FORGET_THRESHOLD: f64 = 5.0;
    /// Severity lost per year without intensification.
    pub const DECAY_PER_YEAR: f64 = 2.0;
    /// Events below this significance do not register as offences.
    pub const MIN_OFFENCE_SIGNIFICANCE: u8 = 30;
}

/// One grudge held by one character.
#[derive(Debug, Clone, PartialEq)]
pub struct Grudge {
    pub against: EntityId,
    /// Severity at the last intensification.
    pub severity: f64,
    /// Severity at formation, before any decay or inheritance. The
    /// generational decay table applies to this value.
    pub original_severity: f64,
    pub formed_tick: u64,
    pub last_intensified_tick: u64,
    /// 0 for the original holder, +1 per inheritance.
    pub generation: u8,
    pub origin_event: Option<EventId>,
}

impl Grudge {
    /// Severity after time decay at `tick`.
    pub fn severity_at(&self, tick: u64) -> f64 {
        let days = tick.saturating_sub(self.last_intensified_tick) as f64;
        let decay = grudge_constants::DECAY_PER_YEAR * days / DAYS_PER_YEAR as f64;
        (self.severity - decay).max(0.0)
    }
}

/// Domain system maintaining per-character grudges.
pub struct GrudgeSystem {
    grudges: BTreeMap<EntityId, Vec<Grudge>>,
    inbox: Rc<RefCell<Vec<WorldEvent>>>,
    subscriptions: Vec<SubscriberId>,
}

impl Default for GrudgeSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl GrudgeSystem {
    pub fn new() -> Self {
        Self {
            grudges: BTreeMap::new(),
            inbox: Rc::new(RefCell::new(Vec::new())),
            subscriptions: Vec::new(),
        }
    }

    fn ensure_subscribed(&mut self, events: &EventFabric) {
        if !self.subscriptions.is_empty() {
            return;
        }
        for category in [EventCategory::Personal, EventCategory::Military] {
            let inbox = Rc::clone(&self.inbox);
            let id = events
                .bus()
                .on_category(category, move |event: &WorldEvent| {
                    inbox.borrow_mut().push(event.clone());
                });
            self.subscriptions.push(id);
        }
    }

    /// Records an offence: the victim forms or intensifies a grudge
    /// against the offender.
    pub fn record_offence(
        &mut self,
        holder: EntityId,
        against: EntityId,
        severity: f64,
        tick: u64,
        origin_event: Option<EventId>,
    ) {
        let list = self.grudges.entry(holder).or_default();
        if let Some(existing) = list.iter_mut().find(|g| g.against == against) {
            existing.severity = existing.severity_at(tick) + severity * 0.5;
            existing.last_intensified_tick = tick;
            return;
        }
        list.push(Grudge {
            against,
            severity,
            original_severity: severity,
            formed_tick: tick,
            last_intensified_tick: tick,
            generation: 0,
            origin_event,
        });
        Self::enforce_cap(list, tick);
    }

    fn enforce_cap(list: &mut Vec<Grudge>, tick: u64) {
        while list.len() > grudge_constants::MAX_GRUDGES_PER_HOLDER {
            let weakest = list
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    a.severity_at(tick).partial_cmp(&b.severity_at(tick)).unwrap()
                })
                .map(|(i, _)| i)
                .expect("list is non-empty");
            list.remove(weakest);
        }
    }

    /// Passes a dead holder's grudges to an heir with generational decay.
    /// Grudges past the last decay generation are not inherited.
    pub fn inherit_grudges(&mut self, heir: EntityId, from: EntityId, tick: u64) {
        let Some(source) = self.grudges.remove(&from) else { return };
        for grudge in source {
            let generation = grudge.generation + 1;
            let Some(&factor) = grudge_constants::INHERITANCE_DECAY.get(generation as usize) else {
                continue;
            };
            let severity = grudge.original_severity * factor;
            if severity < grudge_constants::FORGET_THRESHOLD {
                continue;
            }
            let list = self.grudges.entry(heir).or_default();
            if list.iter().any(|g| g.against == grudge.against) {
                continue;
            }
            list.push(Grudge {
                against: grudge.against,
                severity,
                original_severity: grudge.original_severity,
                formed_tick: grudge.formed_tick,
                last_intensified_tick: tick,
                generation,
                origin_event: grudge.origin_event,
            });
            Self::enforce_cap(self.grudges.get_mut(&heir).expect("just inserted"), tick);
        }
    }

    /// Grudges a holder currently carries.
    pub fn grudges_of(&self, holder: EntityId) -> &[Grudge] {
        self.grudges.get(&holder).map_or(&[], Vec::as_slice)
    }

    pub fn holder_count(&self) -> usize {
        self.grudges.len()
    }

    fn decay_and_forget(&mut self, tick: u64) {
        for list in self.grudges.values_mut() {
            list.retain(|g| g.severity_at(tick) >= grudge_constants::FORGET_THRESHOLD);
        }
        self.grudges.retain(|_, list| !list.is_empty());
    }
}

impl System for GrudgeSystem {
    fn name(&self) -> &str {
        "grudges"
    }

    fn frequency(&self) -> TickFrequency {
        TickFrequency::Daily
    }

    fn execution_order(&self) -> i32 {
        10
    }

    fn execute(&mut self, world: &mut World, clock: &WorldClock, events: &EventFabric) {
        self.ensure_subscribed(events);

        let drained: Vec<WorldEvent> = self.inbox.borrow_mut().drain(..).collect();
        for event in drained {
            if event.significance < grudge_constants::MIN_OFFENCE_SIGNIFICANCE {
                continue;
            }
            // Participant order: offender first, victim second.
            let [offender, victim] = match event.participants.as_slice() {
                [a, b, ..] => [*a, *b],
                _ => continue,
            };
            if !world.is_alive(victim) || !world.is_alive(offender) {
                continue;
            }
            self.record_offence(
                victim,
                offender,
                event.significance as f64,
                event.timestamp,
                Some(event.id),
            );
        }

        self.decay_and_forget(clock.current_tick());
    }

    fn serialize_state(&self) -> Option<EventData> {
        let mut holders = BTreeMap::new();
        for (holder, list) in &self.grudges {
            let entries: Vec<EventData> = list
                .iter()
                .map(|g| {
                    EventData::map([
                        ("against", EventData::from(g.against.raw())),
                        ("severity", EventData::Float(g.severity)),
                        ("original_severity", EventData::Float(g.original_severity)),
                        ("formed_tick", EventData::from(g.formed_tick)),
                        (
                            "last_intensified_tick",
                            EventData::from(g.last_intensified_tick),
                        ),
                        ("generation", EventData::Int(g.generation as i64)),
                        (
                            "origin_event",
                            g.origin_event
                                .map_or(EventData::Null, |id| EventData::from(id.raw())),
                        ),
                    ])
                })
                .collect();
            holders.insert(holder.raw().to_string(), EventData::List(entries));
        }
        Some(EventData::Map(holders))
    }

    fn restore_state(&mut self, state: &EventData) -> CoreResult<()> {
        let holders = state
            .as_map()
            .ok_or_else(|| CoreError::Serialization("grudge state is not a map".to_string()))?;
        let mut restored: BTreeMap<EntityId, Vec<Grudge>> = BTreeMap::new();
        for (holder_key, entries) in holders {
            let holder = holder_key.parse::<u32>().map(EntityId).map_err(|_| {
                CoreError::Serialization(format!("bad grudge holder id '{holder_key}'"))
            })?;
            let list = entries.as_list().ok_or_else(|| {
                CoreError::Serialization("grudge holder entry is not a list".to_string())
            })?;
            let mut grudges = Vec::with_capacity(list.len());
            for entry in list {
                let field = |name: &str| {
                    entry.get(name).ok_or_else(|| {
                        CoreError::Serialization(format!("grudge record is missing '{name}'"))
                    })
                };
                grudges.push(Grudge {
                    against: EntityId(field("against")?.as_int().unwrap_or_default() as u32),
                    severity: field("severity")?.as_float().unwrap_or_default(),
                    original_severity: field("original_severity")?.as_float().unwrap_or_default(),
                    formed_tick: field("formed_tick")?.as_int().unwrap_or_default() as u64,
                    last_intensified_tick: field("last_intensified_tick")?
                        .as_int()
                        .unwrap_or_default() as u64,
                    generation: field("generation")?.as_int().unwrap_or_default() as u8,
                    origin_event: entry
                        .get("origin_event")
                        .and_then(EventData::as_int)
                        .map(|raw| EventId(EntityId(raw as u32))),
                });
            }
            restored.insert(holder, grudges);
        }
        self.grudges = restored;
        Ok(())
    }
}
