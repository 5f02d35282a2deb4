//! Event Log
//!
//! Append-only history with four indices: by id, by participant, by
//! category, and a time-sorted index kept in non-decreasing timestamp
//! order via binary-search insertion. The log owns the canonical copy of
//! every event; `consequences` lists are appended only through
//! [`EventLog::add_consequence`].

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use world_events::{EntityId, EventCategory, EventId, WorldEvent};

/// Append-only indexed event history.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    next_id: u32,
    by_id: BTreeMap<EventId, WorldEvent>,
    by_entity: BTreeMap<EntityId, Vec<EventId>>,
    by_category: BTreeMap<EventCategory, Vec<EventId>>,
    by_time: Vec<(u64, EventId)>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            by_id: BTreeMap::new(),
            by_entity: BTreeMap::new(),
            by_category: BTreeMap::new(),
            by_time: Vec::new(),
        }
    }

    /// Appends an event, allocating its id. Returns a clone of the stored
    /// event with the id filled in.
    pub fn append(&mut self, mut event: WorldEvent) -> WorldEvent {
        event.id = EventId(EntityId(self.next_id));
        self.next_id += 1;
        self.index(event.clone());
        event
    }

    /// Appends an event that already carries an id (snapshot restore),
    /// advancing the id counter past it. Returns false and stores nothing
    /// if the id is unassigned or already present.
    pub fn append_existing(&mut self, event: WorldEvent) -> bool {
        if !event.id.is_assigned() || self.by_id.contains_key(&event.id) {
            return false;
        }
        self.next_id = self.next_id.max(event.id.raw() + 1);
        self.index(event);
        true
    }

    fn index(&mut self, event: WorldEvent) {
        for &participant in &event.participants {
            self.by_entity.entry(participant).or_default().push(event.id);
        }
        self.by_category.entry(event.category).or_default().push(event.id);
        // Upper-bound insertion keeps equal timestamps in insertion order.
        let at = self.by_time.partition_point(|&(ts, _)| ts <= event.timestamp);
        self.by_time.insert(at, (event.timestamp, event.id));
        self.by_id.insert(event.id, event);
    }

    pub fn get(&self, id: EventId) -> Option<&WorldEvent> {
        self.by_id.get(&id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// The id the next appended event will receive.
    pub fn next_event_id(&self) -> u32 {
        self.next_id
    }

    /// Advances the id counter to at least `next` (restore).
    pub fn ensure_next_event_id(&mut self, next: u32) {
        self.next_id = self.next_id.max(next);
    }

    /// All events in timestamp order (insertion order within a timestamp).
    pub fn events_chronological(&self) -> Vec<&WorldEvent> {
        self.by_time
            .iter()
            .filter_map(|&(_, id)| self.by_id.get(&id))
            .collect()
    }

    /// Events the entity participated in, in append order.
    pub fn get_by_entity(&self, entity: EntityId) -> Vec<&WorldEvent> {
        self.by_entity
            .get(&entity)
            .map(|ids| ids.iter().filter_map(|id| self.by_id.get(id)).collect())
            .unwrap_or_default()
    }

    /// Events of one category, in append order.
    pub fn get_by_category(&self, category: EventCategory) -> Vec<&WorldEvent> {
        self.by_category
            .get(&category)
            .map(|ids| ids.iter().filter_map(|id| self.by_id.get(id)).collect())
            .unwrap_or_default()
    }

    /// Events with `lo <= timestamp <= hi` (inclusive on both ends).
    pub fn get_by_time_range(&self, lo: u64, hi: u64) -> Vec<&WorldEvent> {
        let start = self.by_time.partition_point(|&(ts, _)| ts < lo);
        let end = self.by_time.partition_point(|&(ts, _)| ts <= hi);
        self.by_time[start..end]
            .iter()
            .filter_map(|&(_, id)| self.by_id.get(&id))
            .collect()
    }

    /// Records that `child` is a consequence of `parent`. Returns false if
    /// the parent is unknown.
    pub fn add_consequence(&mut self, parent: EventId, child: EventId) -> bool {
        match self.by_id.get_mut(&parent) {
            Some(event) => {
                event.consequences.push(child);
                true
            }
            None => false,
        }
    }

    /// Transitive causes of an event: backward BFS over `causes`, with a
    /// visited set so cycles terminate. The starting event is excluded.
    pub fn get_chain(&self, id: EventId) -> Vec<EventId> {
        self.traverse(id, |event| &event.causes)
    }

    /// Transitive consequences of an event: forward BFS over
    /// `consequences`, with a visited set. The starting event is excluded.
    pub fn get_cascade(&self, id: EventId) -> Vec<EventId> {
        self.traverse(id, |event| &event.consequences)
    }

    fn traverse(&self, start: EventId, edges: impl Fn(&WorldEvent) -> &Vec<EventId>) -> Vec<EventId> {
        let mut visited = BTreeSet::from([start]);
        let mut queue = VecDeque::from([start]);
        let mut result = Vec::new();
        while let Some(id) = queue.pop_front() {
            let Some(event) = self.by_id.get(&id) else { continue };
            for &next in edges(event) {
                if visited.insert(next) {
                    result.push(next);
                    queue.push_back(next);
                }
            }
        }
        result
    }

    /// Drops all events. The id counter keeps advancing so cleared ids are
    /// never reissued within the run.
    pub fn clear(&mut self) {
        self.by_id.clear();
        self.by_entity.clear();
        self.by_category.clear();
        self.by_time.clear();
    }
}
