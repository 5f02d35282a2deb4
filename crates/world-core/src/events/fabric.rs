//! Event Fabric
//!
//! The emission pipeline every event flows through, in fixed order: the
//! log assigns an id and indexes the event, the bus dispatches it to
//! subscribers, and the cascade engine inspects its consequence rules.
//! The fabric clones cheaply; systems receive one per tick and emit
//! through it.

use std::cell::RefCell;
use std::rc::Rc;

use world_events::{EventData, EventId, WorldEvent};

use super::bus::EventBus;
use super::cascade::CascadeEngine;
use super::log::EventLog;

/// Shared handle over the bus, log, and cascade engine.
#[derive(Clone)]
pub struct EventFabric {
    bus: Rc<EventBus>,
    log: Rc<RefCell<EventLog>>,
    cascade: Rc<RefCell<CascadeEngine>>,
}

impl EventFabric {
    pub fn new(
        bus: Rc<EventBus>,
        log: Rc<RefCell<EventLog>>,
        cascade: Rc<RefCell<CascadeEngine>>,
    ) -> Self {
        Self { bus, log, cascade }
    }

    /// Emits an event: append to log, dispatch, cascade inspection.
    /// Returns the id the log assigned.
    pub fn emit(&self, event: WorldEvent) -> EventId {
        self.emit_at_depth(event, 0)
    }

    fn emit_at_depth(&self, event: WorldEvent, depth: u32) -> EventId {
        let stored = self.log.borrow_mut().append(event);
        if depth > 0 {
            self.cascade.borrow_mut().note_depth(stored.id, depth);
        }
        self.bus.dispatch(&stored);
        self.cascade.borrow_mut().observe(&stored);
        stored.id
    }

    /// Releases every scheduled consequence due at or before `tick` as a
    /// real event. Returns how many were released.
    pub fn drain_due(&self, tick: u64) -> usize {
        let due = self.cascade.borrow_mut().take_due(tick);
        let released = due.len();
        for entry in due {
            let child = WorldEvent {
                id: EventId::UNASSIGNED,
                category: entry.category,
                subtype: entry.subtype,
                timestamp: entry.due_tick,
                participants: entry.participants,
                location: entry.location,
                causes: vec![entry.parent],
                consequences: Vec::new(),
                data: EventData::Null,
                significance: entry.significance,
                consequence_potential: entry.inherited_rules,
                temporal_offset: None,
            };
            let parent = entry.parent;
            let child_id = self.emit_at_depth(child, entry.depth);
            self.log.borrow_mut().add_consequence(parent, child_id);
        }
        released
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    pub fn log(&self) -> &Rc<RefCell<EventLog>> {
        &self.log
    }

    pub fn cascade(&self) -> &Rc<RefCell<CascadeEngine>> {
        &self.cascade
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::SeededRng;
    use world_events::{ConsequenceRule, EventCategory, WorldEvent};

    fn fabric_with_depth(max_depth: u32) -> EventFabric {
        EventFabric::new(
            Rc::new(EventBus::new()),
            Rc::new(RefCell::new(EventLog::new())),
            Rc::new(RefCell::new(
                CascadeEngine::new(SeededRng::new(42)).with_max_depth(max_depth),
            )),
        )
    }

    #[test]
    fn test_emit_assigns_id_and_logs() {
        let fabric = fabric_with_depth(10);
        let id = fabric.emit(WorldEvent::builder(EventCategory::Personal, "a").build());
        assert!(id.is_assigned());
        assert_eq!(fabric.log().borrow().len(), 1);
    }

    #[test]
    fn test_emit_reaches_subscribers() {
        let fabric = fabric_with_depth(10);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        fabric.bus().on_any(move |event: &WorldEvent| {
            sink.borrow_mut().push(event.subtype.clone());
        });
        fabric.emit(WorldEvent::builder(EventCategory::Personal, "hello").build());
        assert_eq!(*seen.borrow(), vec!["hello"]);
    }

    #[test]
    fn test_cascade_child_links_both_directions() {
        let fabric = fabric_with_depth(1);
        let rule = ConsequenceRule::new("x.y", 1.0, EventCategory::Personal, 2);
        let parent_id = fabric.emit(
            WorldEvent::builder(EventCategory::Personal, "origin")
                .timestamp(0)
                .rule(rule)
                .build(),
        );

        assert_eq!(fabric.drain_due(1), 0);
        assert_eq!(fabric.drain_due(2), 1);

        let log = fabric.log().borrow();
        assert_eq!(log.len(), 2);
        let parent = log.get(parent_id).unwrap();
        assert_eq!(parent.consequences.len(), 1);
        let child = log.get(parent.consequences[0]).unwrap();
        assert_eq!(child.timestamp, 2);
        assert_eq!(child.subtype, "x.y");
        assert_eq!(child.causes, vec![parent_id]);
        // Depth limit 1: the child inherits the rule but cannot re-fire.
        drop(log);
        assert_eq!(fabric.drain_due(10), 0);
        assert_eq!(fabric.log().borrow().len(), 2);
    }

    #[test]
    fn test_chained_cascade_respects_depth() {
        // Depth limit 3: origin -> c1 -> c2 -> c3, then the chain stops.
        let fabric = fabric_with_depth(3);
        let rule = ConsequenceRule::new("echo", 1.0, EventCategory::Personal, 1);
        fabric.emit(
            WorldEvent::builder(EventCategory::Personal, "origin")
                .timestamp(0)
                .rule(rule)
                .build(),
        );
        for tick in 1..=10 {
            fabric.drain_due(tick);
        }
        assert_eq!(fabric.log().borrow().len(), 4);
    }
}
