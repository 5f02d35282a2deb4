//! Event Bus
//!
//! Synchronous dispatch to three handler sets: by subtype, by category,
//! and "any". Delivery order is fixed: subtype handlers, then category
//! handlers, then any-handlers, each in subscription order. Dispatch
//! iterates a snapshot of the handler lists, so unsubscribing during
//! dispatch is allowed but does not affect the dispatch in flight.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use world_events::{EventCategory, WorldEvent};

/// Receiver of dispatched events.
///
/// Sinks must not emit events from inside `on_event`; emission re-enters
/// the fabric and is reserved for systems.
pub trait EventSink {
    fn on_event(&mut self, event: &WorldEvent);
}

impl<F: FnMut(&WorldEvent)> EventSink for F {
    fn on_event(&mut self, event: &WorldEvent) {
        self(event)
    }
}

/// Handle returned from subscription; pass back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

type SharedSink = Rc<RefCell<dyn EventSink>>;

struct Registration {
    id: SubscriberId,
    sink: SharedSink,
}

#[derive(Default)]
struct Channels {
    by_subtype: BTreeMap<String, Vec<Registration>>,
    by_category: BTreeMap<EventCategory, Vec<Registration>>,
    any: Vec<Registration>,
}

/// Synchronous single-threaded event bus.
#[derive(Default)]
pub struct EventBus {
    channels: RefCell<Channels>,
    next_id: Cell<u64>,
    dispatched: Cell<u64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> SubscriberId {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        SubscriberId(id)
    }

    /// Subscribes a sink to one subtype.
    pub fn subscribe_subtype(&self, subtype: impl Into<String>, sink: SharedSink) -> SubscriberId {
        let id = self.allocate_id();
        self.channels
            .borrow_mut()
            .by_subtype
            .entry(subtype.into())
            .or_default()
            .push(Registration { id, sink });
        id
    }

    /// Subscribes a sink to one category.
    pub fn subscribe_category(&self, category: EventCategory, sink: SharedSink) -> SubscriberId {
        let id = self.allocate_id();
        self.channels
            .borrow_mut()
            .by_category
            .entry(category)
            .or_default()
            .push(Registration { id, sink });
        id
    }

    /// Subscribes a sink to every event.
    pub fn subscribe_any(&self, sink: SharedSink) -> SubscriberId {
        let id = self.allocate_id();
        self.channels.borrow_mut().any.push(Registration { id, sink });
        id
    }

    /// Closure-subscription convenience for one subtype.
    pub fn on_subtype(
        &self,
        subtype: impl Into<String>,
        handler: impl FnMut(&WorldEvent) + 'static,
    ) -> SubscriberId {
        self.subscribe_subtype(subtype, Rc::new(RefCell::new(handler)))
    }

    /// Closure-subscription convenience for one category.
    pub fn on_category(
        &self,
        category: EventCategory,
        handler: impl FnMut(&WorldEvent) + 'static,
    ) -> SubscriberId {
        self.subscribe_category(category, Rc::new(RefCell::new(handler)))
    }

    /// Closure-subscription convenience for all events.
    pub fn on_any(&self, handler: impl FnMut(&WorldEvent) + 'static) -> SubscriberId {
        self.subscribe_any(Rc::new(RefCell::new(handler)))
    }

    /// Drops a subscription. Returns false for an unknown handle.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut channels = self.channels.borrow_mut();
        let mut found = false;
        let mut prune = |registrations: &mut Vec<Registration>| {
            let before = registrations.len();
            registrations.retain(|r| r.id != id);
            found |= registrations.len() != before;
        };
        for registrations in channels.by_subtype.values_mut() {
            prune(registrations);
        }
        for registrations in channels.by_category.values_mut() {
            prune(registrations);
        }
        prune(&mut channels.any);
        found
    }

    /// Delivers an event to all matching sinks, synchronously, on the
    /// calling thread.
    pub fn dispatch(&self, event: &WorldEvent) {
        // Snapshot the matching sinks before invoking any of them.
        let sinks: Vec<SharedSink> = {
            let channels = self.channels.borrow();
            let mut sinks = Vec::new();
            if let Some(registrations) = channels.by_subtype.get(&event.subtype) {
                sinks.extend(registrations.iter().map(|r| Rc::clone(&r.sink)));
            }
            if let Some(registrations) = channels.by_category.get(&event.category) {
                sinks.extend(registrations.iter().map(|r| Rc::clone(&r.sink)));
            }
            sinks.extend(channels.any.iter().map(|r| Rc::clone(&r.sink)));
            sinks
        };
        for sink in sinks {
            sink.borrow_mut().on_event(event);
        }
        self.dispatched.set(self.dispatched.get() + 1);
    }

    /// Number of events dispatched over the bus's lifetime.
    pub fn dispatched_count(&self) -> u64 {
        self.dispatched.get()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        let channels = self.channels.borrow();
        channels.by_subtype.values().map(Vec::len).sum::<usize>()
            + channels.by_category.values().map(Vec::len).sum::<usize>()
            + channels.any.len()
    }
}
