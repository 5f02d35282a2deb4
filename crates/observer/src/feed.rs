//! Delta Feed
//!
//! Assembles per-tick [`TickDelta`] records for observers: events since
//! the last delta (most significant first), changed and removed entities
//! from the world's change journal, and compact entity updates for map
//! renderers.

use std::cell::RefCell;
use std::rc::Rc;

use world_core::ecs::{Component, ComponentKind, World};
use world_core::events::{EventBus, EventQueue, SubscriberId};
use world_events::delta::{ChangedEntity, EntityUpdate, EventView, TickDelta};
use world_events::{ticks_to_world_time, EntityId, WorldEvent};

/// Collects emitted events and builds deltas on demand.
pub struct ObserverFeed {
    inbox: Rc<RefCell<Vec<WorldEvent>>>,
    subscription: Option<SubscriberId>,
}

impl Default for ObserverFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ObserverFeed {
    pub fn new() -> Self {
        Self {
            inbox: Rc::new(RefCell::new(Vec::new())),
            subscription: None,
        }
    }

    /// Starts listening. Idempotent per bus; re-attaching replaces nothing.
    pub fn attach(&mut self, bus: &EventBus) {
        if self.subscription.is_some() {
            return;
        }
        let inbox = Rc::clone(&self.inbox);
        self.subscription = Some(bus.on_any(move |event: &WorldEvent| {
            inbox.borrow_mut().push(event.clone());
        }));
    }

    /// Stops listening.
    pub fn detach(&mut self, bus: &EventBus) {
        if let Some(id) = self.subscription.take() {
            bus.unsubscribe(id);
        }
    }

    /// Events collected since the last delta.
    pub fn pending_events(&self) -> usize {
        self.inbox.borrow().len()
    }

    /// Builds the delta for a completed tick, draining the collected
    /// events and the world's change journal.
    pub fn collect_delta(&mut self, world: &mut World, tick: u64) -> TickDelta {
        let mut delta = TickDelta::new(tick, ticks_to_world_time(tick));

        // Most significant events surface first.
        let mut queue = EventQueue::new();
        for event in self.inbox.borrow_mut().drain(..) {
            queue.enqueue(event);
        }
        delta.events = queue.drain().iter().map(EventView::from).collect();

        let journal = world.take_changes();
        delta.removed_entities = journal.removed;
        for (entity, kind) in journal.changed {
            // A component may be gone again by delta time; skip it then.
            let Some(component) = world.get_component(entity, kind) else { continue };
            delta.changed_entities.push(ChangedEntity {
                id: entity,
                kind: kind.as_str().to_string(),
                data: component.to_data(),
            });
        }

        delta.entity_updates = positioned_updates(world);
        delta
    }
}

/// Compact snapshots of every positioned entity, in id order.
fn positioned_updates(world: &World) -> Vec<EntityUpdate> {
    world
        .query(&[ComponentKind::Position])
        .into_iter()
        .filter_map(|entity| entity_update(world, entity))
        .collect()
}

fn entity_update(world: &World, entity: EntityId) -> Option<EntityUpdate> {
    let Component::Position { x, y } = world.get_component(entity, ComponentKind::Position)? else {
        return None;
    };
    let mut update = EntityUpdate::new(entity, entity_tag(world, entity), *x, *y);
    if let Some(Component::Membership { faction, .. }) =
        world.get_component(entity, ComponentKind::Membership)
    {
        update.faction = Some(faction.raw());
    }
    if let Some(Component::Population { count }) =
        world.get_component(entity, ComponentKind::Population)
    {
        update.population = Some(*count);
    }
    Some(update)
}

/// Entity type tag derived from its component mix.
fn entity_tag(world: &World, entity: EntityId) -> &'static str {
    if world.has_component(entity, ComponentKind::Domain) {
        "deity"
    } else if world.has_component(entity, ComponentKind::Territory)
        || world.has_component(entity, ComponentKind::Government)
    {
        "faction"
    } else if world.has_component(entity, ComponentKind::Structures)
        || world.has_component(entity, ComponentKind::Population)
    {
        "site"
    } else if world.has_component(entity, ComponentKind::CreatureType) {
        "creature"
    } else {
        "character"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use world_events::EventCategory;

    #[test]
    fn test_delta_orders_events_by_significance() {
        let bus = EventBus::new();
        let mut feed = ObserverFeed::new();
        feed.attach(&bus);

        for (subtype, sig) in [("minor", 5u8), ("major", 95), ("middling", 40)] {
            bus.dispatch(
                &WorldEvent::builder(EventCategory::Personal, subtype)
                    .timestamp(3)
                    .significance(sig)
                    .build(),
            );
        }
        let mut world = World::new();
        let delta = feed.collect_delta(&mut world, 3);

        let order: Vec<&str> = delta.events.iter().map(|e| e.subtype.as_str()).collect();
        assert_eq!(order, vec!["major", "middling", "minor"]);
        assert_eq!(delta.tick, 3);
        // Drained: the next delta starts empty.
        assert_eq!(feed.pending_events(), 0);
    }

    #[test]
    fn test_delta_carries_changes_and_removals() {
        let mut world = World::new();
        let keep = world.create_entity();
        world.add_component(keep, Component::Position { x: 1.0, y: 2.0 });
        let gone = world.create_entity();
        world.destroy_entity(gone);

        let mut feed = ObserverFeed::new();
        let delta = feed.collect_delta(&mut world, 0);

        assert_eq!(delta.removed_entities, vec![gone]);
        assert_eq!(delta.changed_entities.len(), 1);
        assert_eq!(delta.changed_entities[0].kind, "Position");
        assert_eq!(
            delta.changed_entities[0].data.get("x").and_then(world_events::EventData::as_float),
            Some(1.0)
        );
    }

    #[test]
    fn test_entity_updates_tagging() {
        let mut world = World::new();
        let site = world.create_entity();
        world.add_component(site, Component::Position { x: 10.0, y: 10.0 });
        world.add_component(site, Component::Population { count: 300 });
        let character = world.create_entity();
        world.add_component(character, Component::Position { x: 5.0, y: 5.0 });
        world.add_component(
            character,
            Component::Membership { faction: EntityId(9).into(), role: "scout".into() },
        );

        let mut feed = ObserverFeed::new();
        let delta = feed.collect_delta(&mut world, 1);

        assert_eq!(delta.entity_updates.len(), 2);
        let site_update = delta.entity_updates.iter().find(|u| u.id == site).unwrap();
        assert_eq!(site_update.tag, "site");
        assert_eq!(site_update.population, Some(300));
        let char_update = delta.entity_updates.iter().find(|u| u.id == character).unwrap();
        assert_eq!(char_update.tag, "character");
        assert_eq!(char_update.faction, Some(9));
    }

    #[test]
    fn test_delta_serializes_for_the_wire() {
        let bus = EventBus::new();
        let mut feed = ObserverFeed::new();
        feed.attach(&bus);
        bus.dispatch(
            &WorldEvent::builder(EventCategory::Natural, "flood.began")
                .timestamp(9)
                .significance(80)
                .build(),
        );
        let mut world = World::new();
        let delta = feed.collect_delta(&mut world, 9);

        let json = serde_json::to_string(&delta).unwrap();
        assert!(json.contains("flood.began"));
        assert!(json.contains(r#""category":"natural""#));
        let back: TickDelta = serde_json::from_str(&json).unwrap();
        assert_eq!(delta, back);
    }

    #[test]
    fn test_detach_stops_collection() {
        let bus = EventBus::new();
        let mut feed = ObserverFeed::new();
        feed.attach(&bus);
        feed.detach(&bus);
        bus.dispatch(&WorldEvent::builder(EventCategory::Personal, "x").build());
        assert_eq!(feed.pending_events(), 0);
    }
}
