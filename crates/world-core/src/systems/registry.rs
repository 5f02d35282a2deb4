//! System Registry
//!
//! Holds registered systems and decides, per tick, which run and in what
//! order: ascending `execution_order`, registration order on ties.

use std::collections::BTreeMap;

use world_events::EventData;

use crate::error::{CoreError, CoreResult};

use super::System;

/// Registered domain systems.
#[derive(Default)]
pub struct SystemRegistry {
    systems: Vec<Box<dyn System>>,
}

impl SystemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a system. Names must be unique.
    pub fn register(&mut self, system: Box<dyn System>) -> CoreResult<()> {
        if self.systems.iter().any(|s| s.name() == system.name()) {
            return Err(CoreError::InvalidArgument(format!(
                "system '{}' is already registered",
                system.name()
            )));
        }
        self.systems.push(system);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.systems.iter().map(|s| s.name()).collect()
    }

    /// Indices of the systems due on `tick`, in execution order.
    pub fn schedule_for_tick(&self, tick: u64) -> Vec<usize> {
        let mut due: Vec<usize> = (0..self.systems.len())
            .filter(|&i| self.systems[i].frequency().matches(tick))
            .collect();
        // Stable sort keeps registration order on equal execution_order.
        due.sort_by_key(|&i| self.systems[i].execution_order());
        due
    }

    pub fn get(&self, index: usize) -> Option<&dyn System> {
        self.systems.get(index).map(Box::as_ref)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Box<dyn System>> {
        self.systems.get_mut(index)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn System>> {
        self.systems.iter_mut()
    }

    /// Collects serialized state from every system that exposes it.
    pub fn serialize_states(&self) -> BTreeMap<String, EventData> {
        self.systems
            .iter()
            .filter_map(|s| s.serialize_state().map(|state| (s.name().to_string(), state)))
            .collect()
    }

    /// Pushes captured state back into systems by name. Names with no
    /// matching system are ignored.
    pub fn restore_states(&mut self, states: &BTreeMap<String, EventData>) -> CoreResult<()> {
        for system in &mut self.systems {
            if let Some(state) = states.get(system.name()) {
                system.restore_state(state)?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for SystemRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemRegistry")
            .field("systems", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::super::{System, TickFrequency};
    use super::*;
    use crate::clock::WorldClock;
    use crate::ecs::World;
    use crate::events::EventFabric;

    struct Stub {
        name: &'static str,
        frequency: TickFrequency,
        order: i32,
    }

    impl System for Stub {
        fn name(&self) -> &str {
            self.name
        }
        fn frequency(&self) -> TickFrequency {
            self.frequency
        }
        fn execution_order(&self) -> i32 {
            self.order
        }
        fn execute(&mut self, _world: &mut World, _clock: &WorldClock, _events: &EventFabric) {}
    }

    fn stub(name: &'static str, frequency: TickFrequency, order: i32) -> Box<Stub> {
        Box::new(Stub { name, frequency, order })
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = SystemRegistry::new();
        registry.register(stub("economy", TickFrequency::Daily, 0)).unwrap();
        let err = registry.register(stub("economy", TickFrequency::Weekly, 1));
        assert!(err.is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_schedule_filters_by_frequency() {
        let mut registry = SystemRegistry::new();
        registry.register(stub("daily", TickFrequency::Daily, 0)).unwrap();
        registry.register(stub("weekly", TickFrequency::Weekly, 0)).unwrap();
        registry.register(stub("monthly", TickFrequency::Monthly, 0)).unwrap();

        // Tick 0 divides everything.
        assert_eq!(registry.schedule_for_tick(0).len(), 3);
        assert_eq!(registry.schedule_for_tick(3).len(), 1);
        assert_eq!(registry.schedule_for_tick(14).len(), 2);
        assert_eq!(registry.schedule_for_tick(30).len(), 3);
    }

    #[test]
    fn test_schedule_orders_by_execution_order() {
        let mut registry = SystemRegistry::new();
        registry.register(stub("last", TickFrequency::Daily, 100)).unwrap();
        registry.register(stub("first", TickFrequency::Daily, -5)).unwrap();
        registry.register(stub("middle", TickFrequency::Daily, 10)).unwrap();

        let order: Vec<&str> = registry
            .schedule_for_tick(1)
            .into_iter()
            .map(|i| registry.get(i).unwrap().name())
            .collect();
        assert_eq!(order, vec!["first", "middle", "last"]);
    }

    #[test]
    fn test_ties_break_by_registration_order() {
        let mut registry = SystemRegistry::new();
        registry.register(stub("a", TickFrequency::Daily, 5)).unwrap();
        registry.register(stub("b", TickFrequency::Daily, 5)).unwrap();
        registry.register(stub("c", TickFrequency::Daily, 5)).unwrap();

        let order: Vec<&str> = registry
            .schedule_for_tick(1)
            .into_iter()
            .map(|i| registry.get(i).unwrap().name())
            .collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }
}
