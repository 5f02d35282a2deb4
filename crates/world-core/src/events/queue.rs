//! Significance Queue
//!
//! Binary max-heap of events keyed by significance. Ties drain in
//! insertion order, which keeps drainage consistent across runs.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use world_events::WorldEvent;

#[derive(Debug, Clone)]
struct Entry {
    significance: u8,
    seq: u64,
    event: WorldEvent,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.significance == other.significance && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher significance first; earlier insertion wins ties.
        self.significance
            .cmp(&other.significance)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Max-heap of events by significance.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes an event. O(log n).
    pub fn enqueue(&mut self, event: WorldEvent) {
        let entry = Entry {
            significance: event.significance,
            seq: self.next_seq,
            event,
        };
        self.next_seq += 1;
        self.heap.push(entry);
    }

    /// Pops the most significant event. O(log n).
    pub fn dequeue(&mut self) -> Option<WorldEvent> {
        self.heap.pop().map(|entry| entry.event)
    }

    /// Peeks at the most significant event without removing it.
    pub fn peek(&self) -> Option<&WorldEvent> {
        self.heap.peek().map(|entry| &entry.event)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Removes and returns all events in descending significance.
    pub fn drain(&mut self) -> Vec<WorldEvent> {
        let mut drained = Vec::with_capacity(self.heap.len());
        while let Some(event) = self.dequeue() {
            drained.push(event);
        }
        drained
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use world_events::{EventCategory, WorldEvent};

    fn event(subtype: &str, significance: u8) -> WorldEvent {
        WorldEvent::builder(EventCategory::Personal, subtype)
            .significance(significance)
            .build()
    }

    #[test]
    fn test_dequeue_in_descending_significance() {
        let mut queue = EventQueue::new();
        for (subtype, sig) in [("low", 10u8), ("high", 90), ("mid", 50)] {
            queue.enqueue(event(subtype, sig));
        }
        let order: Vec<u8> = queue.drain().iter().map(|e| e.significance).collect();
        assert_eq!(order, vec![90, 50, 10]);
    }

    #[test]
    fn test_ties_drain_in_insertion_order() {
        let mut queue = EventQueue::new();
        queue.enqueue(event("first", 40));
        queue.enqueue(event("second", 40));
        queue.enqueue(event("third", 40));
        let order: Vec<String> = queue.drain().into_iter().map(|e| e.subtype).collect();
        assert_eq!(order, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_peek_does_not_remove() {
        let mut queue = EventQueue::new();
        queue.enqueue(event("only", 5));
        assert_eq!(queue.peek().unwrap().subtype, "only");
        assert_eq!(queue.len(), 1);
        assert!(queue.dequeue().is_some());
        assert!(queue.peek().is_none());
    }

    #[test]
    fn test_empty_queue() {
        let mut queue = EventQueue::new();
        assert!(queue.is_empty());
        assert!(queue.dequeue().is_none());
        assert!(queue.drain().is_empty());
    }
}
