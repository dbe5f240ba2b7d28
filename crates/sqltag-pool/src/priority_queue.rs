//! Fixed-slot priority queue of waiting requests.

use crate::deque::{Deque, NodeHandle};

/// Location of an enqueued item, used to remove it before it is dequeued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueHandle {
    slot: usize,
    node: NodeHandle,
}

impl QueueHandle {
    /// The priority slot the item landed in.
    #[must_use]
    pub fn priority(&self) -> usize {
        self.slot
    }
}

/// A set of FIFO slots drained in strict priority order.
///
/// Slot `0` is the highest priority. Items enqueued with a priority outside
/// `0..size` go to the lowest-priority slot.
#[derive(Debug)]
pub struct PriorityQueue<T> {
    slots: Vec<Deque<T>>,
}

impl<T> PriorityQueue<T> {
    /// Create a queue with `size` priority slots (at least one).
    #[must_use]
    pub fn new(size: usize) -> Self {
        let slots = (0..size.max(1)).map(|_| Deque::new()).collect();
        Self { slots }
    }

    /// Number of priority slots.
    #[must_use]
    pub fn slots(&self) -> usize {
        self.slots.len()
    }

    /// Total number of queued items across all slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().map(Deque::len).sum()
    }

    /// Whether every slot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Deque::is_empty)
    }

    /// Append `item` to the slot for `priority`.
    pub fn enqueue(&mut self, item: T, priority: usize) -> QueueHandle {
        let slot = priority.min(self.slots.len() - 1);
        let node = self.slots[slot].push(item);
        QueueHandle { slot, node }
    }

    /// Take the oldest item from the highest-priority non-empty slot.
    pub fn dequeue(&mut self) -> Option<T> {
        self.slots.iter_mut().find_map(Deque::shift)
    }

    /// Remove a specific item if it is still queued.
    pub fn remove(&mut self, handle: QueueHandle) -> Option<T> {
        self.slots.get_mut(handle.slot)?.remove(handle.node)
    }

    /// Borrow the item that was enqueued last into the lowest non-empty slot.
    #[must_use]
    pub fn tail(&self) -> Option<&T> {
        self.slots.iter().rev().find_map(Deque::back)
    }

    /// Keep only the items for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        for slot in &mut self.slots {
            slot.retain(&mut keep);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_strict_priority_then_fifo() {
        let mut queue = PriorityQueue::new(3);
        queue.enqueue("low-1", 2);
        queue.enqueue("high-1", 0);
        queue.enqueue("mid-1", 1);
        queue.enqueue("high-2", 0);

        let drained: Vec<_> = std::iter::from_fn(|| queue.dequeue()).collect();
        assert_eq!(drained, vec!["high-1", "high-2", "mid-1", "low-1"]);
    }

    #[test]
    fn test_out_of_range_priority_goes_to_lowest_slot() {
        let mut queue = PriorityQueue::new(2);
        let handle = queue.enqueue("late", 99);
        assert_eq!(handle.priority(), 1);
        queue.enqueue("early", 0);
        assert_eq!(queue.dequeue(), Some("early"));
        assert_eq!(queue.dequeue(), Some("late"));
    }

    #[test]
    fn test_zero_slots_is_clamped_to_one() {
        let mut queue = PriorityQueue::new(0);
        assert_eq!(queue.slots(), 1);
        queue.enqueue(1, 5);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_remove_by_handle() {
        let mut queue = PriorityQueue::new(2);
        let first = queue.enqueue(1, 0);
        queue.enqueue(2, 0);

        assert_eq!(queue.remove(first), Some(1));
        assert_eq!(queue.remove(first), None);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.dequeue(), Some(2));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_tail_is_last_of_lowest_non_empty_slot() {
        let mut queue = PriorityQueue::new(3);
        assert!(queue.tail().is_none());
        queue.enqueue('a', 0);
        queue.enqueue('b', 1);
        queue.enqueue('c', 1);
        assert_eq!(queue.tail(), Some(&'c'));
    }

    proptest! {
        #[test]
        fn prop_dequeue_order_is_sorted_by_priority_then_arrival(
            priorities in proptest::collection::vec(0usize..6, 0..48)
        ) {
            let mut queue = PriorityQueue::new(4);
            for (arrival, priority) in priorities.iter().enumerate() {
                queue.enqueue(((*priority).min(3), arrival), *priority);
            }
            let drained: Vec<_> = std::iter::from_fn(|| queue.dequeue()).collect();
            let mut expected = drained.clone();
            expected.sort();
            prop_assert_eq!(drained, expected);
        }
    }
}
