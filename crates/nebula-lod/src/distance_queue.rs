//! Nearest-first queue for dispatching patch split requests.
//!
//! Split requests collected during a LOD pass are serviced in order of
//! camera distance so that, when the job system is saturated, the most
//! visually significant patches are refined first.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// An entry in the queue.
#[derive(Debug)]
struct DistanceEntry<T> {
    distance: f64,
    /// Insertion order; breaks distance ties first-in-first-out.
    sequence: u64,
    item: T,
}

impl<T> PartialEq for DistanceEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for DistanceEntry<T> {}

impl<T> PartialOrd for DistanceEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for DistanceEntry<T> {
    // Reversed so the max-heap pops the nearest entry.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Min-heap of items keyed by camera distance.
pub struct DistanceQueue<T> {
    heap: BinaryHeap<DistanceEntry<T>>,
    next_sequence: u64,
}

impl<T> Default for DistanceQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DistanceQueue<T> {
    /// Create a new empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_sequence: 0,
        }
    }

    /// Queue `item` at the given camera distance.
    pub fn push(&mut self, distance: f64, item: T) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(DistanceEntry {
            distance,
            sequence,
            item,
        });
    }

    /// Remove and return the nearest item with its distance.
    pub fn pop(&mut self) -> Option<(f64, T)> {
        self.heap.pop().map(|e| (e.distance, e.item))
    }

    /// Pop every item, nearest first.
    pub fn drain_nearest(&mut self) -> impl Iterator<Item = (f64, T)> + '_ {
        std::iter::from_fn(move || self.pop())
    }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drop every queued item.
    pub fn clear(&mut self) {
        self.heap.clear();
    }
}
