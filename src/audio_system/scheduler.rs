//! Deferred actions on the game clock
//!
//! Single-fire timers keyed on a monotonic [`Duration`] since startup. The
//! owner polls once per tick; nothing here sleeps or spawns threads.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

struct Entry<T> {
    deadline: Duration,
    id: TimerId,
    payload: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.id == other.id
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    // Reversed so the max-heap pops the earliest deadline first; ties fire in
    // scheduling order.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.id.cmp(&self.id))
    }
}

pub struct Scheduler<T> {
    queue: BinaryHeap<Entry<T>>,
    cancelled: HashSet<TimerId>,
    next_id: u64,
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            queue: BinaryHeap::new(),
            cancelled: HashSet::new(),
            next_id: 0,
        }
    }

    pub fn schedule(&mut self, deadline: Duration, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;

        self.queue.push(Entry {
            deadline,
            id,
            payload,
        });

        id
    }

    /// Cancel a pending timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let pending = self.queue.iter().any(|entry| entry.id == id);
        pending && self.cancelled.insert(id)
    }

    /// Remove and return every payload whose deadline is at or before `now`,
    /// earliest first.
    pub fn poll(&mut self, now: Duration) -> Vec<T> {
        let mut due = Vec::new();

        while let Some(entry) = self.queue.peek() {
            if entry.deadline > now {
                break;
            }

            let Some(entry) = self.queue.pop() else {
                break;
            };

            if self.cancelled.remove(&entry.id) {
                continue;
            }

            due.push(entry.payload);
        }

        due
    }

    pub fn len(&self) -> usize {
        self.queue.len() - self.cancelled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_fires_in_deadline_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(ms(300), "c");
        scheduler.schedule(ms(100), "a");
        scheduler.schedule(ms(200), "b");

        assert!(scheduler.poll(ms(50)).is_empty());
        assert_eq!(scheduler.poll(ms(250)), vec!["a", "b"]);
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.poll(ms(300)), vec!["c"]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_ties_fire_in_schedule_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(ms(100), 1);
        scheduler.schedule(ms(100), 2);
        scheduler.schedule(ms(100), 3);

        assert_eq!(scheduler.poll(ms(100)), vec![1, 2, 3]);
    }

    #[test]
    fn test_cancel() {
        let mut scheduler = Scheduler::new();
        let a = scheduler.schedule(ms(100), "a");
        scheduler.schedule(ms(200), "b");

        assert!(scheduler.cancel(a));
        assert!(!scheduler.cancel(a));
        assert_eq!(scheduler.len(), 1);
        assert!(scheduler.poll(ms(150)).is_empty());

        assert_eq!(scheduler.poll(ms(1000)), vec!["b"]);
        assert!(!scheduler.cancel(a));
    }
}
