//! # Pending-wake structures.
//!
//! [`WakeQueue`] maps each sleeping task to its deadline. It holds **at most one entry per
//! task**: inserting a task that is already pending replaces its deadline.
//!
//! Two implementations are provided:
//! - [`ScanQueue`]: hash map scanned in full on every pass. Cheap inserts, `O(n)` scans;
//!   fine for tens to low hundreds of tasks.
//! - [`HeapQueue`]: min-heap ordered by deadline with lazy invalidation of replaced
//!   entries. `O(log n)` inserts, scans touch only due entries; for thousands of tasks.
//!
//! ## Ordering
//! Entries with equal deadlines have no defined relative order.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use crate::tasks::{TaskId, TaskRef};

/// Mapping from sleeping task to wake deadline.
pub trait WakeQueue: Send {
    /// Inserts or replaces the entry for `task`. Returns the replaced deadline, if any.
    fn insert(&mut self, task: TaskRef, deadline: Instant) -> Option<Instant>;

    /// Removes every entry with `deadline <= now`, appending its task to `due`.
    fn pop_due(&mut self, now: Instant, due: &mut Vec<TaskRef>);

    /// Removes and returns every entry.
    fn drain(&mut self) -> Vec<TaskRef>;

    /// Deadline currently pending for `id`.
    fn deadline_of(&self, id: TaskId) -> Option<Instant>;

    /// Number of pending tasks.
    fn len(&self) -> usize;

    /// Returns `true` if no task is pending.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Selects the [`WakeQueue`] implementation a scheduler uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QueueKind {
    /// [`ScanQueue`].
    #[default]
    Scan,
    /// [`HeapQueue`].
    Heap,
}

impl QueueKind {
    /// Builds an empty queue of this kind.
    pub fn build(self) -> Box<dyn WakeQueue> {
        match self {
            QueueKind::Scan => Box::new(ScanQueue::default()),
            QueueKind::Heap => Box::new(HeapQueue::default()),
        }
    }
}

struct Pending {
    task: TaskRef,
    deadline: Instant,
}

/// Hash map scanned in full.
#[derive(Default)]
pub struct ScanQueue {
    entries: HashMap<TaskId, Pending>,
}

impl WakeQueue for ScanQueue {
    fn insert(&mut self, task: TaskRef, deadline: Instant) -> Option<Instant> {
        self.entries
            .insert(task.id(), Pending { task, deadline })
            .map(|old| old.deadline)
    }

    fn pop_due(&mut self, now: Instant, due: &mut Vec<TaskRef>) {
        self.entries.retain(|_, p| {
            if p.deadline <= now {
                due.push(Arc::clone(&p.task));
                false
            } else {
                true
            }
        });
    }

    fn drain(&mut self) -> Vec<TaskRef> {
        self.entries.drain().map(|(_, p)| p.task).collect()
    }

    fn deadline_of(&self, id: TaskId) -> Option<Instant> {
        self.entries.get(&id).map(|p| p.deadline)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Heap key; `stamp` tells live entries from replaced ones.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct HeapKey {
    deadline: Instant,
    stamp: u64,
    id: TaskId,
}

struct Live {
    task: TaskRef,
    deadline: Instant,
    stamp: u64,
}

/// Deadline-ordered min-heap.
#[derive(Default)]
pub struct HeapQueue {
    heap: BinaryHeap<Reverse<HeapKey>>,
    live: HashMap<TaskId, Live>,
    stamp: u64,
}

impl HeapQueue {
    fn is_live(&self, key: &HeapKey) -> bool {
        self.live.get(&key.id).is_some_and(|l| l.stamp == key.stamp)
    }

    /// Drops stale keys once they outnumber live ones.
    fn compact(&mut self) {
        if self.heap.len() <= 2 * self.live.len() + 16 {
            return;
        }
        self.heap = self
            .live
            .iter()
            .map(|(id, l)| {
                Reverse(HeapKey {
                    deadline: l.deadline,
                    stamp: l.stamp,
                    id: *id,
                })
            })
            .collect();
    }
}

impl WakeQueue for HeapQueue {
    fn insert(&mut self, task: TaskRef, deadline: Instant) -> Option<Instant> {
        self.stamp += 1;
        let id = task.id();
        let key = HeapKey {
            deadline,
            stamp: self.stamp,
            id,
        };
        let replaced = self
            .live
            .insert(
                id,
                Live {
                    task,
                    deadline,
                    stamp: key.stamp,
                },
            )
            .map(|old| old.deadline);
        self.heap.push(Reverse(key));
        if replaced.is_some() {
            self.compact();
        }
        replaced
    }

    fn pop_due(&mut self, now: Instant, due: &mut Vec<TaskRef>) {
        while let Some(Reverse(top)) = self.heap.peek().copied() {
            if top.deadline > now {
                break;
            }
            self.heap.pop();
            if self.is_live(&top) {
                if let Some(l) = self.live.remove(&top.id) {
                    due.push(l.task);
                }
            }
        }
    }

    fn drain(&mut self) -> Vec<TaskRef> {
        self.heap.clear();
        self.live.drain().map(|(_, l)| l.task).collect()
    }

    fn deadline_of(&self, id: TaskId) -> Option<Instant> {
        self.live.get(&id).map(|l| l.deadline)
    }

    fn len(&self) -> usize {
        self.live.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::SuspendableTask;
    use std::time::Duration;

    fn kinds() -> [QueueKind; 2] {
        [QueueKind::Scan, QueueKind::Heap]
    }

    #[test]
    fn replacing_keeps_one_entry_with_latest_deadline() {
        for kind in kinds() {
            let mut q = kind.build();
            let t = SuspendableTask::new("t");
            let now = Instant::now();
            let d1 = now + Duration::from_millis(10);
            let d2 = now + Duration::from_millis(50);

            assert_eq!(q.insert(Arc::clone(&t), d1), None);
            assert_eq!(q.insert(Arc::clone(&t), d2), Some(d1));
            assert_eq!(q.len(), 1, "{kind:?}");
            assert_eq!(q.deadline_of(t.id()), Some(d2), "{kind:?}");

            let mut due = Vec::new();
            q.pop_due(d1, &mut due);
            assert!(due.is_empty(), "{kind:?}: stale deadline fired");
            q.pop_due(d2, &mut due);
            assert_eq!(due.len(), 1, "{kind:?}");
            assert!(q.is_empty());
        }
    }

    #[test]
    fn pops_only_due_entries() {
        for kind in kinds() {
            let mut q = kind.build();
            let now = Instant::now();
            let early = SuspendableTask::new("early");
            let late = SuspendableTask::new("late");
            q.insert(Arc::clone(&early), now);
            q.insert(Arc::clone(&late), now + Duration::from_secs(60));

            let mut due = Vec::new();
            q.pop_due(now, &mut due);
            assert_eq!(due.len(), 1, "{kind:?}");
            assert_eq!(due[0].id(), early.id());
            assert_eq!(q.deadline_of(early.id()), None);
            assert!(q.deadline_of(late.id()).is_some());
        }
    }

    #[test]
    fn past_deadline_is_due_immediately() {
        for kind in kinds() {
            let mut q = kind.build();
            let t = SuspendableTask::new("t");
            let now = Instant::now();
            q.insert(Arc::clone(&t), now);
            let mut due = Vec::new();
            q.pop_due(now + Duration::from_millis(1), &mut due);
            assert_eq!(due.len(), 1, "{kind:?}");
        }
    }

    #[test]
    fn drain_empties_the_queue() {
        for kind in kinds() {
            let mut q = kind.build();
            let now = Instant::now();
            for i in 0..5 {
                q.insert(SuspendableTask::new(format!("t{i}")), now + Duration::from_secs(i));
            }
            assert_eq!(q.drain().len(), 5, "{kind:?}");
            assert!(q.is_empty());
            let mut due = Vec::new();
            q.pop_due(now + Duration::from_secs(10), &mut due);
            assert!(due.is_empty());
        }
    }

    #[test]
    fn heap_pops_in_deadline_order_and_compacts() {
        let mut q = HeapQueue::default();
        let now = Instant::now();
        let t = SuspendableTask::new("hot");
        for i in 0..100 {
            q.insert(Arc::clone(&t), now + Duration::from_millis(i));
        }
        assert_eq!(q.len(), 1);
        assert!(q.heap.len() <= 2 * q.live.len() + 17);

        let a = SuspendableTask::new("a");
        let b = SuspendableTask::new("b");
        q.insert(Arc::clone(&b), now + Duration::from_millis(2));
        q.insert(Arc::clone(&a), now + Duration::from_millis(1));
        let mut due = Vec::new();
        q.pop_due(now + Duration::from_millis(2), &mut due);
        let names: Vec<&str> = due.iter().map(|t| t.name()).collect();
        assert_eq!(names, ["a", "b"]);
    }
}
