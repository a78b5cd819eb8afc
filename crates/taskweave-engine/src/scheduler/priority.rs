use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use taskweave_core::{Task, TaskId, TaskPriority};

use super::Scheduler;

/// Heap entry: the ordering key is snapshotted at submit time, after the
/// submitter has stamped the task ready, so the key cannot shift while the
/// entry sits in the heap.
struct QueuedTask {
    priority: TaskPriority,
    enqueued_at: Instant,
    id: TaskId,
    task: Arc<Task>,
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedTask {}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher priority first, then earliest enqueue, then
        // smallest id as the deterministic tie-break.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.enqueued_at.cmp(&self.enqueued_at))
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Priority discipline: pulls the highest-priority task, breaking ties by
/// enqueue time and then id. Offers no starvation guarantee across
/// priorities: a steady stream of high-priority work delays lower
/// priorities indefinitely.
pub struct PriorityScheduler {
    heap: Mutex<BinaryHeap<QueuedTask>>,
}

impl PriorityScheduler {
    pub fn new() -> Self {
        PriorityScheduler {
            heap: Mutex::new(BinaryHeap::new()),
        }
    }
}

impl Default for PriorityScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for PriorityScheduler {
    fn submit(&self, task: Arc<Task>) {
        let entry = QueuedTask {
            priority: task.priority(),
            enqueued_at: task.enqueued_at().unwrap_or_else(Instant::now),
            id: task.id(),
            task,
        };
        self.heap.lock().push(entry);
    }

    fn next(&self) -> Option<Arc<Task>> {
        self.heap.lock().pop().map(|entry| entry.task)
    }

    fn is_empty(&self) -> bool {
        self.heap.lock().is_empty()
    }

    fn len(&self) -> usize {
        self.heap.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskweave_core::payload;

    fn ready_task(id: TaskId, priority: TaskPriority) -> Arc<Task> {
        let task = Task::new(id, format!("t{id}"), "noop", priority, payload::noop(), 0);
        task.mark_ready();
        task
    }

    #[test]
    fn empty_checks() {
        let scheduler = PriorityScheduler::new();
        assert!(scheduler.is_empty());
        assert!(scheduler.next().is_none());

        scheduler.submit(ready_task(1, TaskPriority::High));
        assert!(!scheduler.is_empty());
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn higher_priority_pulled_first() {
        let scheduler = PriorityScheduler::new();
        scheduler.submit(ready_task(1, TaskPriority::Low));
        scheduler.submit(ready_task(2, TaskPriority::Medium));
        scheduler.submit(ready_task(3, TaskPriority::High));

        assert_eq!(scheduler.next().unwrap().id(), 3);
        assert_eq!(scheduler.next().unwrap().id(), 2);
        assert_eq!(scheduler.next().unwrap().id(), 1);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn equal_priority_is_fifo_by_enqueue_time() {
        let scheduler = PriorityScheduler::new();
        for id in 1..=3 {
            let task = ready_task(id, TaskPriority::Medium);
            scheduler.submit(task);
            std::thread::sleep(std::time::Duration::from_millis(1));
        }

        assert_eq!(scheduler.next().unwrap().id(), 1);
        assert_eq!(scheduler.next().unwrap().id(), 2);
        assert_eq!(scheduler.next().unwrap().id(), 3);
    }

    #[test]
    fn full_tie_breaks_on_smaller_id() {
        let scheduler = PriorityScheduler::new();
        // Identical priority and enqueue instant: only the id differentiates.
        let stamp = Instant::now();
        for id in [30, 10, 20] {
            let task = ready_task(id, TaskPriority::High);
            scheduler.heap.lock().push(QueuedTask {
                priority: TaskPriority::High,
                enqueued_at: stamp,
                id,
                task,
            });
        }

        assert_eq!(scheduler.next().unwrap().id(), 10);
        assert_eq!(scheduler.next().unwrap().id(), 20);
        assert_eq!(scheduler.next().unwrap().id(), 30);
    }

    #[test]
    fn concurrent_submitters_lose_nothing() {
        let scheduler = Arc::new(PriorityScheduler::new());
        let submitters = 8;
        let per_submitter = 50;

        let handles: Vec<_> = (0..submitters)
            .map(|s| {
                let scheduler = scheduler.clone();
                std::thread::spawn(move || {
                    for j in 0..per_submitter {
                        let id = s * per_submitter + j + 1;
                        let priority = match id % 3 {
                            0 => TaskPriority::Low,
                            1 => TaskPriority::Medium,
                            _ => TaskPriority::High,
                        };
                        scheduler.submit(ready_task(id, priority));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut seen = std::collections::HashSet::new();
        while let Some(task) = scheduler.next() {
            assert!(seen.insert(task.id()), "duplicate task {}", task.id());
        }
        assert_eq!(seen.len(), (submitters * per_submitter) as usize);
    }
}
