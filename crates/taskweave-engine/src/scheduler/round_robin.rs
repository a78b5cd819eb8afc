use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use taskweave_core::Task;

use super::Scheduler;

/// FIFO discipline: the longest-waiting task is pulled first and priority
/// is ignored entirely.
pub struct RoundRobinScheduler {
    queue: Mutex<VecDeque<Arc<Task>>>,
}

impl RoundRobinScheduler {
    pub fn new() -> Self {
        RoundRobinScheduler {
            queue: Mutex::new(VecDeque::new()),
        }
    }
}

impl Default for RoundRobinScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for RoundRobinScheduler {
    fn submit(&self, task: Arc<Task>) {
        self.queue.lock().push_back(task);
    }

    fn next(&self) -> Option<Arc<Task>> {
        self.queue.lock().pop_front()
    }

    fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    fn len(&self) -> usize {
        self.queue.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskweave_core::{payload, TaskPriority};

    fn ready_task(id: i32, priority: TaskPriority) -> Arc<Task> {
        let task = Task::new(id, format!("t{id}"), "noop", priority, payload::noop(), 0);
        task.mark_ready();
        task
    }

    #[test]
    fn empty_checks() {
        let scheduler = RoundRobinScheduler::new();
        assert!(scheduler.is_empty());
        assert!(scheduler.next().is_none());

        scheduler.submit(ready_task(1, TaskPriority::Medium));
        assert!(!scheduler.is_empty());
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn pull_order_equals_submission_order() {
        let scheduler = RoundRobinScheduler::new();
        for id in 1..=5 {
            scheduler.submit(ready_task(id, TaskPriority::Medium));
        }
        for expected in 1..=5 {
            assert_eq!(scheduler.next().unwrap().id(), expected);
        }
        assert!(scheduler.is_empty());
    }

    #[test]
    fn priority_is_ignored() {
        let scheduler = RoundRobinScheduler::new();
        scheduler.submit(ready_task(1, TaskPriority::High));
        scheduler.submit(ready_task(2, TaskPriority::Low));
        scheduler.submit(ready_task(3, TaskPriority::Medium));

        assert_eq!(scheduler.next().unwrap().id(), 1);
        assert_eq!(scheduler.next().unwrap().id(), 2);
        assert_eq!(scheduler.next().unwrap().id(), 3);
    }

    #[test]
    fn concurrent_submitters_lose_nothing() {
        let scheduler = Arc::new(RoundRobinScheduler::new());
        let submitters = 8;
        let per_submitter = 50;

        let handles: Vec<_> = (0..submitters)
            .map(|s| {
                let scheduler = scheduler.clone();
                std::thread::spawn(move || {
                    for j in 0..per_submitter {
                        scheduler.submit(ready_task(s * per_submitter + j + 1, TaskPriority::Low));
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
