//! Fixed-size worker pool draining a scheduler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use taskweave_core::{Task, WorkerId};

use crate::events::{NullEventSink, TaskEventSink};
use crate::metrics::Metrics;
use crate::scheduler::Scheduler;

/// Upper bound on one idle wait, so shutdown is observed promptly even when
/// a notification is lost.
const IDLE_WAIT: Duration = Duration::from_millis(50);

const DEFAULT_RETRY_BASE: Duration = Duration::from_millis(50);

struct Shared {
    scheduler: Arc<dyn Scheduler>,
    metrics: Arc<Metrics>,
    events: Arc<dyn TaskEventSink>,
    retry_base: Duration,
    stop: AtomicBool,
    force: AtomicBool,
    accepting: AtomicBool,
    work_available: Notify,
}

/// Owns `N` workers and the scheduler chosen at construction.
///
/// Workers alternate between draining the scheduler and a bounded idle
/// wait. Payload failures drive the retry loop: a task with budget left is
/// re-stamped ready and re-submitted after a linear backoff of
/// `retry_base × retry_count`; an exhausted task is recorded as a final
/// failure. Neither path sleeps while holding a scheduler or registry lock.
pub struct WorkerPool {
    shared: Arc<Shared>,
    size: usize,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn new(scheduler: Arc<dyn Scheduler>, size: usize, metrics: Arc<Metrics>) -> Self {
        WorkerPool {
            shared: Arc::new(Shared {
                scheduler,
                metrics,
                events: Arc::new(NullEventSink),
                retry_base: DEFAULT_RETRY_BASE,
                stop: AtomicBool::new(false),
                force: AtomicBool::new(false),
                accepting: AtomicBool::new(true),
                work_available: Notify::new(),
            }),
            size,
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Replace the lifecycle-event sink. Only meaningful before `start`.
    pub fn with_event_sink(mut self, events: Arc<dyn TaskEventSink>) -> Self {
        let shared = Arc::get_mut(&mut self.shared).expect("pool not started");
        shared.events = events;
        self
    }

    /// Override the linear-backoff base. Only meaningful before `start`.
    pub fn with_retry_base(mut self, retry_base: Duration) -> Self {
        let shared = Arc::get_mut(&mut self.shared).expect("pool not started");
        shared.retry_base = retry_base;
        self
    }

    /// Spawn the worker tasks. Idempotent.
    pub fn start(&self) {
        let mut workers = self.workers.lock();
        if !workers.is_empty() {
            return;
        }
        for worker_id in 1..=self.size as WorkerId {
            let shared = self.shared.clone();
            workers.push(tokio::spawn(worker_loop(shared, worker_id)));
        }
        info!(workers = self.size, "worker pool started");
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn scheduler(&self) -> Arc<dyn Scheduler> {
        self.shared.scheduler.clone()
    }

    pub fn is_accepting(&self) -> bool {
        self.shared.accepting.load(Ordering::Acquire)
    }

    /// Stamp the task ready, hand it to the scheduler, and wake one idle
    /// worker. Submissions arriving after shutdown are dropped silently;
    /// graceful shutdown already stopped accepting before draining, so
    /// nothing submitted earlier can be lost.
    pub fn submit(&self, task: Arc<Task>) {
        if !self.shared.accepting.load(Ordering::Acquire) {
            debug!(id = task.id(), "pool not accepting, dropping task");
            return;
        }
        task.mark_ready();
        self.shared.scheduler.submit(task);
        self.shared.work_available.notify_one();
    }

    /// Graceful shutdown: stop accepting, let the workers drain the
    /// scheduler, then join them.
    pub async fn shutdown(&self) {
        self.shared.accepting.store(false, Ordering::Release);
        self.shared.stop.store(true, Ordering::Release);
        self.shared.work_available.notify_waiters();
        self.join().await;
        info!("worker pool stopped");
    }

    /// Forced shutdown: stop accepting and stop each worker after its
    /// current attempt, leaving any remaining queue behind.
    pub async fn shutdown_now(&self) {
        self.shared.accepting.store(false, Ordering::Release);
        self.shared.force.store(true, Ordering::Release);
        self.shared.stop.store(true, Ordering::Release);
        self.shared.work_available.notify_waiters();
        self.join().await;
        info!("worker pool stopped (forced)");
    }

    async fn join(&self) {
        let handles: Vec<_> = self.workers.lock().drain(..).collect();
        for handle in handles {
            if let Err(err) = handle.await {
                warn!("worker join failed: {err}");
            }
        }
    }
}

async fn worker_loop(shared: Arc<Shared>, worker_id: WorkerId) {
    debug!(worker_id, "worker started");
    loop {
        if shared.stop.load(Ordering::Acquire)
            && (shared.force.load(Ordering::Acquire) || shared.scheduler.is_empty())
        {
            break;
        }

        match shared.scheduler.next() {
            Some(task) => run_task(&shared, worker_id, task).await,
            None => {
                // Bounded wait: a lost wakeup costs at most IDLE_WAIT.
                let _ = tokio::time::timeout(IDLE_WAIT, shared.work_available.notified()).await;
            }
        }
    }
    debug!(worker_id, "worker exiting");
}

async fn run_task(shared: &Arc<Shared>, worker_id: WorkerId, task: Arc<Task>) {
    shared.events.task_started(&task.snapshot());

    match task.execute(worker_id).await {
        Ok(()) => {
            let snapshot = task.snapshot();
            shared.events.task_completed(&snapshot);
            shared.metrics.record(&snapshot);
        }
        Err(err) => {
            if task.should_retry() {
                task.mark_retry();
                let attempt = task.retry_count();
                warn!(id = task.id(), attempt, error = %err, "task failed, scheduling retry");
                tokio::time::sleep(shared.retry_base * attempt).await;
                shared.scheduler.submit(task);
                shared.work_available.notify_one();
            } else {
                task.mark_failed();
                let snapshot = task.snapshot();
                warn!(
                    id = snapshot.id,
                    retries = snapshot.retry_count,
                    error = %err,
                    "task failed permanently"
                );
                shared.events.task_failed(&snapshot);
                shared.metrics.record(&snapshot);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::RoundRobinScheduler;
    use taskweave_core::{payload, TaskPriority};

    fn pool_with(size: usize) -> WorkerPool {
        WorkerPool::new(
            Arc::new(RoundRobinScheduler::new()),
            size,
            Arc::new(Metrics::new()),
        )
    }

    fn noop_task(id: i32) -> Arc<Task> {
        Task::new(id, format!("t{id}"), "noop", TaskPriority::Medium, payload::noop(), 0)
    }

    #[tokio::test]
    async fn submit_stamps_ready_before_publishing() {
        let pool = pool_with(1);
        let task = noop_task(1);
        pool.submit(task.clone());

        assert_eq!(task.state(), taskweave_core::TaskState::Ready);
        assert!(task.enqueued_at().is_some());
        assert_eq!(pool.scheduler().len(), 1);
    }

    #[tokio::test]
    async fn submit_after_shutdown_is_dropped() {
        let pool = pool_with(1);
        pool.start();
        pool.shutdown().await;

        assert!(!pool.is_accepting());
        let task = noop_task(1);
        pool.submit(task.clone());
        assert_eq!(task.state(), taskweave_core::TaskState::Created);
        assert!(pool.scheduler().is_empty());
    }

    #[tokio::test]
    async fn reports_configured_size() {
        assert_eq!(pool_with(4).size(), 4);
    }
}
