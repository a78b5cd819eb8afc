use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use parking_lot::RwLock;

use crate::error::PayloadError;
use crate::payload::Payload;
use crate::priority::TaskPriority;
use crate::state::TaskState;

/// Unique identifier for a task, chosen by the submitter.
/// Valid ids lie in `[1, 2^31 - 2]`.
pub type TaskId = i32;

/// Identifier of the worker that ran a task's final attempt; 0 until set.
pub type WorkerId = u32;

/// The central entity: identity plus payload plus lifecycle accounting.
///
/// Identity fields (`id`, `name`, `kind`, `priority`, `max_retries`, the
/// payload) are fixed at construction. Lifecycle fields live behind a single
/// lock and are mutated only by the submitter before the first submit and by
/// the one worker currently executing the task; concurrent readers take a
/// [`TaskSnapshot`].
pub struct Task {
    id: TaskId,
    name: String,
    kind: String,
    priority: TaskPriority,
    max_retries: u32,
    payload: Payload,
    cells: RwLock<Cells>,
}

#[derive(Debug, Clone, Copy)]
struct Cells {
    state: TaskState,
    retry_count: u32,
    enqueued_at: Option<Instant>,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
    worker_id: WorkerId,
}

/// Point-in-time view of a task's lifecycle fields.
#[derive(Debug, Clone)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub name: String,
    pub kind: String,
    pub priority: TaskPriority,
    pub state: TaskState,
    pub retry_count: u32,
    pub max_retries: u32,
    pub enqueued_at: Option<Instant>,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
    pub worker_id: WorkerId,
}

impl Task {
    pub fn new(
        id: TaskId,
        name: impl Into<String>,
        kind: impl Into<String>,
        priority: TaskPriority,
        payload: Payload,
        max_retries: u32,
    ) -> Arc<Self> {
        Arc::new(Task {
            id,
            name: name.into(),
            kind: kind.into(),
            priority,
            max_retries,
            payload,
            cells: RwLock::new(Cells {
                state: TaskState::Created,
                retry_count: 0,
                enqueued_at: None,
                started_at: None,
                finished_at: None,
                worker_id: 0,
            }),
        })
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn priority(&self) -> TaskPriority {
        self.priority
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn state(&self) -> TaskState {
        self.cells.read().state
    }

    pub fn retry_count(&self) -> u32 {
        self.cells.read().retry_count
    }

    /// Stamped on every entry to `Ready`; the priority scheduler's FIFO
    /// tie-break key.
    pub fn enqueued_at(&self) -> Option<Instant> {
        self.cells.read().enqueued_at
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.cells.read().started_at
    }

    pub fn finished_at(&self) -> Option<Instant> {
        self.cells.read().finished_at
    }

    pub fn worker_id(&self) -> WorkerId {
        self.cells.read().worker_id
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        let cells = *self.cells.read();
        TaskSnapshot {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind.clone(),
            priority: self.priority,
            state: cells.state,
            retry_count: cells.retry_count,
            max_retries: self.max_retries,
            enqueued_at: cells.enqueued_at,
            started_at: cells.started_at,
            finished_at: cells.finished_at,
            worker_id: cells.worker_id,
        }
    }

    /// Move the task to `Ready` and stamp a fresh enqueue time. No-op if the
    /// transition is not allowed from the current state.
    pub fn mark_ready(&self) {
        let mut cells = self.cells.write();
        if !cells.state.can_transition(TaskState::Ready) {
            return;
        }
        cells.state = TaskState::Ready;
        cells.enqueued_at = Some(Instant::now());
    }

    /// Run the payload on behalf of `worker_id`.
    ///
    /// A no-op unless the task is `Ready`. Stamps the start time, invokes
    /// the payload (panics are contained and treated as failures), then
    /// transitions to `Completed` or `Failed`, stamping the end time and the
    /// worker id. The payload failure is handed back so the caller can
    /// schedule a retry.
    pub async fn execute(&self, worker_id: WorkerId) -> Result<(), PayloadError> {
        {
            let mut cells = self.cells.write();
            if !cells.state.can_transition(TaskState::Running) {
                return Ok(());
            }
            cells.state = TaskState::Running;
            cells.started_at = Some(Instant::now());
        }

        // The lock is never held across the payload await.
        let outcome = match std::panic::AssertUnwindSafe((self.payload)())
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => Err(PayloadError::Panicked(panic_message(panic))),
        };

        let mut cells = self.cells.write();
        cells.state = if outcome.is_ok() {
            TaskState::Completed
        } else {
            TaskState::Failed
        };
        cells.finished_at = Some(Instant::now());
        cells.worker_id = worker_id;
        outcome
    }

    /// Whether the retry budget still has room.
    pub fn should_retry(&self) -> bool {
        self.cells.read().retry_count < self.max_retries
    }

    /// Consume one retry: `Failed -> Retrying -> Ready` with a fresh enqueue
    /// time. No-op when the budget is exhausted or the task is not `Failed`.
    pub fn mark_retry(&self) {
        let mut cells = self.cells.write();
        if cells.retry_count >= self.max_retries {
            return;
        }
        if !cells.state.can_transition(TaskState::Retrying) {
            return;
        }
        cells.state = TaskState::Retrying;
        cells.retry_count += 1;

        // Straight back to READY with a new enqueue stamp.
        cells.state = TaskState::Ready;
        cells.enqueued_at = Some(Instant::now());
    }

    /// Pin the task to its terminal `Failed` state once retries are spent.
    pub fn mark_failed(&self) {
        self.cells.write().state = TaskState::Failed;
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .field("state", &self.state())
            .field("retry_count", &self.retry_count())
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn noop_task(id: TaskId, max_retries: u32) -> Arc<Task> {
        Task::new(
            id,
            format!("task-{id}"),
            "noop",
            TaskPriority::Medium,
            payload::noop(),
            max_retries,
        )
    }

    fn failing_task(id: TaskId, max_retries: u32) -> Arc<Task> {
        let payload: Payload = Arc::new(|| {
            Box::pin(async { Err(PayloadError::failed("boom")) }) as crate::PayloadFuture
        });
        Task::new(id, "failing", "test", TaskPriority::Medium, payload, max_retries)
    }

    #[test]
    fn starts_created_with_zeroed_accounting() {
        let task = noop_task(1, 3);
        assert_eq!(task.state(), TaskState::Created);
        assert_eq!(task.retry_count(), 0);
        assert!(task.enqueued_at().is_none());
        assert!(task.started_at().is_none());
        assert!(task.finished_at().is_none());
        assert_eq!(task.worker_id(), 0);
    }

    #[test]
    fn mark_ready_stamps_enqueue_time() {
        let task = noop_task(1, 0);
        task.mark_ready();
        assert_eq!(task.state(), TaskState::Ready);
        assert!(task.enqueued_at().is_some());
    }

    #[tokio::test]
    async fn execute_completes_and_stamps() {
        let task = noop_task(1, 0);
        task.mark_ready();
        task.execute(7).await.unwrap();

        assert_eq!(task.state(), TaskState::Completed);
        assert_eq!(task.worker_id(), 7);
        let snap = task.snapshot();
        assert!(snap.enqueued_at.unwrap() <= snap.started_at.unwrap());
        assert!(snap.started_at.unwrap() <= snap.finished_at.unwrap());
    }

    #[tokio::test]
    async fn execute_on_non_ready_is_noop() {
        let task = noop_task(1, 0);
        // Never marked ready.
        task.execute(1).await.unwrap();
        assert_eq!(task.state(), TaskState::Created);
        assert!(task.started_at().is_none());

        // Terminal tasks are equally inert.
        task.mark_ready();
        task.execute(1).await.unwrap();
        assert_eq!(task.state(), TaskState::Completed);
        let finished = task.finished_at();
        task.execute(2).await.unwrap();
        assert_eq!(task.finished_at(), finished);
        assert_eq!(task.worker_id(), 1);
    }

    #[tokio::test]
    async fn failure_is_reported_and_stamped() {
        let task = failing_task(1, 2);
        task.mark_ready();
        let err = task.execute(3).await.unwrap_err();
        assert!(matches!(err, PayloadError::Failed(_)));
        assert_eq!(task.state(), TaskState::Failed);
        assert_eq!(task.worker_id(), 3);
        assert!(task.finished_at().is_some());
    }

    #[tokio::test]
    async fn panicking_payload_is_a_failure() {
        let payload: Payload =
            Arc::new(|| {
                Box::pin(async {
                    panic!("intentional");
                    #[allow(unreachable_code)]
                    Ok(())
                }) as crate::PayloadFuture
            });
        let task = Task::new(9, "panics", "test", TaskPriority::Low, payload, 0);
        task.mark_ready();
        let err = task.execute(1).await.unwrap_err();
        assert!(matches!(err, PayloadError::Panicked(_)));
        assert_eq!(task.state(), TaskState::Failed);
    }

    #[tokio::test]
    async fn retry_cycle_increments_and_requeues() {
        let task = failing_task(1, 2);
        task.mark_ready();
        let first_enqueue = task.enqueued_at();
        task.execute(1).await.unwrap_err();

        assert!(task.should_retry());
        task.mark_retry();
        assert_eq!(task.state(), TaskState::Ready);
        assert_eq!(task.retry_count(), 1);
        assert_ne!(task.enqueued_at(), first_enqueue);
    }

    #[tokio::test]
    async fn retry_budget_is_a_hard_ceiling() {
        let task = failing_task(1, 1);
        task.mark_ready();
        task.execute(1).await.unwrap_err();
        task.mark_retry();
        assert_eq!(task.retry_count(), 1);

        task.execute(1).await.unwrap_err();
        assert!(!task.should_retry());
        task.mark_retry();
        // Budget exhausted: state and count unchanged.
        assert_eq!(task.retry_count(), 1);
        assert_eq!(task.state(), TaskState::Failed);
    }

    #[tokio::test]
    async fn mark_retry_requires_failed_state() {
        let task = noop_task(1, 5);
        task.mark_retry();
        assert_eq!(task.state(), TaskState::Created);
        assert_eq!(task.retry_count(), 0);
    }

    #[tokio::test]
    async fn fails_then_succeeds_within_budget() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let payload: Payload = Arc::new(move || {
            let counter = counter.clone();
            Box::pin(async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(PayloadError::failed("transient"))
                } else {
                    Ok(())
                }
            }) as crate::PayloadFuture
        });
        let task = Task::new(4, "flaky", "test", TaskPriority::High, payload, 3);

        task.mark_ready();
        for _ in 0..2 {
            task.execute(1).await.unwrap_err();
            task.mark_retry();
        }
        task.execute(1).await.unwrap();

        assert_eq!(task.state(), TaskState::Completed);
        assert_eq!(task.retry_count(), 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
