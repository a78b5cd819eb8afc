//! Task-lifecycle event sink.
//!
//! A persistence collaborator (database, audit log) subscribes to lifecycle
//! events through this trait. The engine never depends on a sink for
//! correctness; the default sink discards everything.

use tracing::debug;

use taskweave_core::TaskSnapshot;

/// Receiver for task-lifecycle events. Implementations must be cheap and
/// non-blocking; they are invoked from worker and submission paths.
pub trait TaskEventSink: Send + Sync {
    fn task_created(&self, _task: &TaskSnapshot) {}

    fn task_started(&self, _task: &TaskSnapshot) {}

    fn task_completed(&self, _task: &TaskSnapshot) {}

    fn task_failed(&self, _task: &TaskSnapshot) {}
}

/// Discards every event.
pub struct NullEventSink;

impl TaskEventSink for NullEventSink {}

/// Logs every event at debug level.
pub struct TracingEventSink;

impl TaskEventSink for TracingEventSink {
    fn task_created(&self, task: &TaskSnapshot) {
        debug!(id = task.id, name = %task.name, "task created");
    }

    fn task_started(&self, task: &TaskSnapshot) {
        debug!(id = task.id, attempt = task.retry_count + 1, "task started");
    }

    fn task_completed(&self, task: &TaskSnapshot) {
        debug!(id = task.id, retries = task.retry_count, "task completed");
    }

    fn task_failed(&self, task: &TaskSnapshot) {
        debug!(id = task.id, retries = task.retry_count, "task failed");
    }
}
