use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

use taskweave_core::{TaskSnapshot, TaskState};

/// Aggregates per-task timings and terminal outcomes under a single lock.
///
/// One `record` call per task that reached a terminal state; intermediate
/// failed attempts are folded in through the task's retry count.
pub struct Metrics {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    total: u64,
    completed: u64,
    failed_final: u64,
    retries_total: u64,
    total_wait: Duration,
    total_exec: Duration,
    min_exec: Option<Duration>,
    max_exec: Option<Duration>,
}

/// Value-type view of the aggregate, for the demo summary and tests.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub total: u64,
    pub completed: u64,
    pub failed_final: u64,
    pub retries_total: u64,
    pub avg_wait_ms: f64,
    pub avg_exec_ms: f64,
    pub min_exec_ms: f64,
    pub max_exec_ms: f64,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Fold a terminal task into the aggregate.
    ///
    /// Tasks that never reached `Running` carry no complete timing triple
    /// and are silently ignored: the metrics measure executed attempts, not
    /// dropped submissions.
    pub fn record(&self, task: &TaskSnapshot) {
        let (Some(enqueued), Some(started), Some(finished)) =
            (task.enqueued_at, task.started_at, task.finished_at)
        else {
            return;
        };

        let wait = started.saturating_duration_since(enqueued);
        let exec = finished.saturating_duration_since(started);

        let mut inner = self.inner.lock();
        inner.total += 1;
        inner.retries_total += u64::from(task.retry_count);
        match task.state {
            TaskState::Completed => inner.completed += 1,
            TaskState::Failed => inner.failed_final += 1,
            _ => {}
        }

        inner.total_wait += wait;
        inner.total_exec += exec;
        inner.min_exec = Some(inner.min_exec.map_or(exec, |min| min.min(exec)));
        inner.max_exec = Some(inner.max_exec.map_or(exec, |max| max.max(exec)));
    }

    pub fn summary(&self) -> MetricsSummary {
        let inner = self.inner.lock();
        let denominator = inner.total.max(1) as f64;
        MetricsSummary {
            total: inner.total,
            completed: inner.completed,
            failed_final: inner.failed_final,
            retries_total: inner.retries_total,
            avg_wait_ms: inner.total_wait.as_secs_f64() * 1000.0 / denominator,
            avg_exec_ms: inner.total_exec.as_secs_f64() * 1000.0 / denominator,
            min_exec_ms: inner.min_exec.unwrap_or_default().as_secs_f64() * 1000.0,
            max_exec_ms: inner.max_exec.unwrap_or_default().as_secs_f64() * 1000.0,
        }
    }

    /// Log the aggregate, one line per figure.
    pub fn log_summary(&self) {
        let summary = self.summary();
        if summary.total == 0 {
            info!("metrics: no tasks were executed");
            return;
        }
        info!(
            total = summary.total,
            completed = summary.completed,
            failed = summary.failed_final,
            retries = summary.retries_total,
            "metrics: task outcomes"
        );
        info!(
            avg_wait_ms = format_args!("{:.3}", summary.avg_wait_ms),
            avg_exec_ms = format_args!("{:.3}", summary.avg_exec_ms),
            min_exec_ms = format_args!("{:.3}", summary.min_exec_ms),
            max_exec_ms = format_args!("{:.3}", summary.max_exec_ms),
            "metrics: task timings"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use taskweave_core::TaskPriority;

    fn snapshot(state: TaskState, retries: u32, wait: Duration, exec: Duration) -> TaskSnapshot {
        let enqueued = Instant::now();
        TaskSnapshot {
            id: 1,
            name: "t".into(),
            kind: "noop".into(),
            priority: TaskPriority::Medium,
            state,
            retry_count: retries,
            max_retries: retries,
            enqueued_at: Some(enqueued),
            started_at: Some(enqueued + wait),
            finished_at: Some(enqueued + wait + exec),
            worker_id: 1,
        }
    }

    #[test]
    fn records_completed_and_failed() {
        let metrics = Metrics::new();
        metrics.record(&snapshot(
            TaskState::Completed,
            2,
            Duration::from_millis(5),
            Duration::from_millis(10),
        ));
        metrics.record(&snapshot(
            TaskState::Failed,
            1,
            Duration::from_millis(5),
            Duration::from_millis(30),
        ));

        let summary = metrics.summary();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.failed_final, 1);
        assert_eq!(summary.retries_total, 3);
        assert!((summary.avg_exec_ms - 20.0).abs() < 1.0);
        assert!((summary.min_exec_ms - 10.0).abs() < 1.0);
        assert!((summary.max_exec_ms - 30.0).abs() < 1.0);
    }

    #[test]
    fn never_run_tasks_are_ignored() {
        let metrics = Metrics::new();
        let mut snap = snapshot(TaskState::Completed, 0, Duration::ZERO, Duration::ZERO);
        snap.started_at = None;
        snap.finished_at = None;
        metrics.record(&snap);

        assert_eq!(metrics.summary().total, 0);
    }

    #[test]
    fn empty_summary_is_zeroed() {
        let summary = Metrics::new().summary();
        assert_eq!(summary.total, 0);
        assert_eq!(summary.avg_wait_ms, 0.0);
        assert_eq!(summary.min_exec_ms, 0.0);
    }
}
