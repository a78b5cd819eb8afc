use std::sync::Arc;
use std::time::Instant;

use taskweave_core::PayloadCatalog;
use taskweave_engine::{Metrics, TaskEventSink, TaskRegistry, TracingEventSink, WorkerPool};

use crate::config::EngineConfig;

/// Shared handles behind every HTTP handler. Everything is `Arc`ed, so the
/// state clones per-request for free.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<EngineConfig>,
    pub registry: Arc<TaskRegistry>,
    pub metrics: Arc<Metrics>,
    pub pool: Arc<WorkerPool>,
    pub catalog: Arc<PayloadCatalog>,
    pub events: Arc<dyn TaskEventSink>,
    pub started_at: Instant,
}

impl AppState {
    /// Wire up a full engine from a resolved configuration. The pool is not
    /// started; callers start it once everything else is in place.
    pub fn build(config: EngineConfig) -> Self {
        let scheduler = config.scheduler.build();
        let metrics = Arc::new(Metrics::new());
        let events: Arc<dyn TaskEventSink> = Arc::new(TracingEventSink);
        let pool = Arc::new(
            WorkerPool::new(scheduler, config.threads, metrics.clone())
                .with_event_sink(events.clone()),
        );

        AppState {
            config: Arc::new(config),
            registry: Arc::new(TaskRegistry::new()),
            metrics,
            pool,
            catalog: Arc::new(PayloadCatalog::with_builtins()),
            events,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
