//! Execution machinery for the TaskWeave engine: the scheduler disciplines,
//! the process-wide task registry, the metrics aggregator, and the worker
//! pool that ties them together.

pub mod events;
pub mod metrics;
pub mod pool;
pub mod registry;
pub mod scheduler;

pub use events::{NullEventSink, TaskEventSink, TracingEventSink};
pub use metrics::{Metrics, MetricsSummary};
pub use pool::WorkerPool;
pub use registry::TaskRegistry;
pub use scheduler::{PriorityScheduler, RoundRobinScheduler, Scheduler, SchedulerKind};
