//! Ordered buffers of ready tasks with a uniform submit/pull contract.

mod priority;
mod round_robin;

use std::str::FromStr;
use std::sync::Arc;

use taskweave_core::Task;

pub use priority::PriorityScheduler;
pub use round_robin::RoundRobinScheduler;

/// A thread-safe, ordered buffer of ready tasks.
///
/// Submitters stamp tasks `Ready` before calling [`Scheduler::submit`]; the
/// scheduler itself never touches task state, so retries and first
/// submissions look identical to it. Both operations may be called
/// concurrently from any number of threads.
pub trait Scheduler: Send + Sync {
    /// Add a ready task to the buffer.
    fn submit(&self, task: Arc<Task>);

    /// Remove and return the next task per the discipline's pull order, or
    /// `None` when the buffer is empty. Callers poll; blocking lives in the
    /// worker pool.
    fn next(&self) -> Option<Arc<Task>>;

    fn is_empty(&self) -> bool;

    fn len(&self) -> usize;
}

/// The two shipped scheduling disciplines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerKind {
    RoundRobin,
    Priority,
}

impl SchedulerKind {
    /// Instantiate the discipline.
    pub fn build(&self) -> Arc<dyn Scheduler> {
        match self {
            SchedulerKind::RoundRobin => Arc::new(RoundRobinScheduler::new()),
            SchedulerKind::Priority => Arc::new(PriorityScheduler::new()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulerKind::RoundRobin => "roundrobin",
            SchedulerKind::Priority => "priority",
        }
    }
}

impl FromStr for SchedulerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "priority" => Ok(SchedulerKind::Priority),
            "roundrobin" | "round-robin" => Ok(SchedulerKind::RoundRobin),
            other => Err(format!("unknown scheduler: {other}")),
        }
    }
}

impl std::fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parsing() {
        assert_eq!("priority".parse::<SchedulerKind>().unwrap(), SchedulerKind::Priority);
        assert_eq!("roundrobin".parse::<SchedulerKind>().unwrap(), SchedulerKind::RoundRobin);
        assert_eq!("round-robin".parse::<SchedulerKind>().unwrap(), SchedulerKind::RoundRobin);
        assert_eq!("Priority".parse::<SchedulerKind>().unwrap(), SchedulerKind::Priority);
        assert!("lifo".parse::<SchedulerKind>().is_err());
    }
}
