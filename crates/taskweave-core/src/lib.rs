//! Core task model for the TaskWeave engine.
//!
//! This crate defines the task entity (identity, priority, lifecycle state
//! machine, timing and retry accounting), the permissive JSON task-definition
//! loader, and the payload catalog that turns definitions into executable
//! tasks. The scheduling and execution machinery lives in `taskweave-engine`.

pub mod definition;
pub mod error;
pub mod loader;
pub mod payload;
pub mod priority;
pub mod state;
pub mod task;

pub use definition::TaskDefinition;
pub use error::{PayloadError, TaskError};
pub use payload::{Payload, PayloadCatalog, PayloadFuture};
pub use priority::TaskPriority;
pub use state::TaskState;
pub use task::{Task, TaskId, TaskSnapshot, WorkerId};

/// Largest accepted task id (`2^31 - 2`).
pub const MAX_TASK_ID: i64 = 2_147_483_646;

/// Largest accepted retry budget.
pub const MAX_RETRY_BUDGET: u32 = 100;
