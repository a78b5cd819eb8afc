use thiserror::Error;

use crate::task::TaskId;

/// Errors surfaced by the task model and registry.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Task ID already exists: {0}")]
    AlreadyRegistered(TaskId),
}

/// Failure reported by a payload at runtime.
///
/// Payloads must be safe to invoke again after returning this; the worker
/// uses it to drive the retry loop.
#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("{0}")]
    Failed(String),

    #[error("payload panicked: {0}")]
    Panicked(String),
}

impl PayloadError {
    pub fn failed(message: impl Into<String>) -> Self {
        PayloadError::Failed(message.into())
    }
}

pub type Result<T> = std::result::Result<T, TaskError>;
