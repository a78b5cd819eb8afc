/// Task lifecycle states.
///
/// The numeric codes are part of the HTTP contract and must not be
/// reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TaskState {
    Created = 0,
    Ready = 1,
    Running = 2,
    Completed = 3,
    Failed = 4,
    Retrying = 5,
}

impl TaskState {
    /// Numeric code used by the HTTP layer.
    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Created => "created",
            TaskState::Ready => "ready",
            TaskState::Running => "running",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Retrying => "retrying",
        }
    }

    /// Whether the transition `self -> to` is allowed. Disallowed
    /// transitions are no-ops at the call sites, not errors.
    pub fn can_transition(&self, to: TaskState) -> bool {
        match self {
            TaskState::Created => to == TaskState::Ready,
            // A ready task may be re-enqueued after a retry.
            TaskState::Ready => to == TaskState::Running || to == TaskState::Ready,
            TaskState::Running => to == TaskState::Completed || to == TaskState::Failed,
            TaskState::Failed => to == TaskState::Retrying,
            TaskState::Retrying => to == TaskState::Ready,
            TaskState::Completed => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
