use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use taskweave_core::{Task, TaskError, TaskId, TaskState};

/// Process-wide mapping from task id to live task handle.
///
/// The registry holds shared handles, not ownership: the scheduler and the
/// executing worker mutate the same handle, and readers (the HTTP layer)
/// observe the latest state through it. One value per engine, passed by
/// reference to whoever needs it.
pub struct TaskRegistry {
    tasks: Mutex<BTreeMap<TaskId, Arc<Task>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        TaskRegistry {
            tasks: Mutex::new(BTreeMap::new()),
        }
    }

    /// Register a task handle. Rejects an already-known id before any
    /// scheduler interaction can happen.
    pub fn register(&self, task: Arc<Task>) -> Result<(), TaskError> {
        let mut tasks = self.tasks.lock();
        let id = task.id();
        if tasks.contains_key(&id) {
            return Err(TaskError::AlreadyRegistered(id));
        }
        tasks.insert(id, task);
        Ok(())
    }

    pub fn get(&self, id: TaskId) -> Option<Arc<Task>> {
        self.tasks.lock().get(&id).cloned()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.lock().contains_key(&id)
    }

    /// All handles in ascending id order.
    pub fn all(&self) -> Vec<Arc<Task>> {
        self.tasks.lock().values().cloned().collect()
    }

    pub fn by_state(&self, state: TaskState) -> Vec<Arc<Task>> {
        self.tasks
            .lock()
            .values()
            .filter(|task| task.state() == state)
            .cloned()
            .collect()
    }

    /// Tests only.
    pub fn clear(&self) {
        self.tasks.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}
