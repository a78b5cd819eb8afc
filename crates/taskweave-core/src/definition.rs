use std::collections::BTreeMap;

use serde::Serialize;

use crate::priority::TaskPriority;
use crate::task::TaskId;

/// Validated task-definition record produced by the loader.
///
/// `kind` plus `params` select a payload from the catalog; the rest maps
/// straight onto the task's identity fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDefinition {
    pub id: TaskId,
    pub name: String,
    pub priority: TaskPriority,
    pub max_retries: u32,
    #[serde(rename = "type")]
    pub kind: String,
    pub params: BTreeMap<String, String>,
}

impl Default for TaskDefinition {
    fn default() -> Self {
        TaskDefinition {
            id: 0,
            name: String::new(),
            priority: TaskPriority::default(),
            max_retries: 0,
            kind: String::new(),
            params: BTreeMap::new(),
        }
    }
}
