//! Permissive JSON loader for task-definition documents.
//!
//! The document shape is `{ "tasks": [ <definition>, ... ] }`. Unknown
//! fields are ignored; malformed fields are warned about and defaulted;
//! definitions without a usable id are dropped. Both entry points return
//! the valid definitions, possibly none.

use std::path::Path;

use serde_json::Value;
use tracing::{error, warn};

use crate::definition::TaskDefinition;
use crate::priority::TaskPriority;
use crate::{MAX_RETRY_BUDGET, MAX_TASK_ID};

/// Parse a task document from a JSON string.
pub fn load_from_str(json: &str) -> Vec<TaskDefinition> {
    match serde_json::from_str::<Value>(json) {
        Ok(doc) => load_from_document(&doc),
        Err(err) => {
            error!("JSON parse error: {err}");
            Vec::new()
        }
    }
}

/// Read and parse a task document from a file.
pub fn load_from_file(path: impl AsRef<Path>) -> Vec<TaskDefinition> {
    let path = path.as_ref();
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            error!("Failed to read task file {}: {err}", path.display());
            return Vec::new();
        }
    };
    match serde_json::from_str::<Value>(&contents) {
        Ok(doc) => load_from_document(&doc),
        Err(err) => {
            error!("JSON parse error in file {}: {err}", path.display());
            Vec::new()
        }
    }
}

fn load_from_document(doc: &Value) -> Vec<TaskDefinition> {
    let Some(tasks) = doc.get("tasks").and_then(Value::as_array) else {
        error!("Invalid task document: 'tasks' key not found or not an array");
        return Vec::new();
    };

    tasks
        .iter()
        .filter_map(|entry| {
            let def = parse_definition(entry);
            (def.id > 0).then_some(def)
        })
        .collect()
}

fn parse_definition(value: &Value) -> TaskDefinition {
    let mut def = TaskDefinition::default();

    match value.get("id").and_then(Value::as_i64) {
        Some(id) if (1..=MAX_TASK_ID).contains(&id) => def.id = id as i32,
        Some(id) => {
            warn!("Invalid task ID: {id}. Must be between 1 and {MAX_TASK_ID}");
        }
        None => {
            warn!("Task missing required 'id' field or invalid type");
        }
    }

    if let Some(name) = value.get("name").and_then(Value::as_str) {
        def.name = name.to_string();
    }

    if let Some(priority) = value.get("priority").and_then(Value::as_str) {
        match TaskPriority::parse(priority) {
            Some(parsed) => def.priority = parsed,
            None => warn!("Invalid priority value: {priority}. Using MEDIUM"),
        }
    }

    // Both spellings are accepted, snake_case first.
    let retries = value
        .get("max_retries")
        .or_else(|| value.get("maxRetries"))
        .and_then(Value::as_i64);
    if let Some(retries) = retries {
        if (0..=MAX_RETRY_BUDGET as i64).contains(&retries) {
            def.max_retries = retries as u32;
        } else {
            warn!("Invalid max_retries: {retries}. Must be between 0 and {MAX_RETRY_BUDGET}");
        }
    }

    if let Some(kind) = value.get("type").and_then(Value::as_str) {
        def.kind = kind.to_string();
    }

    if let Some(params) = value.get("params").and_then(Value::as_object) {
        for (key, entry) in params {
            match entry {
                Value::String(s) => {
                    def.params.insert(key.clone(), s.clone());
                }
                Value::Number(n) => {
                    def.params.insert(key.clone(), n.to_string());
                }
                Value::Bool(b) => {
                    def.params.insert(key.clone(), b.to_string());
                }
                // Arrays, objects, and nulls are not scalar parameters.
                _ => {}
            }
        }
    }

    def
}
