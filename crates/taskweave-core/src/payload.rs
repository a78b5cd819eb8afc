//! Payload catalog: maps a definition's `type` to an executable payload.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::definition::TaskDefinition;
use crate::error::PayloadError;
use crate::task::Task;

/// Future returned by one payload invocation.
pub type PayloadFuture = Pin<Box<dyn Future<Output = Result<(), PayloadError>> + Send>>;

/// An opaque, re-runnable unit of work. Invoking it either completes
/// normally or fails with a [`PayloadError`]; it must be safe to invoke
/// again after a failure.
pub type Payload = Arc<dyn Fn() -> PayloadFuture + Send + Sync>;

/// Constructor invoked once per definition to build that task's payload.
pub type PayloadCtor = Arc<dyn Fn(&TaskDefinition) -> Payload + Send + Sync>;

/// A payload that finishes immediately.
pub fn noop() -> Payload {
    Arc::new(|| Box::pin(async { Ok(()) }) as PayloadFuture)
}

/// Registry of `type name -> payload constructor`.
///
/// Unknown types fall back to a payload that prints the task name, so a
/// definition never fails to produce a runnable task.
pub struct PayloadCatalog {
    ctors: HashMap<String, PayloadCtor>,
}

impl PayloadCatalog {
    /// Empty catalog; every type resolves to the default payload.
    pub fn new() -> Self {
        PayloadCatalog {
            ctors: HashMap::new(),
        }
    }

    /// Catalog with the built-in `sleep` and `print` payloads.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();

        catalog.register("sleep", |def| {
            let duration_ms = def
                .params
                .get("duration_ms")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(100);
            Arc::new(move || {
                Box::pin(async move {
                    tokio::time::sleep(Duration::from_millis(duration_ms)).await;
                    Ok(())
                }) as PayloadFuture
            })
        });

        catalog.register("print", |def| {
            let message = def
                .params
                .get("message")
                .cloned()
                .unwrap_or_else(|| def.name.clone());
            Arc::new(move || {
                let message = message.clone();
                Box::pin(async move {
                    println!("[task] {message}");
                    Ok(())
                }) as PayloadFuture
            })
        });

        catalog
    }

    /// Register a constructor for a task type, replacing any previous one.
    pub fn register<F>(&mut self, kind: impl Into<String>, ctor: F)
    where
        F: Fn(&TaskDefinition) -> Payload + Send + Sync + 'static,
    {
        self.ctors.insert(kind.into(), Arc::new(ctor));
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.ctors.contains_key(kind)
    }

    /// Build an executable task from a definition.
    pub fn build(&self, def: &TaskDefinition) -> Arc<Task> {
        let payload = match self.ctors.get(&def.kind) {
            Some(ctor) => ctor(def),
            None => {
                debug!(id = def.id, kind = %def.kind, "unknown task type, using default payload");
                default_payload(def)
            }
        };
        Task::new(
            def.id,
            def.name.clone(),
            def.kind.clone(),
            def.priority,
            payload,
            def.max_retries,
        )
    }
}

impl Default for PayloadCatalog {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn default_payload(def: &TaskDefinition) -> Payload {
    let name = def.name.clone();
    Arc::new(move || {
        let name = name.clone();
        Box::pin(async move {
            println!("[task] executing: {name}");
            Ok(())
        }) as PayloadFuture
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::priority::TaskPriority;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Instant;

    fn def(kind: &str, params: &[(&str, &str)]) -> TaskDefinition {
        TaskDefinition {
            id: 1,
            name: "sample".to_string(),
            priority: TaskPriority::Medium,
            max_retries: 0,
            kind: kind.to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[tokio::test]
    async fn sleep_payload_blocks_for_duration() {
        let catalog = PayloadCatalog::with_builtins();
        let task = catalog.build(&def("sleep", &[("duration_ms", "20")]));
        task.mark_ready();

        let start = Instant::now();
        task.execute(1).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn sleep_duration_defaults_when_malformed() {
        let catalog = PayloadCatalog::with_builtins();
        // Non-numeric duration falls back to the 100ms default.
        let task = catalog.build(&def("sleep", &[("duration_ms", "soon")]));
        task.mark_ready();

        let start = Instant::now();
        task.execute(1).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn unknown_type_gets_default_payload() {
        let catalog = PayloadCatalog::with_builtins();
        let task = catalog.build(&def("transmogrify", &[]));
        task.mark_ready();
        task.execute(1).await.unwrap();
        assert_eq!(task.state(), crate::TaskState::Completed);
    }

    #[tokio::test]
    async fn custom_registration_wins() {
        let hit = Arc::new(AtomicBool::new(false));
        let flag = hit.clone();

        let mut catalog = PayloadCatalog::with_builtins();
        catalog.register("print", move |_def| {
            let flag = flag.clone();
            Arc::new(move || {
                let flag = flag.clone();
                Box::pin(async move {
                    flag.store(true, Ordering::SeqCst);
                    Ok(())
                }) as PayloadFuture
            })
        });

        let task = catalog.build(&def("print", &[]));
        task.mark_ready();
        task.execute(1).await.unwrap();
        assert!(hit.load(Ordering::SeqCst));
    }
}
