use std::collections::BTreeMap;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskweave_core::{loader, TaskDefinition, TaskPriority};
use taskweave_server::config::Mode;
use taskweave_server::{AppState, CliArgs, EngineConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = EngineConfig::load(&args);
    // A fatal configuration failure exits non-zero.
    config.validate()?;
    info!(
        threads = config.threads,
        scheduler = %config.scheduler,
        mode = %config.mode,
        "starting taskweave"
    );

    let state = AppState::build(config);
    state.pool.start();

    match state.config.mode {
        Mode::Demo => run_demo(&state).await,
        Mode::Api => run_api(state.clone()).await?,
    }

    state.metrics.log_summary();
    Ok(())
}

/// Execute the task file (or a built-in batch), drain, and exit.
async fn run_demo(state: &AppState) {
    let mut definitions = loader::load_from_file(&state.config.tasks_path);
    if definitions.is_empty() {
        info!(
            path = %state.config.tasks_path.display(),
            "no task file found, running built-in demo batch"
        );
        definitions = demo_batch(state.config.max_retries);
    }

    for def in definitions {
        let task = state.catalog.build(&def);
        if state.registry.register(task.clone()).is_err() {
            warn!(id = def.id, "skipping duplicate task id");
            continue;
        }
        state.events.task_created(&task.snapshot());
        state.pool.submit(task);
    }

    // Wait for every registered task to reach a terminal state, then stop.
    while !state
        .registry
        .all()
        .iter()
        .all(|task| task.state().is_terminal())
    {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    state.pool.shutdown().await;
}

/// Serve the control plane until interrupted; the server stops before the
/// pool shuts down.
async fn run_api(state: AppState) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", state.config.api_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API server listening on {addr}");

    let app = taskweave_server::router(state.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped, draining worker pool");
    state.pool.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
    }
}

/// Small mixed-priority batch used when no task file is present.
fn demo_batch(max_retries: u32) -> Vec<TaskDefinition> {
    let mut definitions = Vec::new();
    for (id, name, priority, kind, params) in [
        (1, "warmup", TaskPriority::Low, "sleep", vec![("duration_ms", "150")]),
        (2, "announce", TaskPriority::High, "print", vec![("message", "high priority first")]),
        (3, "steady", TaskPriority::Medium, "print", vec![]),
        (4, "nap", TaskPriority::Medium, "sleep", vec![("duration_ms", "50")]),
        (5, "farewell", TaskPriority::Low, "print", vec![("message", "low priority last")]),
    ] {
        definitions.push(TaskDefinition {
            id,
            name: name.to_string(),
            priority,
            max_retries,
            kind: kind.to_string(),
            params: params
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        });
    }
    definitions
}
