//! Engine configuration: defaults, then config file, then environment,
//! then command line, each layer overriding the last. Invalid values warn
//! and keep the previous layer's value; `validate` catches anything fatal
//! before the engine starts.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::Parser;
use serde::Deserialize;
use tracing::warn;

use taskweave_engine::SchedulerKind;

pub const MIN_THREADS: usize = 1;
pub const MAX_THREADS: usize = 128;
pub const MIN_PORT: u16 = 1024;
pub const MAX_REQUEST_SIZE_CEILING: usize = 10 * 1024 * 1024;

/// Run mode: `demo` executes a task file and exits, `api` serves the HTTP
/// control plane until interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Demo,
    Api,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "demo" => Ok(Mode::Demo),
            "api" => Ok(Mode::Api),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Mode::Demo => "demo",
            Mode::Api => "api",
        })
    }
}

#[derive(Debug, Parser)]
#[command(name = "taskweave")]
#[command(about = "In-process task-execution engine with an HTTP control plane", long_about = None)]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Number of worker threads (1-128)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Scheduler discipline (priority|roundrobin)
    #[arg(long)]
    pub scheduler: Option<String>,

    /// Default retry budget for demo tasks (0-100)
    #[arg(long)]
    pub max_retries: Option<i64>,

    /// API server port (1024-65535)
    #[arg(long)]
    pub api_port: Option<u16>,

    /// Run mode (demo|api)
    #[arg(long)]
    pub mode: Option<String>,

    /// Maximum request body size in bytes
    #[arg(long)]
    pub max_request_size: Option<i64>,

    /// CORS origin sent on every API response
    #[arg(long)]
    pub cors_origin: Option<String>,

    /// Task file executed in demo mode
    #[arg(long)]
    pub tasks: Option<PathBuf>,

    /// Dashboard HTML file served at /
    #[arg(long)]
    pub dashboard: Option<PathBuf>,
}

/// Resolved engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub threads: usize,
    pub scheduler: SchedulerKind,
    pub max_retries: u32,
    pub api_port: u16,
    pub mode: Mode,
    pub max_request_size: usize,
    pub cors_origin: String,
    pub tasks_path: PathBuf,
    pub dashboard_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            threads: 2,
            scheduler: SchedulerKind::RoundRobin,
            max_retries: 0,
            api_port: 8080,
            mode: Mode::Demo,
            max_request_size: 1024 * 1024,
            cors_origin: "*".to_string(),
            tasks_path: PathBuf::from("tasks.json"),
            dashboard_path: PathBuf::from("web/dashboard.html"),
        }
    }
}

/// Raw file shape; every key optional so partial files overlay cleanly and
/// unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    threads: Option<i64>,
    scheduler: Option<String>,
    max_retries: Option<i64>,
    api_port: Option<i64>,
    mode: Option<String>,
    max_request_size: Option<i64>,
    cors_origin: Option<String>,
    tasks_path: Option<PathBuf>,
    dashboard_path: Option<PathBuf>,
}

impl EngineConfig {
    /// Assemble the configuration with full precedence:
    /// defaults < file < environment < command line.
    pub fn load(args: &CliArgs) -> Self {
        let mut config = EngineConfig::default();
        config.apply_file(&args.config);
        config.apply_env();
        config.apply_args(args);
        config
    }

    pub fn apply_file(&mut self, path: &Path) {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(_) => {
                warn!("Config file not found: {}. Using defaults.", path.display());
                return;
            }
        };
        let file: FileConfig = match serde_yaml::from_str(&contents) {
            Ok(file) => file,
            Err(err) => {
                warn!("Failed to parse config file {}: {err}", path.display());
                return;
            }
        };

        if let Some(threads) = file.threads {
            self.set_threads(threads);
        }
        if let Some(scheduler) = file.scheduler {
            self.set_scheduler(&scheduler);
        }
        if let Some(retries) = file.max_retries {
            self.set_max_retries(retries);
        }
        if let Some(port) = file.api_port {
            self.set_api_port(port);
        }
        if let Some(mode) = file.mode {
            self.set_mode(&mode);
        }
        if let Some(size) = file.max_request_size {
            self.set_max_request_size(size);
        }
        if let Some(origin) = file.cors_origin {
            self.cors_origin = origin;
        }
        if let Some(tasks_path) = file.tasks_path {
            self.tasks_path = tasks_path;
        }
        if let Some(dashboard_path) = file.dashboard_path {
            self.dashboard_path = dashboard_path;
        }
    }

    pub fn apply_env(&mut self) {
        if let Some(value) = env_var("TASKWEAVE_THREADS") {
            match value.parse::<i64>() {
                Ok(threads) => self.set_threads(threads),
                Err(_) => warn!("Invalid TASKWEAVE_THREADS environment variable"),
            }
        }
        if let Some(value) = env_var("TASKWEAVE_API_PORT") {
            match value.parse::<i64>() {
                Ok(port) => self.set_api_port(port),
                Err(_) => warn!("Invalid TASKWEAVE_API_PORT environment variable"),
            }
        }
        if let Some(value) = env_var("TASKWEAVE_SCHEDULER") {
            self.set_scheduler(&value);
        }
        if let Some(value) = env_var("TASKWEAVE_MODE") {
            self.set_mode(&value);
        }
        if let Some(value) = env_var("TASKWEAVE_MAX_RETRIES") {
            match value.parse::<i64>() {
                Ok(retries) => self.set_max_retries(retries),
                Err(_) => warn!("Invalid TASKWEAVE_MAX_RETRIES environment variable"),
            }
        }
        if let Some(value) = env_var("TASKWEAVE_CORS_ORIGIN") {
            self.cors_origin = value;
        }
        if let Some(value) = env_var("TASKWEAVE_MAX_REQUEST_SIZE") {
            match value.parse::<i64>() {
                Ok(size) => self.set_max_request_size(size),
                Err(_) => warn!("Invalid TASKWEAVE_MAX_REQUEST_SIZE environment variable"),
            }
        }
    }

    pub fn apply_args(&mut self, args: &CliArgs) {
        if let Some(threads) = args.threads {
            self.set_threads(threads as i64);
        }
        if let Some(scheduler) = &args.scheduler {
            self.set_scheduler(scheduler);
        }
        if let Some(retries) = args.max_retries {
            self.set_max_retries(retries);
        }
        if let Some(port) = args.api_port {
            self.set_api_port(i64::from(port));
        }
        if let Some(mode) = &args.mode {
            self.set_mode(mode);
        }
        if let Some(size) = args.max_request_size {
            self.set_max_request_size(size);
        }
        if let Some(origin) = &args.cors_origin {
            self.cors_origin = origin.clone();
        }
        if let Some(tasks) = &args.tasks {
            self.tasks_path = tasks.clone();
        }
        if let Some(dashboard) = &args.dashboard {
            self.dashboard_path = dashboard.clone();
        }
    }

    fn set_threads(&mut self, value: i64) {
        if (MIN_THREADS as i64..=MAX_THREADS as i64).contains(&value) {
            self.threads = value as usize;
        } else {
            warn!("Invalid thread count: {value}. Using: {}", self.threads);
        }
    }

    fn set_scheduler(&mut self, value: &str) {
        match value.parse::<SchedulerKind>() {
            Ok(kind) => self.scheduler = kind,
            Err(_) => warn!("Invalid scheduler: {value}. Using: {}", self.scheduler),
        }
    }

    fn set_max_retries(&mut self, value: i64) {
        if (0..=100).contains(&value) {
            self.max_retries = value as u32;
        } else {
            warn!("Invalid max_retries: {value}. Using: {}", self.max_retries);
        }
    }

    fn set_api_port(&mut self, value: i64) {
        if (i64::from(MIN_PORT)..=i64::from(u16::MAX)).contains(&value) {
            self.api_port = value as u16;
        } else {
            warn!("Invalid port: {value}. Using: {}", self.api_port);
        }
    }

    fn set_mode(&mut self, value: &str) {
        match value.parse::<Mode>() {
            Ok(mode) => self.mode = mode,
            Err(_) => warn!("Invalid mode: {value}. Using: {}", self.mode),
        }
    }

    fn set_max_request_size(&mut self, value: i64) {
        if (1..=MAX_REQUEST_SIZE_CEILING as i64).contains(&value) {
            self.max_request_size = value as usize;
        } else {
            warn!(
                "Invalid max_request_size: {value}. Using: {}",
                self.max_request_size
            );
        }
    }

    /// Final sanity check; a failure here is fatal at startup.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            (MIN_THREADS..=MAX_THREADS).contains(&self.threads),
            "invalid thread count: {}",
            self.threads
        );
        anyhow::ensure!(self.api_port >= MIN_PORT, "invalid API port: {}", self.api_port);
        anyhow::ensure!(self.max_retries <= 100, "invalid max_retries: {}", self.max_retries);
        anyhow::ensure!(
            (1..=MAX_REQUEST_SIZE_CEILING).contains(&self.max_request_size),
            "invalid max_request_size: {}",
            self.max_request_size
        );
        anyhow::ensure!(!self.cors_origin.is_empty(), "empty cors_origin");
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}
