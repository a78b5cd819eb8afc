//! HTTP control plane and configuration layer for the TaskWeave engine.

pub mod config;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::{CliArgs, EngineConfig, Mode};
pub use routes::router;
pub use state::AppState;
