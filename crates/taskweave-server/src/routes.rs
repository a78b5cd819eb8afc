use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::handlers;
use crate::state::AppState;

/// Assemble the control-plane router. Every response, including errors and
/// preflights, carries the configured CORS headers.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origin);

    Router::new()
        .route("/", get(handlers::dashboard))
        .route("/dashboard", get(handlers::dashboard))
        .route("/dashboard.html", get(handlers::dashboard))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics_overview))
        .route("/api/metrics", get(handlers::metrics_overview))
        .route("/tasks", get(handlers::list_tasks).post(handlers::submit_task))
        .route("/tasks/:id", get(handlers::get_task))
        .fallback(handlers::not_found)
        // The submit handler enforces the configured limit itself so the
        // rejection keeps the JSON error shape.
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if origin == "*" {
        return cors.allow_origin(Any);
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => cors.allow_origin(value),
        Err(_) => {
            warn!("Invalid cors_origin {origin:?}, falling back to *");
            cors.allow_origin(Any)
        }
    }
}
