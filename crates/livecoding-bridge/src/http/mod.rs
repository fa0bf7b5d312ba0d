//! HTTP trigger and status routes.
//!
//! Handlers hold no state of their own; every read and write goes through the
//! coordinator's locked operations.

mod handlers;
pub mod payload;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use livecoding_core::{BuildExecutor, CompileCoordinator, ServerConfig};
use tower_http::trace::TraceLayer;

pub use handlers::{status, trigger};
pub use payload::{CompilePayload, LogLinePayload, ResponseStatus};

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    pub coordinator: CompileCoordinator,
    pub executor: Arc<BuildExecutor>,
    /// Trigger route, echoed in every response body
    pub route: String,
}

impl AppState {
    #[must_use]
    pub fn new(coordinator: CompileCoordinator, executor: Arc<BuildExecutor>, route: &str) -> Self {
        Self {
            coordinator,
            executor,
            route: route.to_string(),
        }
    }
}

/// Router with the trigger and status routes bound per `server`
pub fn router(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .route(&server.route, post(trigger))
        .route(&server.status_route(), get(status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
