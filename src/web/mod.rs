//! HTTP surface: one prompt endpoint plus a health check.

mod handlers;

pub use handlers::{handle_user_prompt, health_handler, PromptRequest};

use crate::components::assistant::Assistant;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    /// Prompt interpretation and calendar execution
    pub assistant: Arc<Assistant>,
}

/// Build the router with tracing and permissive CORS
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/handle-user-prompt", post(handle_user_prompt))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
