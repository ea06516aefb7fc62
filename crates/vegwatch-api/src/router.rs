use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

/// Create the API router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/analyze", post(handlers::handle_analyze))
        .route("/api/thumbnails/{id}", get(handlers::get_thumbnail))
        .with_state(state)
}
