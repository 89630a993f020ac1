//! Route configuration.

use std::sync::Arc;

use axum::routing::{get, post, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{get_fields, get_stats, health, index, post_query};
use crate::state::AppState;
use crate::websocket::ws_upgrade;

/// Creates the API router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/stats", get(get_stats))
        .route("/fields", get(get_fields))
        .route("/query", post(post_query))
        .route("/logs", get(ws_upgrade))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
