// libs/semantic-cache-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use shared_config::AppConfig;

use crate::handlers;

pub fn semantic_cache_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/lookup", post(handlers::lookup))
        .route("/store", post(handlers::store))
        .route("/cleanup", post(handlers::cleanup))
        .route("/stats", get(handlers::stats))
        .with_state(state)
}
