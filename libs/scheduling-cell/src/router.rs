// libs/scheduling-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use shared_config::AppConfig;

use crate::handlers;

pub fn scheduling_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/conflicts", get(handlers::scan_conflicts))
        .route("/slots", get(handlers::search_slots))
        .route("/alternatives/times", get(handlers::alternate_times))
        .route("/alternatives/therapists", get(handlers::alternate_therapists))
        .route("/workload", get(handlers::workload_report))
        .with_state(state)
}
