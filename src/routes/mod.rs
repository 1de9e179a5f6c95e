pub mod health;
pub mod workbench;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::session::Workbench;

/// Assembles the API router around a session.
pub fn router(workbench: Workbench) -> Router {
    Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/state", get(workbench::state))
        .route("/api/form", put(workbench::update_form))
        .route("/api/dispatch", post(workbench::dispatch))
        .route("/api/history/back", post(workbench::history_back))
        .route("/api/history/forward", post(workbench::history_forward))
        .route("/api/save", post(workbench::save))
        .with_state(workbench)
}
