use crate::state::AgentState;
use axum::Router;
use axum::routing::get;
use std::sync::{Arc, RwLock};

pub mod handlers;
pub mod responses;

pub fn router(state: Arc<RwLock<AgentState>>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::get_health))
        .route("/api/door", get(handlers::get_door))
        .route("/api/telemetry", get(handlers::get_telemetry))
        .with_state(state)
}
