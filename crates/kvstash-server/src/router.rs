//! Axum router wiring.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{app_state::AppState, kv, ops};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/set", post(kv::set))
        .route("/get/:key", get(kv::get))
        .route("/search", get(kv::search))
        .route("/healthCheck", get(ops::health_check))
        .route("/metrics", get(ops::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
