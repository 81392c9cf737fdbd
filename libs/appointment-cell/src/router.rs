use std::sync::Arc;

use axum::{routing::post, Router};

use shared_config::AppConfig;

use crate::handlers;

pub fn reservation_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(handlers::reserve))
        .route("/batch", post(handlers::reserve_multiple))
        .with_state(state)
}
