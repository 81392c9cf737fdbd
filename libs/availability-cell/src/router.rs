use std::sync::Arc;

use axum::{routing::get, Router};

use shared_config::AppConfig;

use crate::handlers;

pub fn availability_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::get_availability))
        .route("/next", get(handlers::find_next_slot))
        .route("/next-slots", get(handlers::next_free_slots))
        .route("/doctors/{doctor_id}/grid", get(handlers::get_day_grid))
        .with_state(state)
}
