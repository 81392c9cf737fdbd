use std::sync::Arc;

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::StoreToken;

use crate::models::{AvailabilityQuery, GridQuery, NextSlotQuery};
use crate::services::availability::{AvailabilityResult, AvailabilityService};

fn invalid_query(rejection: QueryRejection) -> AppError {
    AppError::ValidationError(rejection.body_text())
}

fn invalid_path(rejection: PathRejection) -> AppError {
    AppError::ValidationError(rejection.body_text())
}

#[axum::debug_handler(state = Arc<AppConfig>)]
pub async fn get_availability(
    State(state): State<Arc<AppConfig>>,
    token: StoreToken,
    query: Result<Query<AvailabilityQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(query) = query.map_err(invalid_query)?;
    let availability_service = AvailabilityService::new(&state);
    let date = query.date.clone();

    let result = availability_service.get_availability(query, Utc::now(), token.as_str()).await?;

    let body = match result {
        AvailabilityResult::Doctor(slots) => json!({
            "data": date,
            "slots": slots,
            "total": slots.len()
        }),
        AvailabilityResult::AllDoctors(doctors) => json!({
            "data": date,
            "doctors": doctors,
            "total": doctors.len()
        }),
    };

    Ok(Json(body))
}

#[axum::debug_handler(state = Arc<AppConfig>)]
pub async fn find_next_slot(
    State(state): State<Arc<AppConfig>>,
    token: StoreToken,
    query: Result<Query<NextSlotQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(query) = query.map_err(invalid_query)?;
    let availability_service = AvailabilityService::new(&state);

    let found = availability_service.find_next_slot(query, Utc::now(), token.as_str()).await?;

    Ok(Json(json!({
        "found": found.is_some(),
        "slot": found
    })))
}

#[axum::debug_handler(state = Arc<AppConfig>)]
pub async fn next_free_slots(
    State(state): State<Arc<AppConfig>>,
    token: StoreToken,
    query: Result<Query<NextSlotQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(query) = query.map_err(invalid_query)?;
    let availability_service = AvailabilityService::new(&state);

    let slots = availability_service.next_free_slots(query, Utc::now(), token.as_str()).await?;

    Ok(Json(json!({
        "slots": slots,
        "total": slots.len()
    })))
}

#[axum::debug_handler(state = Arc<AppConfig>)]
pub async fn get_day_grid(
    State(state): State<Arc<AppConfig>>,
    token: StoreToken,
    doctor_id: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<GridQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Path(doctor_id) = doctor_id.map_err(invalid_path)?;
    let Query(query) = query.map_err(invalid_query)?;
    let availability_service = AvailabilityService::new(&state);
    let date = query.date.clone();

    let rows = availability_service.day_grid(doctor_id, query, token.as_str()).await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "data": date,
        "rows": rows
    })))
}
