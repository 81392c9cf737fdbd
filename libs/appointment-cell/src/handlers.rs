use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::StoreToken;

use crate::models::{ReserveMultipleRequest, ReserveRequest};
use crate::services::booking::BookingService;

fn invalid_body(rejection: JsonRejection) -> AppError {
    AppError::ValidationError(rejection.body_text())
}

#[axum::debug_handler(state = Arc<AppConfig>)]
pub async fn reserve(
    State(state): State<Arc<AppConfig>>,
    token: StoreToken,
    payload: Result<Json<ReserveRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(request) = payload.map_err(invalid_body)?;
    let booking_service = BookingService::new(&state);

    let reserved = booking_service.reserve(request, token.as_str()).await?;

    Ok((StatusCode::CREATED, Json(json!(reserved))))
}

#[axum::debug_handler(state = Arc<AppConfig>)]
pub async fn reserve_multiple(
    State(state): State<Arc<AppConfig>>,
    token: StoreToken,
    payload: Result<Json<ReserveMultipleRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(request) = payload.map_err(invalid_body)?;
    let booking_service = BookingService::new(&state);

    let reserved = booking_service.reserve_multiple(request, token.as_str()).await?;

    Ok((StatusCode::CREATED, Json(json!({
        "appointments": reserved,
        "total": reserved.len()
    }))))
}
