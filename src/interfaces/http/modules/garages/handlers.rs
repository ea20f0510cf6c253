//! Garage registration and removal handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use super::dto::GarageDeletionResponse;
use crate::application::GarageLifecycleManager;
use crate::interfaces::http::common::{ApiError, ErrorBody};
use crate::interfaces::http::modules::parking::StatusMessage;

#[derive(Clone)]
pub struct GarageState {
    pub garages: Arc<GarageLifecycleManager>,
}

#[utoipa::path(
    post,
    path = "/parking-garage",
    tag = "Garages",
    request_body(content = Object, description = "NGSI-LD ParkingGarage entity, forwarded as is"),
    responses(
        (status = 201, description = "Garage registered", body = StatusMessage),
        (status = 400, description = "Malformed JSON", body = ErrorBody),
        (status = 409, description = "Garage already exists or was rejected", body = ErrorBody),
        (status = 422, description = "Entity lacks id or type", body = ErrorBody),
        (status = 503, description = "Entity store unavailable", body = ErrorBody)
    )
)]
pub async fn register_garage(
    State(state): State<GarageState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<StatusMessage>), ApiError> {
    let Json(entity) = payload?;
    state.garages.register_garage(entity).await?;
    Ok((
        StatusCode::CREATED,
        Json(StatusMessage::success("Parking Garage registered successfully.")),
    ))
}

/// Garage ids are URNs and may contain `/`, hence the wildcard segment.
#[utoipa::path(
    delete,
    path = "/delete-garage/{garage_id}",
    tag = "Garages",
    params(("garage_id" = String, Path, description = "Garage entity id")),
    responses(
        (status = 200, description = "Garage and its spots deleted", body = GarageDeletionResponse),
        (status = 404, description = "Garage not found", body = ErrorBody),
        (status = 502, description = "Spots deleted but the garage itself was not", body = ErrorBody),
        (status = 503, description = "Entity store unavailable", body = ErrorBody)
    )
)]
pub async fn delete_garage(
    State(state): State<GarageState>,
    Path(garage_id): Path<String>,
) -> Result<Json<GarageDeletionResponse>, ApiError> {
    let deletion = state.garages.delete_garage(&garage_id).await?;
    Ok(Json(deletion.into()))
}
