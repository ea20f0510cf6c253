//! Allocation, booking and release handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

use super::dto::{
    BookSpotRequest, BookSpotResponse, FindSpotResponse, ReleaseAllResponse, StatusMessage,
};
use crate::application::matching::{AllocationService, BookingRequest, SpotMatch};
use crate::application::session::{MachineSummary, SharedConnectionRegistry};
use crate::application::BookingCoordinator;
use crate::interfaces::http::common::{ApiError, ErrorBody, ValidatedJson};

#[derive(Clone)]
pub struct ParkingState {
    pub allocation: Arc<AllocationService>,
    pub bookings: Arc<BookingCoordinator>,
    pub registry: SharedConnectionRegistry,
}

#[utoipa::path(
    post,
    path = "/find-spot",
    tag = "Parking",
    request_body = BookingRequest,
    responses(
        (status = 200, description = "Best matching spot, or a failure status when none is free", body = FindSpotResponse),
        (status = 400, description = "Malformed request body", body = ErrorBody),
        (status = 503, description = "Entity store unavailable", body = ErrorBody)
    )
)]
pub async fn find_spot(
    State(state): State<ParkingState>,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> Result<Json<FindSpotResponse>, ApiError> {
    let Json(request) = payload?;
    let response = match state.allocation.allocate(&request).await? {
        SpotMatch::Found(spot) => FindSpotResponse::Assigned(spot.into()),
        SpotMatch::NotFound => FindSpotResponse::unavailable(),
    };
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/book-spot",
    tag = "Parking",
    request_body = BookSpotRequest,
    responses(
        (status = 200, description = "Spot locked and dispatched to machines", body = BookSpotResponse),
        (status = 404, description = "Spot not found", body = ErrorBody),
        (status = 409, description = "Spot already taken", body = ErrorBody),
        (status = 422, description = "Validation error", body = ErrorBody),
        (status = 503, description = "Entity store unavailable", body = ErrorBody)
    )
)]
pub async fn book_spot(
    State(state): State<ParkingState>,
    ValidatedJson(body): ValidatedJson<BookSpotRequest>,
) -> Result<Json<BookSpotResponse>, ApiError> {
    let confirmation = state.bookings.confirm_booking(&body.spot_id).await?;
    Ok(Json(confirmation.into()))
}

#[utoipa::path(
    post,
    path = "/clear-spot/{spot_id}",
    tag = "Parking",
    params(("spot_id" = String, Path, description = "Spot entity id")),
    responses(
        (status = 200, description = "Spot is free again", body = StatusMessage),
        (status = 404, description = "Spot not found", body = ErrorBody),
        (status = 503, description = "Entity store unavailable", body = ErrorBody)
    )
)]
pub async fn clear_spot(
    State(state): State<ParkingState>,
    Path(spot_id): Path<String>,
) -> Result<Json<StatusMessage>, ApiError> {
    state.bookings.release_spot(&spot_id).await?;
    Ok(Json(StatusMessage::success(format!(
        "Spot {spot_id} is now free and available for new bookings."
    ))))
}

#[utoipa::path(
    post,
    path = "/clear-all-spots",
    tag = "Parking",
    responses(
        (status = 200, description = "Every occupied spot released", body = ReleaseAllResponse),
        (status = 409, description = "Store refused a release; earlier ones stay applied", body = ErrorBody),
        (status = 503, description = "Entity store unavailable", body = ErrorBody)
    )
)]
pub async fn clear_all_spots(
    State(state): State<ParkingState>,
) -> Result<Json<ReleaseAllResponse>, ApiError> {
    let summary = state.bookings.release_all_spots().await?;
    Ok(Json(summary.into()))
}

#[utoipa::path(
    get,
    path = "/machines",
    tag = "Machines",
    responses(
        (status = 200, description = "Machines connected to this instance", body = Vec<MachineSummary>)
    )
)]
pub async fn list_machines(State(state): State<ParkingState>) -> Json<Vec<MachineSummary>> {
    Json(state.registry.snapshot())
}
