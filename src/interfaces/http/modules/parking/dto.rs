//! Parking DTOs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::application::booking::{BookingConfirmation, ReleaseSummary};
use crate::domain::spot::Spot;

/// `{status, message}` acknowledgement
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusMessage {
    pub status: String,
    pub message: String,
}

impl StatusMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: "failure".to_string(),
            message: message.into(),
        }
    }
}

/// Spot proposed to the driver
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SpotAssignment {
    pub status: String,
    pub assigned_spot_id: String,
    pub spot_number: Option<String>,
    /// `[x, y]`; `[0, 0]` when the spot has no recorded position
    #[schema(value_type = Vec<f64>)]
    pub coordinates: [f64; 2],
    pub message: String,
}

impl From<Spot> for SpotAssignment {
    fn from(spot: Spot) -> Self {
        Self {
            status: "success".to_string(),
            coordinates: spot.position().0,
            assigned_spot_id: spot.id,
            spot_number: spot.spot_number,
            message: "Spot reserved successfully.".to_string(),
        }
    }
}

/// Answer to `POST /find-spot`. Both shapes are sent with HTTP 200.
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum FindSpotResponse {
    Assigned(SpotAssignment),
    Unavailable(StatusMessage),
}

impl FindSpotResponse {
    pub fn unavailable() -> Self {
        Self::Unavailable(StatusMessage::failure("No suitable spots available."))
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BookSpotRequest {
    #[validate(length(min = 1, message = "spot_id must not be empty"))]
    pub spot_id: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BookSpotResponse {
    pub status: String,
    pub message: String,
    pub spot_id: String,
    #[schema(value_type = Vec<f64>)]
    pub coordinates: [f64; 2],
    /// Machines the dispatch event was handed to
    pub machines_notified: usize,
}

impl From<BookingConfirmation> for BookSpotResponse {
    fn from(confirmation: BookingConfirmation) -> Self {
        Self {
            status: "success".to_string(),
            message: format!(
                "Spot {} is now locked. Other users will not see it.",
                confirmation.spot_id
            ),
            spot_id: confirmation.spot_id,
            coordinates: confirmation.coordinates.0,
            machines_notified: confirmation.machines_notified,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReleaseAllResponse {
    pub status: String,
    pub message: String,
    pub total_spots: usize,
    /// Spots that were occupied and are now free
    pub released: usize,
}

impl From<ReleaseSummary> for ReleaseAllResponse {
    fn from(summary: ReleaseSummary) -> Self {
        Self {
            status: "success".to_string(),
            message: format!("{} Spots are now free.", summary.total_spots),
            total_spots: summary.total_spots,
            released: summary.released,
        }
    }
}
