//! Garage DTOs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::garage::GarageDeletion;

/// Answer to `DELETE /delete-garage/{garage_id}`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GarageDeletionResponse {
    pub message: String,
    pub garage_id: String,
    /// Spots whose deletion the store confirmed
    pub deleted_spots: Vec<String>,
    pub spots_deleted_count: usize,
}

impl From<GarageDeletion> for GarageDeletionResponse {
    fn from(deletion: GarageDeletion) -> Self {
        Self {
            message: "Garage and related spots deleted successfully".to_string(),
            garage_id: deletion.garage_id,
            deleted_spots: deletion.deleted_spot_ids,
            spots_deleted_count: deletion.spots_deleted_count,
        }
    }
}
