//! Parking garage domain
//!
//! Garages themselves are opaque store records; the only domain state is the
//! outcome of a cascading removal.

use serde::Serialize;

/// Result of removing a garage together with the spots that reference it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GarageDeletion {
    pub garage_id: String,
    /// Spots whose deletion the store confirmed, in store order.
    pub deleted_spot_ids: Vec<String>,
    pub spots_deleted_count: usize,
}

impl GarageDeletion {
    pub fn new(garage_id: impl Into<String>, deleted_spot_ids: Vec<String>) -> Self {
        Self {
            garage_id: garage_id.into(),
            spots_deleted_count: deleted_spot_ids.len(),
            deleted_spot_ids,
        }
    }
}
