use thiserror::Error;

/// Failures of the allocation and dispatch flows.
///
/// "No free spot" is deliberately absent: it is a normal outcome
/// ([`SpotMatch::NotFound`](crate::application::matching::SpotMatch)),
/// not an error.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Store unreachable, timed out, answered 5xx or sent an unreadable body.
    #[error("Entity store unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Not found: {entity} {id}")]
    NotFound { entity: &'static str, id: String },

    /// The store refused the write (e.g. the spot is already occupied).
    #[error("Rejected by entity store ({status}): {detail}")]
    ConflictOrRejected { status: u16, detail: String },

    /// Garage removal stopped half way; spot deletions are not rolled back.
    #[error("Garage {garage_id} only partially deleted ({} spots removed): {reason}", deleted_spot_ids.len())]
    PartialFailure {
        garage_id: String,
        deleted_spot_ids: Vec<String>,
        reason: String,
    },

    #[error("Validation: {0}")]
    Validation(String),
}

impl DispatchError {
    pub fn spot_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "ParkingSpot",
            id: id.into(),
        }
    }

    pub fn garage_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "ParkingGarage",
            id: id.into(),
        }
    }

    /// Whether retrying the same call may succeed. Retry policy belongs to
    /// the caller; nothing in this crate retries.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable(_))
    }

    /// Stable machine-readable label used in API responses and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
            Self::NotFound { .. } => "not_found",
            Self::ConflictOrRejected { .. } => "conflict_or_rejected",
            Self::PartialFailure { .. } => "partial_failure",
            Self::Validation(_) => "validation",
        }
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;
