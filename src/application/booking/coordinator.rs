//! Booking confirmation and release
//!
//! Exclusivity lives in the entity store: a spot is only dispatched once the
//! store has accepted its `occupied` write. Nothing here holds a lock across
//! requests, so several service instances can share one broker safely.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::application::session::SharedConnectionRegistry;
use crate::domain::events::DispatchEvent;
use crate::domain::ports::SharedEntityStore;
use crate::domain::spot::{Coordinates, SpotStatus};
use crate::shared::errors::{DispatchError, DispatchResult};

/// A booking the store accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingConfirmation {
    pub spot_id: String,
    pub coordinates: Coordinates,
    /// Machines the dispatch event was handed to
    pub machines_notified: usize,
}

/// Result of freeing every occupied spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReleaseSummary {
    pub total_spots: usize,
    pub released: usize,
}

pub struct BookingCoordinator {
    store: SharedEntityStore,
    registry: SharedConnectionRegistry,
}

impl BookingCoordinator {
    pub fn new(store: SharedEntityStore, registry: SharedConnectionRegistry) -> Self {
        Self { store, registry }
    }

    /// Lock `spot_id` in the store, then dispatch it to every connected
    /// machine.
    pub async fn confirm_booking(&self, spot_id: &str) -> DispatchResult<BookingConfirmation> {
        let result = self.occupy(spot_id).await;
        metrics::counter!("bookings_total", "outcome" => booking_outcome(&result)).increment(1);

        let coordinates = result?;
        let event = DispatchEvent::new_booking(spot_id, coordinates);
        let machines_notified = self.registry.broadcast(&event);

        info!(spot_id, machines_notified, "Booking confirmed");
        Ok(BookingConfirmation {
            spot_id: spot_id.to_string(),
            coordinates,
            machines_notified,
        })
    }

    /// Re-read, then write. Returns the spot's position once the store has
    /// accepted the write.
    async fn occupy(&self, spot_id: &str) -> DispatchResult<Coordinates> {
        if spot_id.trim().is_empty() {
            return Err(DispatchError::Validation("spot_id must not be empty".into()));
        }

        // The allocation snapshot may be stale by now.
        let spot = self.store.get_spot(spot_id).await.map_err(|e| {
            warn!(spot_id, error = %e, "Could not re-read spot before booking");
            e
        })?;

        if spot.status == Some(SpotStatus::Occupied) {
            warn!(spot_id, "Spot already occupied");
            return Err(DispatchError::ConflictOrRejected {
                status: 409,
                detail: format!("spot {spot_id} is already occupied"),
            });
        }

        self.store
            .update_spot_status(spot_id, SpotStatus::Occupied, Utc::now())
            .await
            .map_err(|e| {
                warn!(spot_id, error = %e, "Store refused booking");
                e
            })?;

        Ok(spot.position())
    }

    /// Mark one spot free again. No machine is notified.
    pub async fn release_spot(&self, spot_id: &str) -> DispatchResult<()> {
        if spot_id.trim().is_empty() {
            return Err(DispatchError::Validation("spot_id must not be empty".into()));
        }
        self.store
            .update_spot_status(spot_id, SpotStatus::Free, Utc::now())
            .await?;
        info!(spot_id, "Spot released");
        Ok(())
    }

    /// Free every spot that is not already free. Stops at the first spot the
    /// store refuses; spots released before that stay released.
    pub async fn release_all_spots(&self) -> DispatchResult<ReleaseSummary> {
        let spots = self.store.list_spots().await?;
        let mut released = 0;

        for spot in spots.iter().filter(|spot| !spot.is_free()) {
            self.store
                .update_spot_status(&spot.id, SpotStatus::Free, Utc::now())
                .await
                .map_err(|e| {
                    warn!(spot_id = %spot.id, released, error = %e, "Bulk release aborted");
                    e
                })?;
            released += 1;
        }

        info!(total_spots = spots.len(), released, "All spots released");
        Ok(ReleaseSummary {
            total_spots: spots.len(),
            released,
        })
    }
}

fn booking_outcome<T>(result: &DispatchResult<T>) -> &'static str {
    match result {
        Ok(_) => "confirmed",
        Err(DispatchError::ConflictOrRejected { .. }) => "conflict",
        Err(DispatchError::NotFound { .. }) => "not_found",
        Err(DispatchError::Validation(_)) => "invalid",
        Err(_) => "upstream",
    }
}

// ── Tests ──────────────────────────────────────────────────────
