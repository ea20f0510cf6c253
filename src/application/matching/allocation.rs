//! Spot allocation use-case

use tracing::{debug, info, warn};

use crate::domain::ports::SharedEntityStore;
use crate::shared::errors::DispatchResult;

use super::spot_matcher::{find_best_spot, BookingRequest, SpotMatch};

/// Reads the current spot catalogue and picks the best candidate.
///
/// Allocation does not write: the chosen spot stays free until the driver
/// confirms it through the booking coordinator.
pub struct AllocationService {
    store: SharedEntityStore,
}

impl AllocationService {
    pub fn new(store: SharedEntityStore) -> Self {
        Self { store }
    }

    pub async fn allocate(&self, request: &BookingRequest) -> DispatchResult<SpotMatch> {
        let spots = match self.store.list_spots().await {
            Ok(spots) => spots,
            Err(e) => {
                warn!(error = %e, "Could not read spots for allocation");
                metrics::counter!("spot_allocations_total", "outcome" => "error").increment(1);
                return Err(e);
            }
        };
        debug!(candidates = spots.len(), ?request, "Matching spot request");

        let result = find_best_spot(&spots, request);
        match &result {
            SpotMatch::Found(spot) => {
                info!(spot_id = %spot.id, "Spot allocated");
                metrics::counter!("spot_allocations_total", "outcome" => "found").increment(1);
            }
            SpotMatch::NotFound => {
                info!(?request, "No suitable spot available");
                metrics::counter!("spot_allocations_total", "outcome" => "none").increment(1);
            }
        }
        Ok(result)
    }
}
