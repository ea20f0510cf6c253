//! Outbound port to the digital-twin entity store
//!
//! The store is the single source of truth for spot status. Implementations
//! are pure I/O adapters: they translate transport outcomes into
//! [`DispatchError`] and never make allocation decisions.
//!
//! Status mapping every implementation follows:
//!
//! | store outcome                         | result                      |
//! |---------------------------------------|-----------------------------|
//! | success                               | `Ok`                        |
//! | unknown entity                        | `NotFound`                  |
//! | any other refusal (4xx)               | `ConflictOrRejected`        |
//! | unreachable, timeout, 5xx, bad body   | `UpstreamUnavailable`       |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::spot::{Spot, SpotStatus};
use crate::shared::errors::DispatchResult;

#[async_trait]
pub trait EntityStoreClient: Send + Sync {
    /// Every spot entity, in store iteration order.
    async fn list_spots(&self) -> DispatchResult<Vec<Spot>>;

    /// Spots whose `refParkingGarage` points at `garage_id`.
    async fn list_garage_spots(&self, garage_id: &str) -> DispatchResult<Vec<Spot>>;

    async fn get_spot(&self, spot_id: &str) -> DispatchResult<Spot>;

    /// Partial update of `status` and `occupancyModified` on exactly one
    /// spot. A store that refuses the transition (e.g. spot already
    /// occupied) answers `ConflictOrRejected`.
    async fn update_spot_status(
        &self,
        spot_id: &str,
        status: SpotStatus,
        modified_at: DateTime<Utc>,
    ) -> DispatchResult<()>;

    /// Create an entity from its full store representation.
    async fn create_entity(&self, entity: Value) -> DispatchResult<()>;

    async fn delete_entity(&self, entity_id: &str) -> DispatchResult<()>;

    /// Cheap reachability probe used by the health endpoint.
    async fn ping(&self) -> DispatchResult<()>;
}

pub type SharedEntityStore = Arc<dyn EntityStoreClient>;
