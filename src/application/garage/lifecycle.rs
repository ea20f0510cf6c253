//! Garage registration and cascading removal

use futures_util::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{info, warn};

use crate::domain::garage::GarageDeletion;
use crate::domain::ports::SharedEntityStore;
use crate::shared::errors::{DispatchError, DispatchResult};

/// Spot DELETEs in flight against the store for one garage removal
pub const SPOT_DELETE_CONCURRENCY: usize = 8;

pub struct GarageLifecycleManager {
    store: SharedEntityStore,
}

impl GarageLifecycleManager {
    pub fn new(store: SharedEntityStore) -> Self {
        Self { store }
    }

    /// Create a garage entity as given. The body must at least name its
    /// `id` and `type`; everything else is passed through untouched.
    pub async fn register_garage(&self, entity: Value) -> DispatchResult<String> {
        let garage_id = validate_entity(&entity)?;
        self.store.create_entity(entity).await?;
        info!(garage_id = %garage_id, "Parking garage registered");
        Ok(garage_id)
    }

    /// Remove a garage and every spot that references it.
    ///
    /// Spots the store refuses to delete are skipped and left out of the
    /// result. Spot deletions are not rolled back when the garage itself
    /// cannot be removed.
    pub async fn delete_garage(&self, garage_id: &str) -> DispatchResult<GarageDeletion> {
        if garage_id.trim().is_empty() {
            return Err(DispatchError::Validation("garage id must not be empty".into()));
        }

        let spots = self.store.list_garage_spots(garage_id).await?;
        info!(garage_id, spots = spots.len(), "Deleting garage");

        // `buffered` yields in input order, so reported ids keep store order.
        let deletions: Vec<_> = spots.iter().map(|spot| async move {
            match self.store.delete_entity(&spot.id).await {
                Ok(()) => Some(spot.id.clone()),
                Err(e) => {
                    warn!(garage_id, spot_id = %spot.id, error = %e, "Spot deletion failed, skipping");
                    None
                }
            }
        }).collect();
        let outcomes: Vec<Option<String>> = stream::iter(deletions)
        .buffered(SPOT_DELETE_CONCURRENCY)
        .collect()
        .await;
        let deleted: Vec<String> = outcomes.into_iter().flatten().collect();

        if let Err(e) = self.store.delete_entity(garage_id).await {
            if deleted.is_empty() {
                return Err(match e {
                    DispatchError::NotFound { .. } => DispatchError::garage_not_found(garage_id),
                    other => other,
                });
            }
            warn!(garage_id, deleted = deleted.len(), error = %e, "Garage deletion failed after spot cleanup");
            return Err(DispatchError::PartialFailure {
                garage_id: garage_id.to_string(),
                deleted_spot_ids: deleted,
                reason: e.to_string(),
            });
        }

        info!(garage_id, spots_deleted = deleted.len(), "Garage deleted");
        Ok(GarageDeletion::new(garage_id, deleted))
    }
}

fn validate_entity(entity: &Value) -> DispatchResult<String> {
    let Some(object) = entity.as_object() else {
        return Err(DispatchError::Validation("garage entity must be a JSON object".into()));
    };
    let id = object
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| DispatchError::Validation("garage entity requires an \"id\"".into()))?;
    if object.get("type").and_then(Value::as_str).is_none() {
        return Err(DispatchError::Validation("garage entity requires a \"type\"".into()));
    }
    Ok(id.to_string())
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::domain::ports::EntityStoreClient;
    use crate::domain::spot::Spot;
    use crate::infrastructure::broker::memory::garage_entity;
    use crate::testing::FailingStore;

    async fn garage_with_spots() -> Arc<FailingStore> {
        let store = Arc::new(FailingStore::new(&[
            Spot::new("S1").with_garage("G1"),
            Spot::new("S2").with_garage("G1"),
            Spot::new("S3").with_garage("G2"),
        ]));
        store.create_entity(garage_entity("G1", "North")).await.unwrap();
        store
    }

    #[tokio::test]
    async fn failed_spot_deletion_is_skipped_not_fatal() {
        let store = garage_with_spots().await;
        store.fail_delete("S2");
        let manager = GarageLifecycleManager::new(store.clone());

        let deletion = manager.delete_garage("G1").await.unwrap();
        assert_eq!(deletion.deleted_spot_ids, vec!["S1"]);
        assert_eq!(deletion.spots_deleted_count, 1);
        assert!(!store.inner().contains("G1"));
        assert!(store.inner().contains("S2"));
        assert!(store.inner().contains("S3"));
    }

    #[tokio::test]
    async fn deletes_garage_and_all_its_spots_in_order() {
        let store = garage_with_spots().await;
        let manager = GarageLifecycleManager::new(store.clone());

        let deletion = manager.delete_garage("G1").await.unwrap();
        assert_eq!(deletion, GarageDeletion::new("G1", vec!["S1".into(), "S2".into()]));
        assert_eq!(store.inner().len(), 1);
    }

    #[tokio::test]
    async fn garage_failure_after_spot_cleanup_is_partial() {
        let store = garage_with_spots().await;
        store.fail_delete("G1");
        let manager = GarageLifecycleManager::new(store.clone());

        match manager.delete_garage("G1").await {
            Err(DispatchError::PartialFailure {
                garage_id,
                deleted_spot_ids,
                ..
            }) => {
                assert_eq!(garage_id, "G1");
                assert_eq!(deleted_spot_ids, vec!["S1", "S2"]);
            }
            other => panic!("expected partial failure, got {other:?}"),
        }
        assert!(!store.inner().contains("S1"));
    }

    #[tokio::test]
    async fn unknown_garage_without_spots_is_not_found() {
        let store = garage_with_spots().await;
        let manager = GarageLifecycleManager::new(store);
        match manager.delete_garage("G9").await {
            Err(DispatchError::NotFound { entity, id }) => {
                assert_eq!(entity, "ParkingGarage");
                assert_eq!(id, "G9");
            }
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn large_garage_deletes_in_bounded_batches_and_keeps_order() {
        let spots: Vec<Spot> = (0..30)
            .map(|i| Spot::new(format!("S{i:02}")).with_garage("G5"))
            .collect();
        let store = Arc::new(FailingStore::new(&spots));
        store.create_entity(garage_entity("G5", "Big")).await.unwrap();
        store.fail_delete("S07");
        let manager = GarageLifecycleManager::new(store.clone());

        let deletion = manager.delete_garage("G5").await.unwrap();

        let expected: Vec<String> = (0..30)
            .filter(|i| *i != 7)
            .map(|i| format!("S{i:02}"))
            .collect();
        assert_eq!(deletion.deleted_spot_ids, expected);
        let peak = store.peak_deletes.load(std::sync::atomic::Ordering::SeqCst);
        assert!(peak > 1, "deletes should overlap, peak was {peak}");
        assert!(peak <= SPOT_DELETE_CONCURRENCY, "peak {peak} exceeds the cap");
    }

    #[tokio::test]
    async fn unreachable_store_aborts_before_any_delete() {
        let manager = GarageLifecycleManager::new(Arc::new(FailingStore::unreachable()));
        assert!(matches!(
            manager.delete_garage("G1").await,
            Err(DispatchError::UpstreamUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn register_passes_entity_through() {
        let store = Arc::new(FailingStore::new(&[]));
        let manager = GarageLifecycleManager::new(store.clone());

        let id = manager
            .register_garage(json!({
                "id": "urn:ngsi-ld:ParkingGarage:G7",
                "type": "ParkingGarage",
                "name": {"type": "Property", "value": "Harbour"}
            }))
            .await
            .unwrap();
        assert_eq!(id, "urn:ngsi-ld:ParkingGarage:G7");
        assert!(store.inner().contains("urn:ngsi-ld:ParkingGarage:G7"));

        let err = manager
            .register_garage(garage_entity("urn:ngsi-ld:ParkingGarage:G7", "Again"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::ConflictOrRejected { status: 409, .. }));
    }

    #[tokio::test]
    async fn register_requires_id_and_type() {
        let manager = GarageLifecycleManager::new(Arc::new(FailingStore::new(&[])));
        for body in [
            json!([1, 2]),
            json!({"type": "ParkingGarage"}),
            json!({"id": "", "type": "ParkingGarage"}),
            json!({"id": "G1"}),
        ] {
            assert!(
                matches!(manager.register_garage(body.clone()).await, Err(DispatchError::Validation(_))),
                "{body}"
            );
        }
    }
}
