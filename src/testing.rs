//! Failure-injecting entity store for unit tests

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::ports::EntityStoreClient;
use crate::domain::spot::{Spot, SpotStatus};
use crate::infrastructure::broker::InMemoryStore;
use crate::shared::errors::{DispatchError, DispatchResult};

pub const SPOT_TYPE: &str = "SmartIndoorParkingSpot";

/// Wraps an [`InMemoryStore`] and fails selected calls.
pub struct FailingStore {
    inner: InMemoryStore,
    /// Every call fails as if the broker were down.
    fail_all: AtomicBool,
    /// Status updates for these ids are refused with 409 (single-shot).
    reject_update: Mutex<HashSet<String>>,
    /// Deletes of these ids fail with a 500.
    fail_delete: Mutex<HashSet<String>>,
    pub updates: AtomicUsize,
    deletes_in_flight: AtomicUsize,
    /// Most deletes ever running at the same time.
    pub peak_deletes: AtomicUsize,
}

impl FailingStore {
    pub fn new(spots: &[Spot]) -> Self {
        Self::wrap(InMemoryStore::with_spots(SPOT_TYPE, spots))
    }

    pub fn wrap(inner: InMemoryStore) -> Self {
        Self {
            inner,
            fail_all: AtomicBool::new(false),
            reject_update: Mutex::new(HashSet::new()),
            fail_delete: Mutex::new(HashSet::new()),
            updates: AtomicUsize::new(0),
            deletes_in_flight: AtomicUsize::new(0),
            peak_deletes: AtomicUsize::new(0),
        }
    }

    pub fn unreachable() -> Self {
        let store = Self::new(&[]);
        store.fail_all();
        store
    }

    pub fn fail_all(&self) {
        self.fail_all.store(true, Ordering::SeqCst);
    }

    pub fn reject_update(&self, id: &str) {
        self.reject_update.lock().unwrap().insert(id.to_string());
    }

    pub fn fail_delete(&self, id: &str) {
        self.fail_delete.lock().unwrap().insert(id.to_string());
    }

    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    fn check(&self) -> DispatchResult<()> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(DispatchError::UpstreamUnavailable(
                "Injected failure: connection refused".into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl EntityStoreClient for FailingStore {
    async fn list_spots(&self) -> DispatchResult<Vec<Spot>> {
        self.check()?;
        self.inner.list_spots().await
    }

    async fn list_garage_spots(&self, garage_id: &str) -> DispatchResult<Vec<Spot>> {
        self.check()?;
        self.inner.list_garage_spots(garage_id).await
    }

    async fn get_spot(&self, spot_id: &str) -> DispatchResult<Spot> {
        self.check()?;
        self.inner.get_spot(spot_id).await
    }

    async fn update_spot_status(
        &self,
        spot_id: &str,
        status: SpotStatus,
        modified_at: DateTime<Utc>,
    ) -> DispatchResult<()> {
        self.check()?;
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.reject_update.lock().unwrap().remove(spot_id) {
            return Err(DispatchError::ConflictOrRejected {
                status: 409,
                detail: format!("Injected rejection for {spot_id}"),
            });
        }
        self.inner
            .update_spot_status(spot_id, status, modified_at)
            .await
    }

    async fn create_entity(&self, entity: Value) -> DispatchResult<()> {
        self.check()?;
        self.inner.create_entity(entity).await
    }

    async fn delete_entity(&self, entity_id: &str) -> DispatchResult<()> {
        self.check()?;
        let running = self.deletes_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_deletes.fetch_max(running, Ordering::SeqCst);
        // Let sibling deletes start so overlap is observable.
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        self.deletes_in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_delete.lock().unwrap().contains(entity_id) {
            return Err(DispatchError::UpstreamUnavailable(format!(
                "Injected delete failure: {entity_id}"
            )));
        }
        self.inner.delete_entity(entity_id).await
    }

    async fn ping(&self) -> DispatchResult<()> {
        self.check()?;
        self.inner.ping().await
    }
}
