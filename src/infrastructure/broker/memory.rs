//! In-memory entity store for development and testing
//!
//! Holds raw NGSI-LD entities in insertion order and enforces the same
//! per-entity single-writer rule the dispatch flow relies on: occupying a spot
//! that is already occupied is refused.

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use super::wire::{self, Property};
use crate::domain::ports::EntityStoreClient;
use crate::domain::spot::{Spot, SpotStatus};
use crate::shared::errors::{DispatchError, DispatchResult};

pub struct InMemoryStore {
    spot_type: String,
    entities: RwLock<Vec<Value>>,
}

impl InMemoryStore {
    pub fn new(spot_type: impl Into<String>) -> Self {
        Self {
            spot_type: spot_type.into(),
            entities: RwLock::new(Vec::new()),
        }
    }

    /// Seed with raw entities (e.g. loaded from a JSON fixture file).
    pub fn with_entities(spot_type: impl Into<String>, entities: Vec<Value>) -> Self {
        Self {
            spot_type: spot_type.into(),
            entities: RwLock::new(entities),
        }
    }

    /// Seed with domain spots, stored in their normalized wire form.
    pub fn with_spots(spot_type: impl Into<String>, spots: &[Spot]) -> Self {
        let spot_type = spot_type.into();
        let entities = spots
            .iter()
            .map(|spot| wire::spot_entity(spot, &spot_type))
            .collect();
        Self::with_entities(spot_type, entities)
    }

    pub fn contains(&self, entity_id: &str) -> bool {
        self.read()
            .map(|entities| entities.iter().any(|e| entity_id_of(e) == Some(entity_id)))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.read().map(|entities| entities.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> DispatchResult<std::sync::RwLockReadGuard<'_, Vec<Value>>> {
        self.entities
            .read()
            .map_err(|_| DispatchError::UpstreamUnavailable("in-memory store poisoned".into()))
    }

    fn write(&self) -> DispatchResult<std::sync::RwLockWriteGuard<'_, Vec<Value>>> {
        self.entities
            .write()
            .map_err(|_| DispatchError::UpstreamUnavailable("in-memory store poisoned".into()))
    }

    fn spots(&self) -> DispatchResult<Vec<Spot>> {
        Ok(self
            .read()?
            .iter()
            .filter(|e| e.get("type").and_then(Value::as_str) == Some(self.spot_type.as_str()))
            .filter_map(wire::parse_spot)
            .collect())
    }
}

fn entity_id_of(entity: &Value) -> Option<&str> {
    entity.get("id").and_then(Value::as_str)
}

#[async_trait]
impl EntityStoreClient for InMemoryStore {
    async fn list_spots(&self) -> DispatchResult<Vec<Spot>> {
        self.spots()
    }

    async fn list_garage_spots(&self, garage_id: &str) -> DispatchResult<Vec<Spot>> {
        Ok(self
            .spots()?
            .into_iter()
            .filter(|spot| spot.garage_ref.as_deref() == Some(garage_id))
            .collect())
    }

    async fn get_spot(&self, spot_id: &str) -> DispatchResult<Spot> {
        self.read()?
            .iter()
            .find(|e| entity_id_of(e) == Some(spot_id))
            .and_then(wire::parse_spot)
            .ok_or_else(|| DispatchError::spot_not_found(spot_id))
    }

    async fn update_spot_status(
        &self,
        spot_id: &str,
        status: SpotStatus,
        modified_at: DateTime<Utc>,
    ) -> DispatchResult<()> {
        let mut entities = self.write()?;
        let entity = entities
            .iter_mut()
            .find(|e| entity_id_of(e) == Some(spot_id))
            .ok_or_else(|| DispatchError::spot_not_found(spot_id))?;

        let current = wire::attribute::<String>(entity, wire::STATUS_ATTR);
        if status == SpotStatus::Occupied && current.as_deref() == Some("occupied") {
            return Err(DispatchError::ConflictOrRejected {
                status: 409,
                detail: format!("spot {spot_id} is already occupied"),
            });
        }

        let patch = serde_json::to_value(wire::StatusPatch::new(status, modified_at))
            .map_err(|e| DispatchError::UpstreamUnavailable(e.to_string()))?;
        if let (Some(target), Value::Object(attrs)) = (entity.as_object_mut(), patch) {
            target.extend(attrs);
        }
        Ok(())
    }

    async fn create_entity(&self, entity: Value) -> DispatchResult<()> {
        let Some(id) = entity_id_of(&entity).map(str::to_string) else {
            return Err(DispatchError::ConflictOrRejected {
                status: 400,
                detail: "entity id is required".into(),
            });
        };

        let mut entities = self.write()?;
        if entities.iter().any(|e| entity_id_of(e) == Some(id.as_str())) {
            return Err(DispatchError::ConflictOrRejected {
                status: 409,
                detail: format!("entity {id} already exists"),
            });
        }
        entities.push(entity);
        Ok(())
    }

    async fn delete_entity(&self, entity_id: &str) -> DispatchResult<()> {
        let mut entities = self.write()?;
        let before = entities.len();
        entities.retain(|e| entity_id_of(e) != Some(entity_id));
        if entities.len() == before {
            return Err(DispatchError::NotFound {
                entity: "Entity",
                id: entity_id.to_string(),
            });
        }
        Ok(())
    }

    async fn ping(&self) -> DispatchResult<()> {
        self.read().map(|_| ())
    }
}

/// A garage entity in normalized form, handy for seeding.
pub fn garage_entity(garage_id: &str, name: &str) -> Value {
    json!({
        "id": garage_id,
        "type": "ParkingGarage",
        "name": Property::new(name),
    })
}

// ── Tests ──────────────────────────────────────────────────────
