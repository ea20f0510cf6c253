//! NGSI-LD wire format
//!
//! Brokers return attributes either wrapped (`{"type":"Property","value":X}`,
//! `{"type":"Relationship","object":X}`) or bare, depending on the request
//! options and on how the entity was created. [`Attribute`] accepts all three
//! and [`Attribute::into_value`] is the single place that unwraps them.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::domain::spot::{Coordinates, Spot, SpotCategory, SpotStatus};

pub const STATUS_ATTR: &str = "status";
pub const CATEGORY_ATTR: &str = "category";
pub const LOCATION_ATTR: &str = "location";
pub const SPOT_NUMBER_ATTR: &str = "spotNumber";
pub const GARAGE_REF_ATTR: &str = "refParkingGarage";
pub const OCCUPANCY_MODIFIED_ATTR: &str = "occupancyModified";

/// An entity attribute in any of the shapes a broker may send.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Attribute<T> {
    Property { value: T },
    Relationship { object: T },
    Bare(T),
}

impl<T> Attribute<T> {
    pub fn into_value(self) -> T {
        match self {
            Self::Property { value } => value,
            Self::Relationship { object } => object,
            Self::Bare(value) => value,
        }
    }
}

/// Decode and unwrap one attribute; `None` when absent or unreadable.
pub fn attribute<T: DeserializeOwned>(entity: &Value, name: &str) -> Option<T> {
    let raw = entity.get(name)?.clone();
    serde_json::from_value::<Attribute<T>>(raw)
        .ok()
        .map(Attribute::into_value)
}

/// Brokers compact single-element arrays to a bare value.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(tag) => vec![tag],
            Self::Many(tags) => tags,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeoPoint {
    coordinates: Vec<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SpotLabel {
    Text(String),
    Number(serde_json::Number),
}

/// Build a [`Spot`] from a store entity. Only a missing `id` rejects the
/// record; every other field degrades to `None`.
pub fn parse_spot(entity: &Value) -> Option<Spot> {
    let Some(id) = entity.get("id").and_then(Value::as_str) else {
        warn!(entity = %entity, "Skipping spot entity without id");
        return None;
    };

    let status = attribute::<String>(entity, STATUS_ATTR).and_then(|s| SpotStatus::parse(&s));

    let categories = attribute::<OneOrMany>(entity, CATEGORY_ATTR).map(|tags| {
        tags.into_vec()
            .iter()
            .filter_map(|tag| SpotCategory::parse(tag))
            .collect::<Vec<_>>()
    });

    let coordinates = attribute::<GeoPoint>(entity, LOCATION_ATTR).and_then(|point| {
        match point.coordinates.as_slice() {
            [x, y, ..] => Some(Coordinates::new(*x, *y)),
            _ => None,
        }
    });

    let spot_number = attribute::<SpotLabel>(entity, SPOT_NUMBER_ATTR).map(|label| match label {
        SpotLabel::Text(text) => text,
        SpotLabel::Number(n) => n.to_string(),
    });

    Some(Spot {
        id: id.to_string(),
        status,
        categories,
        coordinates,
        spot_number,
        garage_ref: attribute::<String>(entity, GARAGE_REF_ATTR),
    })
}

/// Normalized NGSI-LD representation of a spot.
pub fn spot_entity(spot: &Spot, entity_type: &str) -> Value {
    let mut entity = Map::new();
    entity.insert("id".into(), json!(spot.id));
    entity.insert("type".into(), json!(entity_type));

    if let Some(status) = spot.status {
        entity.insert(STATUS_ATTR.into(), json!(Property::new(status.as_str())));
    }
    if let Some(categories) = &spot.categories {
        let tags: Vec<&str> = categories.iter().map(SpotCategory::as_str).collect();
        entity.insert(CATEGORY_ATTR.into(), json!(Property::new(tags)));
    }
    if let Some(Coordinates([x, y])) = spot.coordinates {
        entity.insert(
            LOCATION_ATTR.into(),
            json!({"type": "GeoProperty", "value": {"type": "Point", "coordinates": [x, y]}}),
        );
    }
    if let Some(number) = &spot.spot_number {
        entity.insert(SPOT_NUMBER_ATTR.into(), json!(Property::new(number)));
    }
    if let Some(garage) = &spot.garage_ref {
        entity.insert(
            GARAGE_REF_ATTR.into(),
            json!({"type": "Relationship", "object": garage}),
        );
    }

    Value::Object(entity)
}

#[derive(Debug, Serialize)]
pub struct Property<T> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: T,
}

impl<T> Property<T> {
    pub fn new(value: T) -> Self {
        Self {
            kind: "Property",
            value,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DateTimeValue {
    #[serde(rename = "@type")]
    kind: &'static str,
    #[serde(rename = "@value")]
    value: String,
}

/// Body of `PATCH /entities/{id}/attrs` for a status transition.
#[derive(Debug, Serialize)]
pub struct StatusPatch {
    status: Property<&'static str>,
    #[serde(rename = "occupancyModified")]
    occupancy_modified: Property<DateTimeValue>,
}

impl StatusPatch {
    pub fn new(status: SpotStatus, modified_at: DateTime<Utc>) -> Self {
        Self {
            status: Property::new(status.as_str()),
            occupancy_modified: Property::new(DateTimeValue {
                kind: "DateTime",
                value: modified_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            }),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────
