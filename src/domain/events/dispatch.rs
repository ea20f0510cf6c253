//! Dispatch events sent to retrieval machines

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::spot::Coordinates;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchEventKind {
    #[serde(rename = "NEW_BOOKING")]
    NewBooking,
}

/// Payload broadcast to every connected machine once a booking is confirmed
/// by the entity store.
///
/// Wire shape: `{"event":"NEW_BOOKING","spot_id":"…","coordinates":[x,y],"timestamp":"…"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchEvent {
    pub event: DispatchEventKind,
    pub spot_id: String,
    pub coordinates: Coordinates,
    pub timestamp: DateTime<Utc>,
}

impl DispatchEvent {
    pub fn new_booking(spot_id: impl Into<String>, coordinates: Coordinates) -> Self {
        Self {
            event: DispatchEventKind::NewBooking,
            spot_id: spot_id.into(),
            coordinates,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_booking_wire_shape() {
        let event = DispatchEvent::new_booking("urn:ngsi-ld:ParkingSpot:A", Coordinates::new(4.0, 7.5));
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["event"], "NEW_BOOKING");
        assert_eq!(value["spot_id"], "urn:ngsi-ld:ParkingSpot:A");
        assert_eq!(value["coordinates"], serde_json::json!([4.0, 7.5]));

        let ts = value["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(ts).is_ok(), "timestamp {ts} is not RFC 3339");
    }
}
