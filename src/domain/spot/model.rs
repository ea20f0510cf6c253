//! Parking spot domain entity

use serde::{Deserialize, Serialize};

/// Occupancy of a spot as recorded in the entity store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpotStatus {
    Free,
    Occupied,
}

impl SpotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Occupied => "occupied",
        }
    }

    /// Parse the store's status value. Anything unexpected is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "free" => Some(Self::Free),
            "occupied" => Some(Self::Occupied),
            _ => None,
        }
    }
}

impl std::fmt::Display for SpotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reserved-use tag carried by a spot. Untagged spots are "general".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpotCategory {
    ElectricCharging,
    Disabled,
    Women,
}

impl SpotCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ElectricCharging => "forElectricCharging",
            Self::Disabled => "forDisabled",
            Self::Women => "forWomen",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "forElectricCharging" => Some(Self::ElectricCharging),
            "forDisabled" => Some(Self::Disabled),
            "forWomen" => Some(Self::Women),
            _ => None,
        }
    }
}

/// Planar position of a spot, `[x, y]` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coordinates(pub [f64; 2]);

impl Coordinates {
    pub const ORIGIN: Coordinates = Coordinates([0.0, 0.0]);

    pub fn new(x: f64, y: f64) -> Self {
        Self([x, y])
    }
}

/// A parking spot as read from the entity store.
///
/// `status` and `categories` are `None` when the store record lacked them or
/// carried something unreadable; such spots are never eligible for matching.
#[derive(Debug, Clone, PartialEq)]
pub struct Spot {
    pub id: String,
    pub status: Option<SpotStatus>,
    pub categories: Option<Vec<SpotCategory>>,
    pub coordinates: Option<Coordinates>,
    pub spot_number: Option<String>,
    pub garage_ref: Option<String>,
}

impl Spot {
    /// A free, general spot with no position. Mostly useful for building
    /// fixtures.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: Some(SpotStatus::Free),
            categories: Some(Vec::new()),
            coordinates: None,
            spot_number: None,
            garage_ref: None,
        }
    }

    pub fn with_status(mut self, status: SpotStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_categories(mut self, categories: &[SpotCategory]) -> Self {
        self.categories = Some(categories.to_vec());
        self
    }

    pub fn with_coordinates(mut self, x: f64, y: f64) -> Self {
        self.coordinates = Some(Coordinates::new(x, y));
        self
    }

    pub fn with_garage(mut self, garage_id: impl Into<String>) -> Self {
        self.garage_ref = Some(garage_id.into());
        self
    }

    pub fn is_free(&self) -> bool {
        self.status == Some(SpotStatus::Free)
    }

    /// `false` when categories are unreadable.
    pub fn has_category(&self, category: SpotCategory) -> bool {
        self.categories
            .as_ref()
            .is_some_and(|tags| tags.contains(&category))
    }

    /// Count of distinct special categories on the spot (0..=3), or `None`
    /// when categories are unreadable.
    pub fn weight(&self) -> Option<u8> {
        self.categories.as_ref()?;
        let weight = [
            SpotCategory::ElectricCharging,
            SpotCategory::Disabled,
            SpotCategory::Women,
        ]
        .iter()
        .filter(|c| self.has_category(**c))
        .count();
        Some(weight as u8)
    }

    /// Position to dispatch to; `[0, 0]` when the record had none.
    pub fn position(&self) -> Coordinates {
        self.coordinates.unwrap_or(Coordinates::ORIGIN)
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_counts_distinct_special_categories() {
        let general = Spot::new("A");
        assert_eq!(general.weight(), Some(0));

        let all = Spot::new("B").with_categories(&[
            SpotCategory::Women,
            SpotCategory::ElectricCharging,
            SpotCategory::Disabled,
            SpotCategory::Disabled,
        ]);
        assert_eq!(all.weight(), Some(3));
    }

    #[test]
    fn unreadable_categories_have_no_weight() {
        let mut spot = Spot::new("A");
        spot.categories = None;
        assert_eq!(spot.weight(), None);
        assert!(!spot.has_category(SpotCategory::ElectricCharging));
    }

    #[test]
    fn position_falls_back_to_origin() {
        assert_eq!(Spot::new("A").position(), Coordinates::new(0.0, 0.0));
        assert_eq!(
            Spot::new("A").with_coordinates(3.5, -1.0).position(),
            Coordinates::new(3.5, -1.0)
        );
    }

    #[test]
    fn status_parsing_rejects_unknown_values() {
        assert_eq!(SpotStatus::parse("free"), Some(SpotStatus::Free));
        assert_eq!(SpotStatus::parse("occupied"), Some(SpotStatus::Occupied));
        assert_eq!(SpotStatus::parse("closed"), None);
        assert_eq!(SpotStatus::Occupied.to_string(), "occupied");
    }

    #[test]
    fn coordinates_serialize_as_pair() {
        let json = serde_json::to_string(&Coordinates::new(1.0, 2.5)).unwrap();
        assert_eq!(json, "[1.0,2.5]");
    }
}
