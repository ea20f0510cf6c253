//! Constraint matching over a snapshot of spots

use serde::Deserialize;
use utoipa::ToSchema;

use crate::domain::spot::{Spot, SpotCategory};

/// What a driver asked for. Absent flags mean "not required".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(default)]
pub struct BookingRequest {
    pub requires_disabled: bool,
    pub requires_female: bool,
    pub requires_ev: bool,
}

impl BookingRequest {
    /// A request with none of the reserved-category needs.
    pub fn is_generic(&self) -> bool {
        !self.requires_disabled && !self.requires_female
    }

    /// Whether `spot` may be handed to this requester. Spots with an
    /// unreadable status or category list never qualify.
    pub fn admits(&self, spot: &Spot) -> bool {
        if !spot.is_free() || spot.categories.is_none() {
            return false;
        }
        if self.requires_ev && !spot.has_category(SpotCategory::ElectricCharging) {
            return false;
        }
        if self.requires_disabled && !spot.has_category(SpotCategory::Disabled) {
            return false;
        }
        if self.requires_female && !spot.has_category(SpotCategory::Women) {
            return false;
        }
        if self.is_generic()
            && (spot.has_category(SpotCategory::Disabled) || spot.has_category(SpotCategory::Women))
        {
            return false;
        }
        true
    }
}

/// Outcome of a match. `NotFound` is an ordinary answer, not a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum SpotMatch {
    Found(Spot),
    NotFound,
}

/// Pick the least specialized spot that satisfies `request`.
///
/// Ties keep the spot that came first in `spots`.
pub fn find_best_spot(spots: &[Spot], request: &BookingRequest) -> SpotMatch {
    let mut best: Option<(&Spot, u8)> = None;

    for spot in spots.iter().filter(|spot| request.admits(spot)) {
        let Some(weight) = spot.weight() else {
            continue;
        };
        match best {
            Some((_, best_weight)) if best_weight <= weight => {}
            _ => best = Some((spot, weight)),
        }
    }

    match best {
        Some((spot, _)) => SpotMatch::Found(spot.clone()),
        None => SpotMatch::NotFound,
    }
}

// ── Tests ──────────────────────────────────────────────────────
