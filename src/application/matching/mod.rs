//! Spot matching and allocation

pub mod allocation;
pub mod spot_matcher;

pub use allocation::AllocationService;
pub use spot_matcher::{find_best_spot, BookingRequest, SpotMatch};
