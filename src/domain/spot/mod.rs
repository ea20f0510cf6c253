//! Parking spot domain

pub mod model;

pub use model::{Coordinates, Spot, SpotCategory, SpotStatus};
