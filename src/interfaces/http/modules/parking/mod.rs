//! Parking module: spot allocation, booking, release and machine listing

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
