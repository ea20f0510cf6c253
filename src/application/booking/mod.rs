//! Booking confirmation and dispatch

pub mod coordinator;

pub use coordinator::{BookingConfirmation, BookingCoordinator, ReleaseSummary};
