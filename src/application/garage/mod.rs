//! Garage lifecycle

pub mod lifecycle;

pub use lifecycle::GarageLifecycleManager;
