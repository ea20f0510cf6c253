//! # Parking Dispatch
//!
//! Spot allocation and machine dispatch for smart indoor parking garages.
//!
//! ## Architecture
//!
//! - **domain**: spots, dispatch events and the entity store port
//! - **application**: spot matching, booking coordination, garage lifecycle
//!   and the machine connection registry
//! - **infrastructure**: NGSI-LD context broker client and an in-memory store
//! - **interfaces**: REST API and the machine WebSocket
//! - **server**: runtime wiring, tracing and graceful shutdown

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{default_config_path, AppConfig};
pub use server::{ServerHandle, ServerOptions};
