//! Entity store adapters
//!
//! - `ngsi_client`: NGSI-LD context broker over HTTP
//! - `memory`: in-process store for development and tests
//! - `wire`: NGSI-LD attribute/entity encoding shared by both

pub mod memory;
pub mod ngsi_client;
pub mod wire;

pub use memory::InMemoryStore;
pub use ngsi_client::NgsiLdStoreClient;
