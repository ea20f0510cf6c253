//! Infrastructure layer - external concerns

pub mod broker;

pub use broker::{InMemoryStore, NgsiLdStoreClient};
