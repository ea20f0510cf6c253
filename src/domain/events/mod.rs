//! Domain events
//!
//! Facts pushed to retrieval machines. Delivery lives in
//! `application::session`.

pub mod dispatch;

pub use dispatch::{DispatchEvent, DispatchEventKind};
