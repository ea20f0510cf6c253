//! HTTP interfaces
//!
//! - `common`: error body and validated JSON extractor
//! - `modules`: handlers grouped by resource
//! - `router`: router assembly with Swagger documentation

pub mod common;
pub mod modules;
pub mod router;

pub use router::{create_router, ApiDoc, AppState};
