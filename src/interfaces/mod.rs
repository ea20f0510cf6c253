//! Inbound adapters: the REST API and the machine WebSocket

pub mod http;
pub mod ws;
