//! WebSocket interfaces
//!
//! - `machines`: dispatch channel to retrieval machines

pub mod machines;

pub use machines::{machine_socket_handler, MachineParams, MachineSocketState};
