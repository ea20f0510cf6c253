//! Machine session management

pub mod connection;
pub mod registry;
pub mod watchdog;

pub use connection::{ConnectionId, MachineConnection};
pub use registry::{ConnectionRegistry, MachineSummary, SharedConnectionRegistry};
pub use watchdog::MachineWatchdog;
