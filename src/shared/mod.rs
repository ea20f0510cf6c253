pub mod errors;
pub mod shutdown;

pub use errors::{DispatchError, DispatchResult};
pub use shutdown::{ShutdownCoordinator, ShutdownSignal};
