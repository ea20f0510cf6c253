//! Application layer: the allocation, booking and garage use-cases plus the
//! machine connection registry they dispatch through.

pub mod booking;
pub mod garage;
pub mod matching;
pub mod session;

pub use booking::{BookingConfirmation, BookingCoordinator, ReleaseSummary};
pub use garage::GarageLifecycleManager;
pub use matching::{find_best_spot, AllocationService, BookingRequest, SpotMatch};
pub use session::{ConnectionRegistry, MachineWatchdog, SharedConnectionRegistry};
