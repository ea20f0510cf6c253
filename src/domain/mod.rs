pub mod events;
pub mod garage;
pub mod ports;
pub mod spot;

pub use events::{DispatchEvent, DispatchEventKind};
pub use garage::GarageDeletion;
pub use ports::{EntityStoreClient, SharedEntityStore};
pub use spot::{Coordinates, Spot, SpotCategory, SpotStatus};
