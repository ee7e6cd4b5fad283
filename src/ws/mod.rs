pub mod connctx;
pub mod lock_table;
pub mod registry;
pub mod room;
pub mod supervisor;

pub use connctx::{Outbound, OUTBOUND_CAPACITY};
pub use lock_table::{ClaimOutcome, LockEntry, LockTable};
pub use registry::{RegistryStats, RoomRegistry};
pub use room::{Room, RoomKey, RoomStats};
pub use supervisor::LivenessSupervisor;
