pub mod backoff;
pub mod locks_client;
pub mod locks_config;
pub mod locks_observer;
pub mod room_context;
pub mod supabase_client;

pub use backoff::Backoff;
pub use locks_client::{ClientError, LocksClient};
pub use locks_config::ClientConfig;
pub use locks_observer::{ConnectionStatus, LockEvent, LockObserver, NoopObserver};
pub use room_context::RoomContext;
pub use supabase_client::SupabaseStorage;
