pub mod handler;
pub mod msg_claim_handler;
pub mod msg_heartbeat_handler;
pub mod msg_hello_handler;
pub mod msg_presence_handler;
pub mod msg_release_handler;

pub use handler::websocket_handler;
