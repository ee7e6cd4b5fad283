use tracing::{info, warn};
use uuid::Uuid;
use crate::models::HelloMessage;
use crate::ws::Room;

/// Handle HelloMessage
pub async fn handle_hello_message(hello_msg: &HelloMessage, room: &Room, conn_id: Uuid) {
    info!("Hello from device {} on connection {} in room {}", hello_msg.device_token, conn_id, room.key());

    // The room path is authoritative; a mismatching session id is only reported.
    if let Some(session_id) = &hello_msg.session_id {
        if session_id != &room.key().session_id {
            warn!(
                "Hello on connection {} names session {} but joined room {}",
                conn_id, session_id, room.key()
            );
        }
    }

    if !room.hello(conn_id, &hello_msg.device_token).await {
        warn!("Could not send snapshot to connection {} in room {}", conn_id, room.key());
    }
}
