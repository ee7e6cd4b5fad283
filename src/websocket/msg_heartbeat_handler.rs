use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;
use crate::models::HeartbeatMessage;
use crate::ws::Room;

/// Handle HeartbeatMessage
pub async fn handle_heartbeat_message(heartbeat_msg: &HeartbeatMessage, room: &Room, conn_id: Uuid) {
    if !room.heartbeat(conn_id, &heartbeat_msg.char_id, Instant::now()).await {
        debug!("Ignoring heartbeat for {} from non-holder {}", heartbeat_msg.char_id, conn_id);
    }
}
