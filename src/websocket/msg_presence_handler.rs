use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;
use crate::models::PresenceMessage;
use crate::ws::Room;

/// Handle PresenceMessage. No reply; the ping only keeps the connection marked alive.
pub async fn handle_presence_message(_presence_msg: &PresenceMessage, room: &Room, conn_id: Uuid) {
    debug!("Presence from connection {} in room {}", conn_id, room.key());
    room.presence(conn_id, Instant::now()).await;
}
