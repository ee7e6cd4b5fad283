use tracing::{debug, info};
use uuid::Uuid;
use crate::models::ReleaseMessage;
use crate::ws::Room;

/// Handle ReleaseMessage
pub async fn handle_release_message(release_msg: &ReleaseMessage, room: &Room, conn_id: Uuid) {
    if room.release(conn_id, &release_msg.char_id).await {
        info!("Connection {} released {} in room {}", conn_id, release_msg.char_id, room.key());
    } else {
        debug!("Ignoring release of {} from connection {}", release_msg.char_id, conn_id);
    }
}
