use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;
use crate::models::ClaimMessage;
use crate::ws::{ClaimOutcome, Room};

/// Handle ClaimMessage
pub async fn handle_claim_message(claim_msg: &ClaimMessage, room: &Room, conn_id: Uuid) {
    match room.claim(conn_id, &claim_msg.char_id, Instant::now()).await {
        Some(ClaimOutcome::Acquired) => {
            info!("Connection {} claimed {} in room {}", conn_id, claim_msg.char_id, room.key());
        }
        Some(ClaimOutcome::AlreadyHeld) => {
            debug!("Connection {} re-claimed {} in room {}", conn_id, claim_msg.char_id, room.key());
        }
        Some(ClaimOutcome::Conflict) => {
            debug!("Connection {} lost claim on {} in room {}", conn_id, claim_msg.char_id, room.key());
        }
        None => {
            debug!("Dropping claim from connection {} before hello", conn_id);
        }
    }
}
