use std::sync::Arc;
use axum::{
    extract::{Path, State, ws::{Message, WebSocket, WebSocketUpgrade}},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::AppState;
use crate::models::ClientMessage;
use crate::websocket::msg_claim_handler::handle_claim_message;
use crate::websocket::msg_heartbeat_handler::handle_heartbeat_message;
use crate::websocket::msg_hello_handler::handle_hello_message;
use crate::websocket::msg_presence_handler::handle_presence_message;
use crate::websocket::msg_release_handler::handle_release_message;
use crate::ws::{Outbound, Room, RoomKey, RoomRegistry, OUTBOUND_CAPACITY};

/// WebSocket handler for `/ws/:session_id/:story_id/:slide`
pub async fn websocket_handler(
    Path((session_id, story_id, slide)): Path<(String, String, u32)>,
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    let key = RoomKey::new(session_id, story_id, slide);
    info!("New WebSocket connection attempt for room {}", key);
    ws.on_upgrade(move |socket| handle_socket(socket, key, app_state))
}

/// Leaves the room when dropped, in case the socket future is cancelled
/// before it reaches the regular disconnect path.
struct LeaveGuard {
    registry: Arc<RoomRegistry>,
    room: Arc<Room>,
    conn_id: Uuid,
    armed: bool,
}

impl LeaveGuard {
    async fn leave(mut self) {
        self.armed = false;
        disconnect(&self.registry, &self.room, self.conn_id).await;
    }
}

impl Drop for LeaveGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let registry = self.registry.clone();
        let room = self.room.clone();
        let conn_id = self.conn_id;
        if let Ok(handle) = Handle::try_current() {
            handle.spawn(async move {
                disconnect(&registry, &room, conn_id).await;
            });
        }
    }
}

async fn disconnect(registry: &RoomRegistry, room: &Room, conn_id: Uuid) {
    room.leave(conn_id).await;
    registry.remove_if_empty(room.key()).await;
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, key: RoomKey, app_state: Arc<AppState>) {

    // Generate unique connection ID to identify this socket within the room
    let conn_id = Uuid::new_v4();
    info!("WebSocket connection established for room {} with connection_id: {}", key, conn_id);

    let (mut sender, mut receiver) = socket.split();
    let (outbound, mut rx) = Outbound::channel(OUTBOUND_CAPACITY);
    let close = outbound.close_signal();

    // Admission makes the connection visible to room broadcasts
    let room = app_state.registry.admit(&key, conn_id, outbound).await;
    let guard = LeaveGuard {
        registry: app_state.registry.clone(),
        room: room.clone(),
        conn_id,
        armed: true,
    };

    // Drain queued server messages into the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to serialize message for connection {}: {}", conn_id, e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // Read frames until the client goes away
    let recv_room = room.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            match frame {
                Ok(Message::Text(text)) => dispatch(&recv_room, conn_id, &text).await,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    warn!("WebSocket error on connection {}: {}", conn_id, e);
                    break;
                }
            }
        }
    });

    // Wait for either task to finish (and finish the other), or for the room
    // to close a connection that fell behind or went idle
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
        _ = close.notified() => {
            warn!("Closing lagging or idle connection {} in room {}", conn_id, room.key());
            send_task.abort();
            recv_task.abort();
        }
    };

    guard.leave().await;
    info!("WebSocket connection {} terminated", conn_id);
}

/// Parse one text frame and route it. Malformed frames are dropped.
async fn dispatch(room: &Room, conn_id: Uuid, text: &str) {
    let Some(msg) = ClientMessage::parse(text) else {
        debug!("Dropping malformed frame on connection {}: {}", conn_id, text);
        return;
    };

    match msg {
        ClientMessage::Hello(hello_msg) => handle_hello_message(&hello_msg, room, conn_id).await,
        ClientMessage::Claim(claim_msg) => handle_claim_message(&claim_msg, room, conn_id).await,
        ClientMessage::Release(release_msg) => handle_release_message(&release_msg, room, conn_id).await,
        ClientMessage::Heartbeat(heartbeat_msg) => handle_heartbeat_message(&heartbeat_msg, room, conn_id).await,
        ClientMessage::Presence(presence_msg) => handle_presence_message(&presence_msg, room, conn_id).await,
    }
}
