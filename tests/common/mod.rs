#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use wt_locks::{
    config::Config,
    routes::create_app,
    services::MemoryBlobStore,
    ws::RoomRegistry,
    AppState,
};

pub const RECV_TIMEOUT: Duration = Duration::from_secs(3);

pub fn test_state() -> Arc<AppState> {
    Arc::new(AppState::new(
        Config::default(),
        Arc::new(RoomRegistry::new()),
        Arc::new(MemoryBlobStore::with_public_base("https://cdn.test")),
    ))
}

pub async fn spawn_server() -> (SocketAddr, Arc<AppState>) {
    spawn_server_on("127.0.0.1:0").await
}

pub async fn spawn_server_on(addr: &str) -> (SocketAddr, Arc<AppState>) {
    let state = test_state();
    let app = create_app(state.clone());
    let listener = TcpListener::bind(addr).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

/// Raw browser-like connection speaking the JSON protocol.
pub struct TestSocket {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestSocket {
    pub async fn open(addr: SocketAddr, session: &str, story: &str, slide: u32) -> Self {
        let url = format!("ws://{}/ws/{}/{}/{}", addr, session, story, slide);
        let (ws, _) = connect_async(url.as_str()).await.unwrap();
        Self { ws }
    }

    /// Open, say hello and return the snapshot's lock list.
    pub async fn join(addr: SocketAddr, session: &str, story: &str, slide: u32, device: &str) -> (Self, Vec<Value>) {
        let mut socket = Self::open(addr, session, story, slide).await;
        socket.send(json!({"type": "hello", "sessionId": session, "deviceToken": device})).await;
        let snapshot = socket.recv().await;
        assert_eq!(snapshot["type"], "snapshot");
        let locks = snapshot["locks"].as_array().cloned().unwrap_or_default();
        (socket, locks)
    }

    pub async fn send(&mut self, value: Value) {
        self.send_raw(&value.to_string()).await;
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.ws.send(Message::text(text.to_string())).await.unwrap();
    }

    pub async fn send_binary(&mut self, bytes: Vec<u8>) {
        self.ws.send(Message::binary(bytes)).await.unwrap();
    }

    pub async fn claim(&mut self, char_id: &str) {
        self.send(json!({"type": "claim", "charId": char_id})).await;
    }

    pub async fn release(&mut self, char_id: &str) {
        self.send(json!({"type": "release", "charId": char_id})).await;
    }

    pub async fn heartbeat(&mut self, char_id: &str) {
        self.send(json!({"type": "heartbeat", "charId": char_id})).await;
    }

    /// Next JSON message from the server.
    pub async fn recv(&mut self) -> Value {
        self.try_recv(RECV_TIMEOUT).await.expect("expected a message from the server")
    }

    pub async fn try_recv(&mut self, wait: Duration) -> Option<Value> {
        loop {
            let frame = timeout(wait, self.ws.next()).await.ok()??;
            match frame {
                Ok(Message::Text(text)) => return serde_json::from_str(text.as_str()).ok(),
                Ok(Message::Close(_)) | Err(_) => return None,
                Ok(_) => continue,
            }
        }
    }

    /// Claim and return the direct `claim-result` verdict.
    pub async fn claim_ok(&mut self, char_id: &str) -> bool {
        self.claim(char_id).await;
        loop {
            let msg = self.recv().await;
            if msg["type"] == "claim-result" && msg["charId"] == char_id {
                return msg["ok"].as_bool().unwrap();
            }
        }
    }

    pub async fn expect_status(&mut self, char_id: &str, locked: bool) {
        let msg = self.recv().await;
        assert_eq!(msg, json!({"type": "status", "charId": char_id, "locked": locked}));
    }

    pub async fn expect_silence(&mut self, wait: Duration) {
        if let Some(msg) = self.try_recv(wait).await {
            panic!("unexpected message: {}", msg);
        }
    }

    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}
