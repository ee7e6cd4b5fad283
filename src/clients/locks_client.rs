//! Coordination client for the lock server.
//!
//! [`LocksClient`] is a handle onto a background task that owns the socket.
//! The task reconnects forever with exponential backoff, re-sends `hello` on
//! every new connection, heartbeats each owned character, and reports changes
//! through a [`LockObserver`].
//!
//! A reconnect is a fresh connection to the server, which already released
//! everything the old one held. The client therefore drops its ownership on
//! disconnect, takes the next snapshot as the truth, and (if configured)
//! re-claims what it held before.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::models::{
    ClaimMessage, ClientMessage, HeartbeatMessage, HelloMessage, LockView, PresenceMessage,
    ReleaseMessage, ServerMessage,
};
use super::locks_config::ClientConfig;
use super::locks_observer::{ConnectionStatus, LockObserver};
use super::room_context::RoomContext;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("server url cannot carry a room path: {0}")]
    UnsupportedBaseUrl(String),
}

#[derive(Default)]
struct ClientState {
    status: ConnectionStatus,
    outbound: Option<mpsc::UnboundedSender<ClientMessage>>,
    owned: HashSet<String>,
    locks: HashMap<String, LockView>,
    pending: HashMap<String, Vec<oneshot::Sender<bool>>>,
    reclaim: HashSet<String>,
}

struct Shared {
    ctx: RoomContext,
    config: ClientConfig,
    observer: Arc<dyn LockObserver>,
    state: Mutex<ClientState>,
    ready: watch::Sender<bool>,
}

/// Handle to a live room subscription.
pub struct LocksClient {
    shared: Arc<Shared>,
    ready: watch::Receiver<bool>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl LocksClient {
    /// Start the background connection and wait up to the claim timeout for
    /// the first snapshot. Returns even if the server is not reachable yet.
    pub async fn connect(
        base_url: &str,
        ctx: RoomContext,
        config: ClientConfig,
        observer: Arc<dyn LockObserver>,
    ) -> Result<Self, ClientError> {
        let url = ctx.ws_url(base_url)?;
        let (ready_tx, ready_rx) = watch::channel(false);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let wait = config.claim_timeout();
        let shared = Arc::new(Shared {
            ctx,
            config,
            observer,
            state: Mutex::new(ClientState::default()),
            ready: ready_tx,
        });

        let task = tokio::spawn(run(shared.clone(), url, shutdown_rx));
        let client = Self {
            shared,
            ready: ready_rx,
            shutdown: shutdown_tx,
            task: Some(task),
        };
        client.wait_ready(wait).await;
        Ok(client)
    }

    /// [`LocksClient::connect`] driven by a page query string. `Ok(None)` means
    /// the page lacks session, story or slide and should run uncoordinated.
    pub async fn connect_from_query(
        base_url: &str,
        query: &str,
        config: ClientConfig,
        observer: Arc<dyn LockObserver>,
    ) -> Result<Option<Self>, ClientError> {
        match RoomContext::from_query(query) {
            Some(ctx) => Self::connect(base_url, ctx, config, observer).await.map(Some),
            None => {
                debug!("No room context in query, lock coordination disabled");
                Ok(None)
            }
        }
    }

    /// Wait until the current connection has delivered its snapshot.
    pub async fn wait_ready(&self, timeout: Duration) -> bool {
        let mut ready = self.ready.clone();
        let became_ready = match time::timeout(timeout, ready.wait_for(|ready| *ready)).await {
            Ok(result) => result.is_ok(),
            Err(_) => false,
        };
        became_ready
    }

    /// Ask for exclusive rights on `char_id`.
    ///
    /// Resolves with the server's direct reply. Not connected, a dropped
    /// connection or no reply within the claim timeout all count as failure.
    pub async fn claim(&self, char_id: &str) -> bool {
        let char_id = char_id.trim();
        if char_id.is_empty() {
            return false;
        }
        let reply = {
            let mut state = self.shared.lock();
            let Some(outbound) = state.outbound.clone() else {
                debug!("Claim of {} while disconnected", char_id);
                return false;
            };
            let (tx, rx) = oneshot::channel();
            let waiters = state.pending.entry(char_id.to_string()).or_default();
            waiters.retain(|w| !w.is_closed());
            waiters.push(tx);
            let sent = outbound.send(ClientMessage::Claim(ClaimMessage {
                char_id: char_id.to_string(),
            }));
            if sent.is_err() {
                return false;
            }
            rx
        };
        match time::timeout(self.shared.config.claim_timeout(), reply).await {
            Ok(Ok(ok)) => ok,
            Ok(Err(_)) => false,
            Err(_) => {
                warn!("Claim of {} timed out", char_id);
                false
            }
        }
    }

    /// Give up `char_id`. Fire and forget; the room broadcast confirms it.
    pub fn release(&self, char_id: &str) {
        let char_id = char_id.trim();
        let mut state = self.shared.lock();
        state.owned.remove(char_id);
        state.reclaim.remove(char_id);
        if let Some(outbound) = &state.outbound {
            let _ = outbound.send(ClientMessage::Release(ReleaseMessage {
                char_id: char_id.to_string(),
            }));
        }
    }

    /// Locked by somebody else.
    pub fn is_locked(&self, char_id: &str) -> bool {
        self.shared
            .lock()
            .locks
            .get(char_id)
            .is_some_and(|view| view.locked && !view.is_self)
    }

    pub fn state(&self) -> HashMap<String, LockView> {
        self.shared.lock().locks.clone()
    }

    pub fn owned(&self) -> HashSet<String> {
        self.shared.lock().owned.clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.shared.lock().status
    }

    pub fn context(&self) -> &RoomContext {
        &self.shared.ctx
    }

    /// Release everything owned, close the socket and stop reconnecting.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            if time::timeout(Duration::from_secs(2), task).await.is_err() {
                warn!("Lock client did not stop in time");
            }
        }
    }
}

impl Drop for LocksClient {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

enum Emit {
    Status(String, bool, bool),
    Connectivity(ConnectionStatus),
    Image(String, bool),
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ClientState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Observer callbacks run after the state lock is released so they may
    /// call back into the client.
    fn emit(&self, events: Vec<Emit>) {
        for event in events {
            match event {
                Emit::Status(char_id, locked, is_self) => {
                    self.observer.on_status_change(&char_id, locked, is_self)
                }
                Emit::Connectivity(status) => self.observer.on_connectivity(status),
                Emit::Image(key, added) => self.observer.on_image(&key, added),
            }
        }
    }

    fn set_status(&self, status: ConnectionStatus) {
        let changed = {
            let mut state = self.lock();
            let changed = state.status != status;
            state.status = status;
            changed
        };
        if changed {
            self.emit(vec![Emit::Connectivity(status)]);
        }
    }

    fn on_open(&self, outbound: mpsc::UnboundedSender<ClientMessage>) {
        self.lock().outbound = Some(outbound);
        self.set_status(ConnectionStatus::Connected);
    }

    /// The server releases on disconnect, so nothing stays owned.
    fn on_close(&self) {
        let mut events = Vec::new();
        {
            let mut state = self.lock();
            state.outbound = None;
            state.pending.clear();
            let dropped: Vec<String> = state.owned.drain().collect();
            for char_id in &dropped {
                state.locks.insert(
                    char_id.clone(),
                    LockView {
                        char_id: char_id.clone(),
                        locked: false,
                        is_self: false,
                    },
                );
                events.push(Emit::Status(char_id.clone(), false, false));
            }
            if self.config.reclaim_on_reconnect {
                state.reclaim.extend(dropped);
            }
        }
        self.ready.send_replace(false);
        self.emit(events);
    }

    fn owned_ids(&self) -> Vec<String> {
        self.lock().owned.iter().cloned().collect()
    }

    fn handle_text(&self, text: &str) {
        let msg: ServerMessage = match serde_json::from_str(text) {
            Ok(msg) => msg,
            Err(e) => {
                debug!("Dropping unparseable server frame: {}", e);
                return;
            }
        };

        let mut events = Vec::new();
        let mut became_ready = false;
        {
            let mut state = self.lock();
            let ClientState { outbound, owned, locks, pending, reclaim, .. } = &mut *state;
            match msg {
                ServerMessage::Snapshot(snapshot) => {
                    locks.clear();
                    owned.clear();
                    for view in snapshot.locks {
                        if view.locked && view.is_self {
                            owned.insert(view.char_id.clone());
                        }
                        events.push(Emit::Status(view.char_id.clone(), view.locked, view.is_self));
                        locks.insert(view.char_id.clone(), view);
                    }
                    // Claim again even when the snapshot says the lock is ours: it may
                    // still be bound to the old connection, whose close releases it.
                    for char_id in reclaim.drain() {
                        if let Some(outbound) = outbound {
                            debug!("Re-claiming {} after reconnect", char_id);
                            let _ = outbound.send(ClientMessage::Claim(ClaimMessage { char_id }));
                        }
                    }
                    became_ready = true;
                }
                ServerMessage::Status(status) => {
                    if !status.locked {
                        owned.remove(&status.char_id);
                    }
                    let is_self = owned.contains(&status.char_id);
                    events.push(Emit::Status(status.char_id.clone(), status.locked, is_self));
                    locks.insert(
                        status.char_id.clone(),
                        LockView {
                            char_id: status.char_id,
                            locked: status.locked,
                            is_self,
                        },
                    );
                }
                ServerMessage::ClaimResult(result) => {
                    if result.ok {
                        owned.insert(result.char_id.clone());
                        locks.insert(
                            result.char_id.clone(),
                            LockView {
                                char_id: result.char_id.clone(),
                                locked: true,
                                is_self: true,
                            },
                        );
                    }
                    for waiter in pending.remove(&result.char_id).unwrap_or_default() {
                        let _ = waiter.send(result.ok);
                    }
                }
                ServerMessage::ImageAdded(image) => events.push(Emit::Image(image.key, true)),
                ServerMessage::ImageRemoved(image) => events.push(Emit::Image(image.key, false)),
            }
        }
        if became_ready {
            self.ready.send_replace(true);
        }
        self.emit(events);
    }
}

async fn run(shared: Arc<Shared>, url: Url, mut shutdown: watch::Receiver<bool>) {
    let mut backoff = shared.config.backoff();
    let mut outage_started = Instant::now();
    let mut unreachable_reported = false;

    loop {
        if *shutdown.borrow_and_update() {
            break;
        }
        shared.set_status(ConnectionStatus::Connecting);

        let attempt = tokio::select! {
            attempt = connect_async(url.as_str()) => attempt,
            _ = shutdown.changed() => break,
        };
        match attempt {
            Ok((stream, _)) => {
                info!("Connected to lock server at {}", url);
                backoff.reset();
                unreachable_reported = false;
                run_connection(&shared, stream, &mut shutdown).await;
                shared.on_close();
                outage_started = Instant::now();
            }
            Err(e) => warn!("Failed to connect to {}: {}", url, e),
        }

        if *shutdown.borrow() {
            break;
        }
        shared.set_status(ConnectionStatus::Reconnecting);

        let outage = outage_started.elapsed();
        if !unreachable_reported && outage >= shared.config.unreachable_after() {
            error!("Lock server unreachable for {:?}", outage);
            shared.observer.on_unreachable(outage);
            unreachable_reported = true;
        }

        let delay = backoff.next_delay();
        debug!("Reconnecting in {:?}", delay);
        tokio::select! {
            _ = time::sleep(delay) => {}
            _ = shutdown.changed() => break,
        }
    }
    shared.set_status(ConnectionStatus::Closed);
    info!("Lock client for {} stopped", url);
}

async fn run_connection(shared: &Shared, stream: WsStream, shutdown: &mut watch::Receiver<bool>) {
    let (mut sink, mut source) = stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ClientMessage>();

    let _ = tx.send(ClientMessage::Hello(HelloMessage {
        session_id: Some(shared.ctx.session_id.clone()),
        device_token: shared.ctx.device_token.clone(),
    }));
    shared.on_open(tx.clone());

    let heartbeat_every = shared.config.heartbeat_interval();
    let presence_every = shared.config.presence_interval();
    let mut heartbeat = time::interval_at(Instant::now() + heartbeat_every, heartbeat_every);
    let mut presence = time::interval_at(Instant::now() + presence_every, presence_every);

    loop {
        tokio::select! {
            Some(msg) = rx.recv() => {
                if let Err(e) = send_message(&mut sink, &msg).await {
                    warn!("Send to lock server failed: {}", e);
                    break;
                }
            }
            frame = source.next() => match frame {
                Some(Ok(Message::Text(text))) => shared.handle_text(text.as_str()),
                Some(Ok(Message::Close(_))) | None => {
                    info!("Lock server closed the connection");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Lock server connection failed: {}", e);
                    break;
                }
            },
            _ = heartbeat.tick() => {
                for char_id in shared.owned_ids() {
                    let _ = tx.send(ClientMessage::Heartbeat(HeartbeatMessage { char_id }));
                }
            }
            _ = presence.tick() => {
                let _ = tx.send(ClientMessage::Presence(PresenceMessage {}));
            }
            _ = shutdown.changed() => {
                while let Ok(msg) = rx.try_recv() {
                    let _ = send_message(&mut sink, &msg).await;
                }
                for char_id in shared.owned_ids() {
                    let _ = send_message(&mut sink, &ClientMessage::Release(ReleaseMessage { char_id })).await;
                }
                let _ = sink.close().await;
                break;
            }
        }
    }
}

async fn send_message(sink: &mut WsSink, msg: &ClientMessage) -> Result<(), tungstenite::Error> {
    match serde_json::to_string(msg) {
        Ok(text) => sink.send(Message::text(text)).await,
        Err(e) => {
            error!("Failed to serialize {:?}: {}", msg, e);
            Ok(())
        }
    }
}
