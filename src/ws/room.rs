use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{LockView, ServerMessage, SnapshotMessage};
use super::connctx::{ConnCtx, Outbound};
use super::lock_table::{ClaimOutcome, LockTable};

/// Routing key of a room. Carries no meaning beyond addressing.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RoomKey {
    pub session_id: String,
    pub story_id: String,
    pub slide: u32,
}

impl RoomKey {
    pub fn new(session_id: impl Into<String>, story_id: impl Into<String>, slide: u32) -> Self {
        Self {
            session_id: session_id.into(),
            story_id: story_id.into(),
            slide,
        }
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.session_id, self.story_id, self.slide)
    }
}

#[derive(Debug, Default)]
struct RoomState {
    table: LockTable,
    conns: HashMap<Uuid, ConnCtx>,
}

/// Counters for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoomStats {
    pub connections: usize,
    pub lock_entries: usize,
    pub held_locks: usize,
}

/// One coordination scope: a lock table and the connections watching it.
///
/// All state sits behind a single mutex. Every transition enqueues its
/// broadcast before the guard is dropped, so each connection sees status
/// messages in exactly the order the table was mutated.
#[derive(Debug)]
pub struct Room {
    key: RoomKey,
    state: Mutex<RoomState>,
}

impl Room {
    pub fn new(key: RoomKey) -> Self {
        Self {
            key,
            state: Mutex::new(RoomState::default()),
        }
    }

    pub fn key(&self) -> &RoomKey {
        &self.key
    }

    pub async fn join(&self, conn_id: Uuid, outbound: Outbound) {
        let mut state = self.state.lock().await;
        state.conns.insert(conn_id, ConnCtx::new(conn_id, outbound, Instant::now()));
        info!("Connection {} joined room {} ({} connected)", conn_id, self.key, state.conns.len());
    }

    /// Bind a device token to the connection and send it the snapshot.
    ///
    /// A repeated hello with the same token re-sends the snapshot. A connection
    /// cannot switch identity; a hello with a different token is ignored.
    pub async fn hello(&self, conn_id: Uuid, device_token: &str) -> bool {
        let mut state = self.state.lock().await;
        let RoomState { table, conns } = &mut *state;
        let Some(conn) = conns.get_mut(&conn_id) else {
            return false;
        };
        if let Some(existing) = conn.device_token.as_deref() {
            if existing != device_token {
                warn!(
                    "Connection {} in room {} tried to change device token, ignoring",
                    conn_id, self.key
                );
                return false;
            }
        }
        conn.device_token = Some(device_token.to_string());
        conn.touch(Instant::now());
        let locks = table.snapshot_for(Some(device_token));
        debug!("Sending snapshot with {} entries to {} in room {}", locks.len(), conn_id, self.key);
        conn.send(ServerMessage::Snapshot(SnapshotMessage { locks }))
    }

    /// Attempt a claim on behalf of the connection. Replies to the claimant with
    /// a `claim-result` and, when the lock changed hands, broadcasts `status`.
    /// Returns `None` if the connection has not said hello.
    pub async fn claim(&self, conn_id: Uuid, char_id: &str, now: Instant) -> Option<ClaimOutcome> {
        let mut state = self.state.lock().await;
        let RoomState { table, conns } = &mut *state;
        let conn = conns.get_mut(&conn_id)?;
        let device_token = conn.device_token.clone()?;

        let outcome = table.claim(char_id, &device_token, now);
        conn.touch(now);
        if outcome.is_ok() {
            conn.held.insert(char_id.to_string());
        }
        conn.send(ServerMessage::claim_result(char_id, outcome.is_ok()));

        if outcome == ClaimOutcome::Acquired {
            broadcast(conns, ServerMessage::status(char_id, true));
        }
        Some(outcome)
    }

    /// Release a character held by the connection's device. Returns whether the
    /// table changed; a stale or foreign release is a silent no-op.
    pub async fn release(&self, conn_id: Uuid, char_id: &str) -> bool {
        let mut state = self.state.lock().await;
        let RoomState { table, conns } = &mut *state;
        let Some(conn) = conns.get_mut(&conn_id) else {
            return false;
        };
        conn.touch(Instant::now());
        let Some(device_token) = conn.device_token.clone() else {
            return false;
        };
        if !table.release(char_id, &device_token) {
            return false;
        }
        for conn in conns.values_mut().filter(|c| c.is_device(&device_token)) {
            conn.held.remove(char_id);
        }
        broadcast(conns, ServerMessage::status(char_id, false));
        true
    }

    pub async fn heartbeat(&self, conn_id: Uuid, char_id: &str, now: Instant) -> bool {
        let mut state = self.state.lock().await;
        let RoomState { table, conns } = &mut *state;
        let Some(conn) = conns.get_mut(&conn_id) else {
            return false;
        };
        conn.touch(now);
        match conn.device_token.as_deref() {
            Some(device_token) => table.heartbeat(char_id, device_token, now),
            None => false,
        }
    }

    pub async fn presence(&self, conn_id: Uuid, now: Instant) -> bool {
        let mut state = self.state.lock().await;
        match state.conns.get_mut(&conn_id) {
            Some(conn) => {
                conn.touch(now);
                true
            }
            None => false,
        }
    }

    /// Remove the connection and release its device's locks, one `status`
    /// broadcast per released character.
    ///
    /// Characters that another live connection of the same device has itself
    /// claimed stay held; that connection is still heartbeating them.
    pub async fn leave(&self, conn_id: Uuid) -> Vec<String> {
        let mut state = self.state.lock().await;
        let RoomState { table, conns } = &mut *state;
        let Some(conn) = conns.remove(&conn_id) else {
            return Vec::new();
        };
        let Some(device_token) = conn.device_token else {
            info!("Connection {} left room {} before hello", conn_id, self.key);
            return Vec::new();
        };

        let retained: HashSet<String> = conns
            .values()
            .filter(|c| c.is_device(&device_token))
            .flat_map(|c| c.held.iter().cloned())
            .collect();
        let released = table.release_all_for_except(&device_token, &retained);
        for char_id in &released {
            broadcast(conns, ServerMessage::status(char_id, false));
        }
        info!(
            "Connection {} ({}) left room {}, released {:?}",
            conn_id, device_token, self.key, released
        );
        released
    }

    /// Revoke locks whose holder stopped heartbeating for longer than `timeout`.
    pub async fn expire_stale(&self, now: Instant, timeout: Duration) -> Vec<String> {
        let mut state = self.state.lock().await;
        let RoomState { table, conns } = &mut *state;
        let released = table.expire_stale(now, timeout);
        if released.is_empty() {
            return released;
        }
        for conn in conns.values_mut() {
            for char_id in &released {
                conn.held.remove(char_id);
            }
        }
        for char_id in &released {
            broadcast(conns, ServerMessage::status(char_id, false));
        }
        info!("Expired stale locks in room {}: {:?}", self.key, released);
        released
    }

    /// Close connections that sent nothing for longer than `timeout`. Their
    /// socket tasks then leave the room, releasing locks as on any disconnect.
    pub async fn close_idle(&self, now: Instant, timeout: Duration) -> Vec<Uuid> {
        let state = self.state.lock().await;
        let mut idle = Vec::new();
        for conn in state.conns.values().filter(|conn| conn.is_idle(now, timeout)) {
            conn.outbound.close();
            idle.push(conn.conn_id);
        }
        if !idle.is_empty() {
            info!("Closing idle connections in room {}: {:?}", self.key, idle);
        }
        idle
    }

    /// Broadcast a room event that does not touch the lock table.
    pub async fn notify(&self, msg: ServerMessage) {
        let state = self.state.lock().await;
        broadcast(&state.conns, msg);
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.conns.is_empty()
    }

    pub async fn snapshot_for(&self, device_token: Option<&str>) -> Vec<LockView> {
        self.state.lock().await.table.snapshot_for(device_token)
    }

    pub async fn holder_of(&self, char_id: &str) -> Option<String> {
        self.state.lock().await.table.holder_of(char_id).map(str::to_string)
    }

    pub async fn stats(&self) -> RoomStats {
        let state = self.state.lock().await;
        RoomStats {
            connections: state.conns.len(),
            lock_entries: state.table.len(),
            held_locks: state.table.held_count(),
        }
    }
}

/// Queue `msg` for every connection in the room, the originator included.
/// A closed or overflowing connection is skipped; its own socket task takes
/// care of leaving.
fn broadcast(conns: &HashMap<Uuid, ConnCtx>, msg: ServerMessage) {
    for conn in conns.values() {
        if !conn.send(msg.clone()) {
            debug!("Skipping broadcast to closed connection {}", conn.conn_id);
        }
    }
}
