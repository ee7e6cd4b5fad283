use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Notify;
use tokio::time::{Duration, Instant};
use uuid::Uuid;

use crate::models::ServerMessage;

/// Messages a connection may have queued before it is dropped as too slow.
pub const OUTBOUND_CAPACITY: usize = 100;

/// Outbound half of a connection; the socket task drains the receiver and
/// ends the connection once `close_signal()` fires.
#[derive(Clone, Debug)]
pub struct Outbound {
    tx: mpsc::Sender<ServerMessage>,
    close: Arc<Notify>,
}

impl Outbound {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        let outbound = Self {
            tx,
            close: Arc::new(Notify::new()),
        };
        (outbound, rx)
    }

    /// Queue a message. A full queue closes the connection.
    pub fn send(&self, msg: ServerMessage) -> bool {
        match self.tx.try_send(msg) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.close();
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Ask the socket task to end the connection.
    pub fn close(&self) {
        self.close.notify_one();
    }

    /// Signal the socket task waits on.
    pub fn close_signal(&self) -> Arc<Notify> {
        self.close.clone()
    }
}

/// Server-side record of one live WebSocket within a room.
#[derive(Debug)]
pub struct ConnCtx {
    pub conn_id: Uuid,
    /// Set by `hello`. Lock operations are ignored until then.
    pub device_token: Option<String>,
    pub outbound: Outbound,
    /// Characters this connection claimed and still holds.
    pub held: HashSet<String>,
    pub last_seen: Instant,
}

impl ConnCtx {
    pub fn new(conn_id: Uuid, outbound: Outbound, now: Instant) -> Self {
        Self {
            conn_id,
            device_token: None,
            outbound,
            held: HashSet::new(),
            last_seen: now,
        }
    }

    pub fn is_device(&self, device_token: &str) -> bool {
        self.device_token.as_deref() == Some(device_token)
    }

    pub fn send(&self, msg: ServerMessage) -> bool {
        self.outbound.send(msg)
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_seen = self.last_seen.max(now);
    }

    pub fn is_idle(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) > timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn full_queue_closes_the_connection() {
        let (outbound, mut rx) = Outbound::channel(2);
        let close = outbound.close_signal();
        assert!(outbound.send(ServerMessage::status("hare", true)));
        assert!(outbound.send(ServerMessage::status("hare", false)));
        assert!(!outbound.send(ServerMessage::status("hare", true)));

        tokio::time::timeout(Duration::from_secs(1), close.notified())
            .await
            .expect("close signal");
        assert_eq!(rx.try_recv().unwrap(), ServerMessage::status("hare", true));
    }

    #[test]
    fn idle_after_timeout() {
        let (outbound, _rx) = Outbound::channel(OUTBOUND_CAPACITY);
        let start = Instant::now();
        let mut conn = ConnCtx::new(Uuid::new_v4(), outbound, start);
        let timeout = Duration::from_secs(60);
        assert!(!conn.is_idle(start + Duration::from_secs(60), timeout));
        assert!(conn.is_idle(start + Duration::from_secs(61), timeout));

        conn.touch(start + Duration::from_secs(30));
        assert!(!conn.is_idle(start + Duration::from_secs(61), timeout));
    }
}
