use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Connecting,
    Connected,
    Reconnecting,
    Closed,
}

/// Receives lock and connectivity changes from a [`super::LocksClient`].
///
/// Callbacks run on the client's background task and must not block.
pub trait LockObserver: Send + Sync + 'static {
    /// A character changed state. `is_self` is true when this client holds it.
    fn on_status_change(&self, char_id: &str, locked: bool, is_self: bool);

    fn on_connectivity(&self, _status: ConnectionStatus) {}

    /// No Connected state for the configured ceiling. Fired once per outage;
    /// pages should leave the editor for a safe landing page.
    fn on_unreachable(&self, _elapsed: Duration) {}

    /// An image for the room's slide was stored (`added`) or deleted.
    fn on_image(&self, _key: &str, _added: bool) {}
}

/// Observer that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl LockObserver for NoopObserver {
    fn on_status_change(&self, _char_id: &str, _locked: bool, _is_self: bool) {}
}

/// Observer callbacks as values, for consumers that prefer a channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LockEvent {
    Status { char_id: String, locked: bool, is_self: bool },
    Connectivity(ConnectionStatus),
    Unreachable(Duration),
    Image { key: String, added: bool },
}

impl LockObserver for mpsc::UnboundedSender<LockEvent> {
    fn on_status_change(&self, char_id: &str, locked: bool, is_self: bool) {
        let _ = self.send(LockEvent::Status {
            char_id: char_id.to_string(),
            locked,
            is_self,
        });
    }

    fn on_connectivity(&self, status: ConnectionStatus) {
        let _ = self.send(LockEvent::Connectivity(status));
    }

    fn on_unreachable(&self, elapsed: Duration) {
        let _ = self.send(LockEvent::Unreachable(elapsed));
    }

    fn on_image(&self, key: &str, added: bool) {
        let _ = self.send(LockEvent::Image {
            key: key.to_string(),
            added,
        });
    }
}
