use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::registry::RoomRegistry;

/// Periodic sweep revoking locks whose holders stopped heartbeating.
///
/// Disconnects do not wait for this: the socket task releases on close. The
/// sweep covers holders that are still connected, or half-open, but silent.
/// Connections that send nothing at all for `idle_timeout` are closed.
pub struct LivenessSupervisor {
    handle: JoinHandle<()>,
}

impl LivenessSupervisor {
    pub fn spawn(
        registry: Arc<RoomRegistry>,
        lock_ttl: Duration,
        idle_timeout: Duration,
        period: Duration,
    ) -> Self {
        info!(
            "Liveness supervisor started (ttl {:?}, idle {:?}, sweep every {:?})",
            lock_ttl, idle_timeout, period
        );
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                sweep(&registry, Instant::now(), lock_ttl, idle_timeout).await;
            }
        });
        Self { handle }
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for LivenessSupervisor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// One pass over every room. Returns the number of revoked locks.
pub async fn sweep(registry: &RoomRegistry, now: Instant, lock_ttl: Duration, idle_timeout: Duration) -> usize {
    let mut revoked = 0;
    let mut closed = 0;
    for room in registry.rooms().await {
        revoked += room.expire_stale(now, lock_ttl).await.len();
        closed += room.close_idle(now, idle_timeout).await.len();
        registry.remove_if_empty(room.key()).await;
    }
    if revoked > 0 || closed > 0 {
        debug!("Sweep revoked {} stale locks, closed {} idle connections", revoked, closed);
    }
    revoked
}
