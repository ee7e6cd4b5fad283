use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::backoff::Backoff;

/// Timings of the coordination client. Every value can be overridden from the
/// environment with the `LOCKS_CLIENT_` prefix, e.g. `LOCKS_CLIENT_CLAIM_TIMEOUT_MS`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ClientConfig {
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    #[serde(default = "default_presence_interval_ms")]
    pub presence_interval_ms: u64,
    #[serde(default = "default_backoff_initial_ms")]
    pub backoff_initial_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
    #[serde(default = "default_backoff_jitter_ms")]
    pub backoff_jitter_ms: u64,
    #[serde(default = "default_claim_timeout_ms")]
    pub claim_timeout_ms: u64,
    /// Without a Connected state for this long the observer is told to give up.
    #[serde(default = "default_unreachable_after_ms")]
    pub unreachable_after_ms: u64,
    /// Re-claim characters held before a drop once the new snapshot arrives.
    #[serde(default = "default_reclaim_on_reconnect")]
    pub reclaim_on_reconnect: bool,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("LOCKS_CLIENT_").from_env::<ClientConfig>()
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms.max(1))
    }

    pub fn presence_interval(&self) -> Duration {
        Duration::from_millis(self.presence_interval_ms.max(1))
    }

    pub fn claim_timeout(&self) -> Duration {
        Duration::from_millis(self.claim_timeout_ms)
    }

    pub fn unreachable_after(&self) -> Duration {
        Duration::from_millis(self.unreachable_after_ms)
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.backoff_initial_ms),
            Duration::from_millis(self.backoff_max_ms),
            Duration::from_millis(self.backoff_jitter_ms),
        )
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            presence_interval_ms: default_presence_interval_ms(),
            backoff_initial_ms: default_backoff_initial_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            backoff_jitter_ms: default_backoff_jitter_ms(),
            claim_timeout_ms: default_claim_timeout_ms(),
            unreachable_after_ms: default_unreachable_after_ms(),
            reclaim_on_reconnect: default_reclaim_on_reconnect(),
        }
    }
}

fn default_heartbeat_interval_ms() -> u64 {
    5_000
}

fn default_presence_interval_ms() -> u64 {
    10_000
}

fn default_backoff_initial_ms() -> u64 {
    200
}

fn default_backoff_max_ms() -> u64 {
    2_000
}

fn default_backoff_jitter_ms() -> u64 {
    200
}

fn default_claim_timeout_ms() -> u64 {
    1_500
}

fn default_unreachable_after_ms() -> u64 {
    60_000
}

fn default_reclaim_on_reconnect() -> bool {
    true
}
