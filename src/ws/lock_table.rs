use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::models::LockView;

/// Exclusivity record for one character within a room.
#[derive(Clone, Debug)]
pub struct LockEntry {
    pub holder: Option<String>,
    pub last_heartbeat_at: Instant,
}

impl LockEntry {
    pub fn is_held(&self) -> bool {
        self.holder.is_some()
    }

    fn is_held_by(&self, device_token: &str) -> bool {
        self.holder.as_deref() == Some(device_token)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// Free -> Held(token).
    Acquired,
    /// Held(token) -> Held(token); heartbeat refreshed.
    AlreadyHeld,
    /// Held(other), left untouched.
    Conflict,
}

impl ClaimOutcome {
    pub fn is_ok(self) -> bool {
        !matches!(self, ClaimOutcome::Conflict)
    }
}

/// Per-room map of character id to lock entry.
///
/// A character without an entry is free. Entries are created on the first
/// claim and go back to free on release, expiry or disconnect; they are never
/// removed, so later claims reuse the slot and snapshots keep reporting them.
///
/// The table itself is not synchronised. [`crate::ws::room::Room`] owns it
/// behind a mutex, which is what makes each transition atomic.
#[derive(Debug, Default)]
pub struct LockTable {
    entries: HashMap<String, LockEntry>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, char_id: &str, device_token: &str, now: Instant) -> ClaimOutcome {
        let outcome = match self.entries.get_mut(char_id) {
            Some(entry) => match entry.holder.as_deref() {
                Some(holder) if holder == device_token => {
                    entry.last_heartbeat_at = now;
                    ClaimOutcome::AlreadyHeld
                }
                Some(_) => ClaimOutcome::Conflict,
                None => {
                    entry.holder = Some(device_token.to_string());
                    entry.last_heartbeat_at = now;
                    ClaimOutcome::Acquired
                }
            },
            None => {
                self.entries.insert(
                    char_id.to_string(),
                    LockEntry {
                        holder: Some(device_token.to_string()),
                        last_heartbeat_at: now,
                    },
                );
                ClaimOutcome::Acquired
            }
        };
        debug!("claim {} by {}: {:?}", char_id, device_token, outcome);
        outcome
    }

    /// Free the character if `device_token` holds it. Anything else is a no-op.
    pub fn release(&mut self, char_id: &str, device_token: &str) -> bool {
        match self.entries.get_mut(char_id) {
            Some(entry) if entry.is_held_by(device_token) => {
                entry.holder = None;
                debug!("release {} by {}", char_id, device_token);
                true
            }
            _ => false,
        }
    }

    pub fn heartbeat(&mut self, char_id: &str, device_token: &str, now: Instant) -> bool {
        match self.entries.get_mut(char_id) {
            Some(entry) if entry.is_held_by(device_token) => {
                entry.last_heartbeat_at = now;
                true
            }
            _ => false,
        }
    }

    /// Free every held entry whose last heartbeat is older than `timeout`.
    /// Returns the released character ids, sorted.
    pub fn expire_stale(&mut self, now: Instant, timeout: Duration) -> Vec<String> {
        let mut released = Vec::new();
        for (char_id, entry) in self.entries.iter_mut() {
            if entry.is_held() && now.saturating_duration_since(entry.last_heartbeat_at) > timeout {
                debug!("expire {} held by {:?}", char_id, entry.holder);
                entry.holder = None;
                released.push(char_id.clone());
            }
        }
        released.sort();
        released
    }

    pub fn release_all_for(&mut self, device_token: &str) -> Vec<String> {
        self.release_all_for_except(device_token, &HashSet::new())
    }

    /// Free everything `device_token` holds except the ids in `retained`.
    /// Returns the released character ids, sorted.
    pub fn release_all_for_except(&mut self, device_token: &str, retained: &HashSet<String>) -> Vec<String> {
        let mut released = Vec::new();
        for (char_id, entry) in self.entries.iter_mut() {
            if entry.is_held_by(device_token) && !retained.contains(char_id) {
                entry.holder = None;
                released.push(char_id.clone());
            }
        }
        released.sort();
        released
    }

    /// Every known entry, seen from `device_token`.
    pub fn snapshot_for(&self, device_token: Option<&str>) -> Vec<LockView> {
        let mut locks: Vec<LockView> = self
            .entries
            .iter()
            .map(|(char_id, entry)| LockView {
                char_id: char_id.clone(),
                locked: entry.is_held(),
                is_self: device_token.is_some_and(|token| entry.is_held_by(token)),
            })
            .collect();
        locks.sort_by(|a, b| a.char_id.cmp(&b.char_id));
        locks
    }

    pub fn holder_of(&self, char_id: &str) -> Option<&str> {
        self.entries.get(char_id).and_then(|entry| entry.holder.as_deref())
    }

    pub fn held_count(&self) -> usize {
        self.entries.values().filter(|entry| entry.is_held()).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
