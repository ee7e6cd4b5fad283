use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use super::connctx::Outbound;
use super::room::{Room, RoomKey};

/// Aggregated counters across all rooms.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub rooms: usize,
    pub connections: usize,
    pub lock_entries: usize,
    pub held_locks: usize,
}

/// All live rooms, keyed by `(session, story, slide)`.
///
/// Lock order is always registry first, then room. Admission and removal both
/// run under the registry lock, so a room is never collected while a
/// connection is being added to it, and two admissions for the same key always
/// land in the same room.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: Mutex<HashMap<RoomKey, Arc<Room>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_create_room(&self, key: &RoomKey) -> Arc<Room> {
        let mut rooms = self.rooms.lock().await;
        get_or_insert(&mut rooms, key)
    }

    /// Get or create the room and register the connection in one step.
    pub async fn admit(&self, key: &RoomKey, conn_id: Uuid, outbound: Outbound) -> Arc<Room> {
        let mut rooms = self.rooms.lock().await;
        let room = get_or_insert(&mut rooms, key);
        room.join(conn_id, outbound).await;
        room
    }

    /// Drop the room once its last connection is gone.
    pub async fn remove_if_empty(&self, key: &RoomKey) -> bool {
        let mut rooms = self.rooms.lock().await;
        let Some(room) = rooms.get(key) else {
            return false;
        };
        if !room.is_empty().await {
            return false;
        }
        rooms.remove(key);
        info!("Room {} closed ({} rooms open)", key, rooms.len());
        true
    }

    pub async fn get(&self, key: &RoomKey) -> Option<Arc<Room>> {
        self.rooms.lock().await.get(key).cloned()
    }

    pub async fn rooms(&self) -> Vec<Arc<Room>> {
        self.rooms.lock().await.values().cloned().collect()
    }

    pub async fn stats(&self) -> RegistryStats {
        let rooms = self.rooms().await;
        let mut stats = RegistryStats {
            rooms: rooms.len(),
            ..RegistryStats::default()
        };
        for room in rooms {
            let room_stats = room.stats().await;
            stats.connections += room_stats.connections;
            stats.lock_entries += room_stats.lock_entries;
            stats.held_locks += room_stats.held_locks;
        }
        stats
    }
}

fn get_or_insert(rooms: &mut HashMap<RoomKey, Arc<Room>>, key: &RoomKey) -> Arc<Room> {
    rooms
        .entry(key.clone())
        .or_insert_with(|| {
            info!("Room {} opened", key);
            Arc::new(Room::new(key.clone()))
        })
        .clone()
}
