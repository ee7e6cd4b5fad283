//! Real-time character-lock coordination.
//!
//! Browser tabs join a room addressed by `(session, story, slide)` over a
//! WebSocket, claim exclusive rights to characters, and see every claim and
//! release in the room live. A room's lock table is serialised behind one
//! mutex; rooms are independent. Holders that disconnect are released at
//! once, holders that go silent are released by the liveness sweep.

pub mod clients;
pub mod config;
pub mod docs;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod websocket;
pub mod ws;

use chrono::{DateTime, Utc};
use std::sync::Arc;

use config::Config;
use services::BlobStore;
use ws::RoomRegistry;

/// State shared by every handler.
pub struct AppState {
    pub config: Config,
    pub registry: Arc<RoomRegistry>,
    pub blob: Arc<dyn BlobStore>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: Config, registry: Arc<RoomRegistry>, blob: Arc<dyn BlobStore>) -> Self {
        Self {
            config,
            registry,
            blob,
            started_at: Utc::now(),
        }
    }
}
