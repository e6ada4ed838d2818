//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor and
//! cloned into every room actor. It is the single owner of the process-wide
//! registries:
//!
//! - `participants`: everyone registered, keyed by participant id, with the
//!   sender for their current connection (`None` while disconnected).
//! - `rooms`: every room by name. A waiting room is plain lobby data; once a
//!   game starts the handle also carries the sender into the room's actor.
//! - `pending_disconnects`: grace-period tasks that expire a participant who
//!   dropped their connection, cancelled by `user:resume`.
//!
//! Lock order is `rooms` before `participants`. Frames are pushed with
//! `try_send` while a lock is held, never awaited.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::GameConfig;
use crate::frame::Frame;
use crate::game::{Difficulty, GameMode};
use crate::services::dictionaries::DictionaryLibrary;
use crate::services::persistence::Store;
use crate::services::room::RoomCommand;

// =============================================================================
// PARTICIPANTS
// =============================================================================

/// A registered display name and its live connection.
#[derive(Debug, Clone)]
pub struct Participant {
    pub id: Uuid,
    pub name: String,
    /// Websocket connection currently bound to this identity. Only its close
    /// starts the grace window.
    pub connection: Uuid,
    /// Outgoing frames for the current connection. `None` while disconnected.
    pub tx: Option<mpsc::Sender<Frame>>,
    /// Room the participant hosts or plays in.
    pub room: Option<String>,
    /// Waiting room the participant asked to join.
    pub pending_join: Option<String>,
}

impl Participant {
    #[must_use]
    pub fn new(id: Uuid, connection: Uuid, name: impl Into<String>, tx: mpsc::Sender<Frame>) -> Self {
        Self { id, name: name.into(), connection, tx: Some(tx), room: None, pending_join: None }
    }

    /// Best-effort push. A full or closed channel drops the frame.
    pub fn send(&self, frame: Frame) {
        if let Some(tx) = &self.tx {
            log_dropped(tx.try_send(frame), self.id);
        }
    }
}

/// Log a frame that `try_send` could not queue. A full queue means a slow
/// client is losing frames; a closed one is a connection already gone.
pub fn log_dropped(result: Result<(), TrySendError<Frame>>, participant: Uuid) {
    match result {
        Ok(()) => {}
        Err(TrySendError::Full(frame)) => {
            warn!(participant_id = %participant, syscall = %frame.syscall, "state: outbound queue full, frame dropped");
        }
        Err(TrySendError::Closed(frame)) => {
            debug!(participant_id = %participant, syscall = %frame.syscall, "state: connection closed, frame dropped");
        }
    }
}

// =============================================================================
// ROOMS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

/// What the room list shows about a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSummary {
    pub name: String,
    pub host: String,
    pub mode: GameMode,
    pub difficulty: Difficulty,
    pub turn_seconds: u32,
    pub dictionary: String,
    pub status: RoomStatus,
    pub players: Vec<String>,
}

pub struct RoomHandle {
    pub summary: RoomSummary,
    pub host: Uuid,
    /// Guests waiting for the host's answer, oldest first.
    pub pending: Vec<Uuid>,
    /// Sender into the room actor, once the game has started.
    pub actor: Option<mpsc::Sender<RoomCommand>>,
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GameConfig>,
    pub store: Arc<dyn Store>,
    pub dictionaries: Arc<DictionaryLibrary>,
    pub participants: Arc<RwLock<HashMap<Uuid, Participant>>>,
    pub rooms: Arc<RwLock<HashMap<String, RoomHandle>>>,
    pub pending_disconnects: Arc<Mutex<HashMap<Uuid, JoinHandle<()>>>>,
}

impl AppState {
    #[must_use]
    pub fn new(config: GameConfig, store: Arc<dyn Store>, dictionaries: Arc<DictionaryLibrary>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            dictionaries,
            participants: Arc::new(RwLock::new(HashMap::new())),
            rooms: Arc::new(RwLock::new(HashMap::new())),
            pending_disconnects: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Push a frame to one participant, if connected.
    pub async fn send_to(&self, participant: Uuid, frame: Frame) {
        if let Some(p) = self.participants.read().await.get(&participant) {
            p.send(frame);
        }
    }

    /// Push a frame to every connected participant.
    pub async fn broadcast_all(&self, frame: &Frame) {
        for p in self.participants.read().await.values() {
            p.send(frame.clone());
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;
    use crate::game::dictionary::DictionaryFile;
    use crate::services::dictionaries::{DEFAULT_FILE, DictionaryInfo, INDEX_FILE};
    use crate::services::persistence::MemoryStore;

    /// Write a one-dictionary library into a fresh temp directory and load it.
    pub async fn test_library(words: &[&str]) -> Arc<DictionaryLibrary> {
        let dir = std::env::temp_dir().join(format!("wordgame-test-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.expect("temp dir should be creatable");

        let default = DictionaryFile {
            title: "Test Words".into(),
            description: "words for tests".into(),
            words: words.iter().map(|w| (*w).to_owned()).collect(),
        };
        let index = vec![DictionaryInfo {
            title: default.title.clone(),
            description: default.description.clone(),
            file: DEFAULT_FILE.into(),
        }];
        tokio::fs::write(dir.join(DEFAULT_FILE), serde_json::to_string(&default).expect("serialize"))
            .await
            .expect("write default dictionary");
        tokio::fs::write(dir.join(INDEX_FILE), serde_json::to_string(&index).expect("serialize"))
            .await
            .expect("write index");

        Arc::new(DictionaryLibrary::load(dir).await.expect("test library should load"))
    }

    /// `AppState` on the in-memory store with millisecond timings.
    pub async fn test_app_state() -> AppState {
        let library = test_library(&["act", "tact", "toi", "cat", "at", "ta", "to", "a"]).await;
        AppState::new(GameConfig::for_tests(), Arc::new(MemoryStore::new()), library)
    }

    /// Register a connected participant and return its id and frame receiver.
    pub async fn seed_participant(state: &AppState, name: &str) -> (Uuid, mpsc::Receiver<Frame>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(256);
        state.participants.write().await.insert(id, Participant::new(id, Uuid::new_v4(), name, tx));
        (id, rx)
    }

    /// Connection id currently bound to a seeded participant.
    pub async fn connection_of(state: &AppState, participant: Uuid) -> Uuid {
        state.participants.read().await[&participant].connection
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
