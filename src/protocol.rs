//! Protocol — typed views of inbound and outbound frames.
//!
//! DESIGN
//! ======
//! The websocket speaks `Frame`s. Inbound request frames are parsed once, at
//! the edge, into the closed `ClientRequest` enum, so dispatch is a single
//! exhaustive `match`. Server-initiated notifications are built from the
//! closed `ServerEvent` enum; `into_frame` is the only place that knows
//! their syscalls and payload keys.
//!
//! Syscalls by prefix:
//!
//! - `user:`     register, resume
//! - `room:`     create, list, join, accept, reject, cancel_join, delete,
//!               start_solo, abandon, leave
//! - `game:`     place, message, exchange, pass, rack_order, board
//! - `scores:`   list
//! - `matches:`  list
//! - `admin:`    data, reset, ai_name:{add,update,delete},
//!               dict:{add,update,delete,download}

use serde::Serialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::frame::{Data, Frame};
use crate::game::board::Orientation;
use crate::game::dictionary::DictionaryFile;
use crate::game::objectives::{Objective, Scope};
use crate::game::tile::Tile;
use crate::game::{Difficulty, GameMode};
use crate::services::persistence::{MatchRecord, ScoreEntry};
use crate::state::RoomSummary;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("unknown syscall: {0}")]
    UnknownSyscall(String),
    #[error("{0} required")]
    MissingField(&'static str),
    #[error("invalid {0}")]
    InvalidField(&'static str),
}

impl crate::frame::ErrorCode for ProtocolError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownSyscall(_) => "E_UNKNOWN_SYSCALL",
            Self::MissingField(_) => "E_MISSING_FIELD",
            Self::InvalidField(_) => "E_INVALID_FIELD",
        }
    }
}

// =============================================================================
// INBOUND
// =============================================================================

/// Settings a host picks when creating a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSettings {
    pub name: String,
    pub turn_seconds: Option<u32>,
    pub mode: GameMode,
    pub difficulty: Difficulty,
    /// Dictionary title; `None` picks the default dictionary.
    pub dictionary: Option<String>,
}

/// A move or query addressed to the caller's running game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameAction {
    Place { x: usize, y: usize, orientation: Orientation, word: String },
    /// Chat line or `!` command.
    Message(String),
    Exchange(String),
    Pass,
    RackOrder(String),
    Board,
}

/// Parts an administrator can wipe and reseed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetPart {
    History,
    Dictionaries,
    Scores,
    AiNames,
}

impl ResetPart {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "history" => Some(Self::History),
            "dictionaries" => Some(Self::Dictionaries),
            "scores" => Some(Self::Scores),
            "ai-names" => Some(Self::AiNames),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminRequest {
    Data,
    Reset(ResetPart),
    AddAiName { name: String, difficulty: Difficulty },
    RenameAiName { name: String, new_name: String },
    DeleteAiName { name: String },
    AddDictionary(DictionaryFile),
    UpdateDictionary { title: String, new_title: String, description: String },
    DeleteDictionary { title: String },
    DownloadDictionary { title: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRequest {
    Register { name: String },
    Resume { participant_id: Uuid },
    CreateRoom(RoomSettings),
    ListRooms,
    JoinRoom { room: String },
    AcceptGuest { guest: Uuid },
    RejectGuest { guest: Uuid },
    CancelJoin,
    DeleteRoom,
    StartSolo,
    Abandon,
    LeaveRoom,
    Game(GameAction),
    Scores { mode: GameMode },
    Matches,
    Admin(AdminRequest),
}

fn text<'a>(frame: &'a Frame, key: &'static str) -> Result<&'a str, ProtocolError> {
    frame
        .data
        .get(key)
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingField(key))
}

fn owned(frame: &Frame, key: &'static str) -> Result<String, ProtocolError> {
    text(frame, key).map(str::to_owned)
}

fn optional_text<'a>(frame: &'a Frame, key: &str) -> Option<&'a str> {
    frame.data.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn uuid(frame: &Frame, key: &'static str) -> Result<Uuid, ProtocolError> {
    text(frame, key)?.parse().map_err(|_| ProtocolError::InvalidField(key))
}

fn index(frame: &Frame, key: &'static str) -> Result<usize, ProtocolError> {
    let value = frame.data.get(key).ok_or(ProtocolError::MissingField(key))?;
    value
        .as_u64()
        .and_then(|v| usize::try_from(v).ok())
        .ok_or(ProtocolError::InvalidField(key))
}

fn flag(frame: &Frame, key: &'static str) -> Result<bool, ProtocolError> {
    let value = frame.data.get(key).ok_or(ProtocolError::MissingField(key))?;
    value.as_bool().ok_or(ProtocolError::InvalidField(key))
}

fn mode(frame: &Frame) -> Result<GameMode, ProtocolError> {
    optional_text(frame, "mode").map_or(Ok(GameMode::Classic), |m| {
        GameMode::parse(m).ok_or(ProtocolError::InvalidField("mode"))
    })
}

fn difficulty(frame: &Frame) -> Result<Difficulty, ProtocolError> {
    optional_text(frame, "difficulty").map_or(Ok(Difficulty::Novice), |d| {
        Difficulty::parse(d).ok_or(ProtocolError::InvalidField("difficulty"))
    })
}

impl ClientRequest {
    /// Parse a request frame by syscall.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSyscall` for an unrecognised syscall and
    /// `MissingField`/`InvalidField` for a malformed payload.
    pub fn from_frame(frame: &Frame) -> Result<Self, ProtocolError> {
        let request = match frame.syscall.as_str() {
            "user:register" => Self::Register { name: owned(frame, "name")? },
            "user:resume" => Self::Resume { participant_id: uuid(frame, "participant_id")? },

            "room:create" => Self::CreateRoom(RoomSettings {
                name: owned(frame, "name")?,
                turn_seconds: frame
                    .data
                    .get("turn_seconds")
                    .and_then(Value::as_u64)
                    .map(|s| u32::try_from(s).unwrap_or(u32::MAX)),
                mode: mode(frame)?,
                difficulty: difficulty(frame)?,
                dictionary: optional_text(frame, "dictionary").map(str::to_owned),
            }),
            "room:list" => Self::ListRooms,
            "room:join" => Self::JoinRoom { room: owned(frame, "room")? },
            "room:accept" => Self::AcceptGuest { guest: uuid(frame, "guest_id")? },
            "room:reject" => Self::RejectGuest { guest: uuid(frame, "guest_id")? },
            "room:cancel_join" => Self::CancelJoin,
            "room:delete" => Self::DeleteRoom,
            "room:start_solo" => Self::StartSolo,
            "room:abandon" => Self::Abandon,
            "room:leave" => Self::LeaveRoom,

            "game:place" => Self::Game(GameAction::Place {
                x: index(frame, "x")?,
                y: index(frame, "y")?,
                orientation: if flag(frame, "horizontal")? { Orientation::Horizontal } else { Orientation::Vertical },
                word: owned(frame, "word")?,
            }),
            "game:message" => Self::Game(GameAction::Message(owned(frame, "text")?)),
            "game:exchange" => Self::Game(GameAction::Exchange(owned(frame, "letters")?)),
            "game:pass" => Self::Game(GameAction::Pass),
            "game:rack_order" => Self::Game(GameAction::RackOrder(owned(frame, "letters")?)),
            "game:board" => Self::Game(GameAction::Board),

            "scores:list" => Self::Scores { mode: mode(frame)? },
            "matches:list" => Self::Matches,

            "admin:data" => Self::Admin(AdminRequest::Data),
            "admin:reset" => {
                let part = text(frame, "part")?;
                Self::Admin(AdminRequest::Reset(ResetPart::parse(part).ok_or(ProtocolError::InvalidField("part"))?))
            }
            "admin:ai_name:add" => Self::Admin(AdminRequest::AddAiName {
                name: owned(frame, "name")?,
                difficulty: difficulty(frame)?,
            }),
            "admin:ai_name:update" => Self::Admin(AdminRequest::RenameAiName {
                name: owned(frame, "name")?,
                new_name: owned(frame, "new_name")?,
            }),
            "admin:ai_name:delete" => Self::Admin(AdminRequest::DeleteAiName { name: owned(frame, "name")? }),
            "admin:dict:add" => {
                let words = frame
                    .data
                    .get("words")
                    .and_then(Value::as_array)
                    .ok_or(ProtocolError::MissingField("words"))?
                    .iter()
                    .filter_map(|w| w.as_str().map(str::to_owned))
                    .collect();
                Self::Admin(AdminRequest::AddDictionary(DictionaryFile {
                    title: owned(frame, "title")?,
                    description: optional_text(frame, "description").unwrap_or_default().to_owned(),
                    words,
                }))
            }
            "admin:dict:update" => Self::Admin(AdminRequest::UpdateDictionary {
                title: owned(frame, "title")?,
                new_title: owned(frame, "new_title")?,
                description: optional_text(frame, "description").unwrap_or_default().to_owned(),
            }),
            "admin:dict:delete" => Self::Admin(AdminRequest::DeleteDictionary { title: owned(frame, "title")? }),
            "admin:dict:download" => Self::Admin(AdminRequest::DownloadDictionary { title: owned(frame, "title")? }),

            other => return Err(ProtocolError::UnknownSyscall(other.to_owned())),
        };
        Ok(request)
    }
}

// =============================================================================
// OUTBOUND
// =============================================================================

/// An objective as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectiveView {
    pub id: Objective,
    pub description: &'static str,
    pub points: u32,
}

impl From<Objective> for ObjectiveView {
    fn from(objective: Objective) -> Self {
        Self { id: objective, description: objective.description(), points: objective.points() }
    }
}

#[derive(Debug, Clone)]
pub enum ServerEvent {
    Connected { connection_id: Uuid },
    RoomList(Vec<RoomSummary>),
    JoinRequest { room: String, guest_id: Uuid, guest_name: String },
    JoinCancelled { room: String, guest_id: Uuid },
    JoinRejected { room: String },
    RoomDeleted { room: String },
    DictionarySwitched { room: String, dictionary: String },
    GameStarted { room: String, players: [String; 2], mode: GameMode, turn_seconds: u32 },
    Opponent { room: String, name: String },
    Board { room: String, rows: Vec<String>, trial: bool },
    Rack { room: String, tiles: Vec<Tile> },
    OpponentRack { room: String, count: usize },
    Scores { room: String, own: i32, opponent: i32 },
    Turn { room: String, name: String, yours: bool },
    Timer { room: String, remaining: u32, bag: usize },
    /// `from: None` is a system message.
    Chat { room: String, from: Option<String>, text: String },
    Objectives { room: String, private: Option<Objective>, public: Vec<Objective> },
    ObjectiveCompleted { room: String, objective: Objective, scope: Scope, yours: bool },
    GameOver { room: String, winner: String, scores: [(String, i32); 2] },
    Matches(Vec<MatchRecord>),
}

pub(crate) fn object(value: Value) -> Data {
    match value {
        Value::Object(map) => map.into_iter().collect(),
        _ => Data::new(),
    }
}

impl ServerEvent {
    #[must_use]
    pub fn syscall(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "session:connected",
            Self::RoomList(_) => "room:list",
            Self::JoinRequest { .. } => "room:join_request",
            Self::JoinCancelled { .. } => "room:join_cancelled",
            Self::JoinRejected { .. } => "room:rejected",
            Self::RoomDeleted { .. } => "room:deleted",
            Self::DictionarySwitched { .. } => "room:dictionary",
            Self::GameStarted { .. } => "game:started",
            Self::Opponent { .. } => "game:opponent",
            Self::Board { .. } => "game:board",
            Self::Rack { .. } => "game:rack",
            Self::OpponentRack { .. } => "game:opponent_rack",
            Self::Scores { .. } => "game:scores",
            Self::Turn { .. } => "game:turn",
            Self::Timer { .. } => "game:timer",
            Self::Chat { .. } => "game:message",
            Self::Objectives { .. } => "game:objectives",
            Self::ObjectiveCompleted { .. } => "game:objective",
            Self::GameOver { .. } => "game:over",
            Self::Matches(_) => "matches:list",
        }
    }

    fn room(&self) -> Option<&str> {
        match self {
            Self::Connected { .. } | Self::RoomList(_) | Self::Matches(_) => None,
            Self::JoinRequest { room, .. }
            | Self::JoinCancelled { room, .. }
            | Self::JoinRejected { room }
            | Self::RoomDeleted { room }
            | Self::DictionarySwitched { room, .. }
            | Self::GameStarted { room, .. }
            | Self::Opponent { room, .. }
            | Self::Board { room, .. }
            | Self::Rack { room, .. }
            | Self::OpponentRack { room, .. }
            | Self::Scores { room, .. }
            | Self::Turn { room, .. }
            | Self::Timer { room, .. }
            | Self::Chat { room, .. }
            | Self::Objectives { room, .. }
            | Self::ObjectiveCompleted { room, .. }
            | Self::GameOver { room, .. } => Some(room),
        }
    }

    fn data(&self) -> Data {
        object(match self {
            Self::Connected { connection_id } => json!({ "connection_id": connection_id }),
            Self::RoomList(rooms) => json!({ "rooms": rooms }),
            Self::JoinRequest { guest_id, guest_name, .. } => json!({ "guest_id": guest_id, "guest_name": guest_name }),
            Self::JoinCancelled { guest_id, .. } => json!({ "guest_id": guest_id }),
            Self::JoinRejected { .. } | Self::RoomDeleted { .. } => json!({}),
            Self::DictionarySwitched { dictionary, .. } => json!({ "dictionary": dictionary }),
            Self::GameStarted { players, mode, turn_seconds, .. } => {
                json!({ "players": players, "mode": mode, "turn_seconds": turn_seconds })
            }
            Self::Opponent { name, .. } => json!({ "name": name }),
            Self::Board { rows, trial, .. } => json!({ "rows": rows, "trial": trial }),
            Self::Rack { tiles, .. } => json!({ "tiles": tiles }),
            Self::OpponentRack { count, .. } => json!({ "count": count }),
            Self::Scores { own, opponent, .. } => json!({ "own": own, "opponent": opponent }),
            Self::Turn { name, yours, .. } => json!({ "name": name, "yours": yours }),
            Self::Timer { remaining, bag, .. } => json!({ "remaining": remaining, "bag": bag }),
            Self::Chat { from, text, .. } => json!({ "from": from, "text": text }),
            Self::Objectives { private, public, .. } => json!({
                "private": private.map(ObjectiveView::from),
                "public": public.iter().copied().map(ObjectiveView::from).collect::<Vec<_>>(),
            }),
            Self::ObjectiveCompleted { objective, scope, yours, .. } => json!({
                "objective": ObjectiveView::from(*objective),
                "scope": scope,
                "yours": yours,
            }),
            Self::GameOver { winner, scores, .. } => json!({
                "winner": winner,
                "scores": scores.iter().map(|(name, points)| json!({ "name": name, "points": points })).collect::<Vec<_>>(),
            }),
            Self::Matches(matches) => json!({ "matches": matches }),
        })
    }

    /// Build the notification frame. Notifications have no parent.
    #[must_use]
    pub fn into_frame(self) -> Frame {
        let frame = Frame::request(self.syscall(), self.data());
        match self.room() {
            Some(room) => frame.with_room(room),
            None => frame,
        }
    }
}

/// Leaderboard payload shared by the websocket and HTTP routes.
#[must_use]
pub fn scores_data(mode: GameMode, scores: &[ScoreEntry]) -> Data {
    object(json!({ "mode": mode, "scores": scores }))
}

/// Match history payload shared by the websocket and HTTP routes.
#[must_use]
pub fn matches_data(matches: &[MatchRecord]) -> Data {
    object(json!({ "matches": matches }))
}

#[cfg(test)]
#[path = "protocol_test.rs"]
mod tests;
