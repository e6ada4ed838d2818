//! Lobby service — registration, matchmaking, and room bookkeeping.
//!
//! DESIGN
//! ======
//! The lobby owns the `participants` and `rooms` registries in `AppState`.
//! A waiting room is plain data here: host, settings, and the queue of
//! guests asking to join. Accepting a guest or starting a solo game hands
//! the room to a freshly spawned room actor; from then on the lobby only
//! forwards game actions into the actor's queue and the actor calls back
//! through `update_room`, `release`, and `close_room`.
//!
//! Every change to the room registry is followed by a room-list broadcast
//! to all connected participants.
//!
//! Lock order is `rooms` before `participants`. Locks are never held across
//! a send into a room actor's queue.
//!
//! DISCONNECTS
//! ===========
//! A dropped connection clears the participant's sender and starts a grace
//! task. Only the connection currently bound to the identity counts: a late
//! close from a socket that was already replaced is ignored. `resume` is
//! accepted only while the identity is disconnected; within the window it
//! cancels the grace task and rebinds the identity to the new connection. When the window expires the participant is removed,
//! a waiting room they host is deleted, and a running game is told they
//! departed.

use rand::prelude::*;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::frame::{Data, ErrorCode, Frame};
use crate::game::Difficulty;
use crate::protocol::{GameAction, RoomSettings, ServerEvent};
use crate::services::dictionaries::DictionaryError;
use crate::services::persistence::StoreError;
use crate::services::room::{self, RoomCommand, RoomError, RoomSetup, Seat};
use crate::state::{AppState, Participant, RoomHandle, RoomStatus, RoomSummary};

/// Longest display or room name accepted.
pub const MAX_NAME_LEN: usize = 24;

/// Used when the AI name pool has nothing but the human's own name.
pub const FALLBACK_AI_NAME: &str = "Robot";

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    #[error("register a name first")]
    NotRegistered,
    #[error("this connection is already registered")]
    AlreadyRegistered,
    #[error("name already taken")]
    NameTaken,
    #[error("names must be 1 to 24 characters")]
    NameInvalid,
    #[error("already in a room")]
    AlreadyInRoom,
    #[error("a room with this name already exists")]
    RoomNameTaken,
    #[error("room not found")]
    RoomNotFound,
    #[error("room is not waiting for players")]
    RoomNotWaiting,
    #[error("the game has not started")]
    GameNotStarted,
    #[error("only the host can do that")]
    NotHost,
    #[error("no such join request")]
    GuestNotFound,
    #[error("not in a room")]
    NotInRoom,
    #[error("no pending join request")]
    NoPendingJoin,
    #[error("participant not found")]
    ParticipantNotFound,
    #[error("participant is still connected")]
    StillConnected,
    #[error("room closed")]
    RoomClosed,
    #[error(transparent)]
    Room(#[from] RoomError),
    #[error(transparent)]
    Dictionary(#[from] DictionaryError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ErrorCode for LobbyError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotRegistered => "E_NOT_REGISTERED",
            Self::AlreadyRegistered => "E_ALREADY_REGISTERED",
            Self::NameTaken => "E_NAME_TAKEN",
            Self::NameInvalid => "E_NAME_INVALID",
            Self::AlreadyInRoom => "E_ALREADY_IN_ROOM",
            Self::RoomNameTaken => "E_ROOM_NAME_TAKEN",
            Self::RoomNotFound => "E_ROOM_NOT_FOUND",
            Self::RoomNotWaiting => "E_ROOM_NOT_WAITING",
            Self::GameNotStarted => "E_GAME_NOT_STARTED",
            Self::NotHost => "E_NOT_HOST",
            Self::GuestNotFound => "E_GUEST_NOT_FOUND",
            Self::NotInRoom => "E_NOT_IN_ROOM",
            Self::NoPendingJoin => "E_NO_PENDING_JOIN",
            Self::ParticipantNotFound => "E_PARTICIPANT_NOT_FOUND",
            Self::StillConnected => "E_STILL_CONNECTED",
            Self::RoomClosed => "E_ROOM_CLOSED",
            Self::Room(e) => e.error_code(),
            Self::Dictionary(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Store(e) => e.retryable(),
            Self::Dictionary(e) => e.retryable(),
            _ => false,
        }
    }
}

fn valid_name(raw: &str) -> Result<String, LobbyError> {
    let name = raw.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(LobbyError::NameInvalid);
    }
    Ok(name.to_owned())
}

/// Pick an AI display name from `pool` that differs from `exclude`.
pub fn pick_ai_name<R: Rng + ?Sized>(pool: &[String], exclude: &str, rng: &mut R) -> String {
    let candidates: Vec<&String> = pool.iter().filter(|n| !n.eq_ignore_ascii_case(exclude)).collect();
    candidates.choose(rng).map_or_else(|| FALLBACK_AI_NAME.to_owned(), |n| (*n).clone())
}

// =============================================================================
// IDENTITY
// =============================================================================

/// Claim a display name for a connection. Names are unique ignoring case.
///
/// # Errors
///
/// `NameInvalid` for empty or overlong names, `NameTaken` when another
/// participant holds it.
pub async fn register(
    state: &AppState,
    connection: Uuid,
    tx: mpsc::Sender<Frame>,
    raw_name: &str,
) -> Result<Uuid, LobbyError> {
    let name = valid_name(raw_name)?;
    let mut participants = state.participants.write().await;
    if participants.values().any(|p| p.name.eq_ignore_ascii_case(&name)) {
        return Err(LobbyError::NameTaken);
    }
    let id = Uuid::new_v4();
    participants.insert(id, Participant::new(id, connection, name.clone(), tx));
    info!(participant_id = %id, %name, "lobby: participant registered");
    Ok(id)
}

/// Rebind a participant to a new connection inside the grace window.
///
/// # Errors
///
/// `ParticipantNotFound` once the window has expired, `StillConnected` while
/// another connection still holds the identity.
pub async fn resume(
    state: &AppState,
    id: Uuid,
    connection: Uuid,
    tx: mpsc::Sender<Frame>,
) -> Result<String, LobbyError> {
    let (name, room) = {
        let mut participants = state.participants.write().await;
        let participant = participants.get_mut(&id).ok_or(LobbyError::ParticipantNotFound)?;
        if participant.tx.is_some() {
            return Err(LobbyError::StillConnected);
        }
        participant.connection = connection;
        participant.tx = Some(tx.clone());
        (participant.name.clone(), participant.room.clone())
    };
    if let Some(pending) = state.pending_disconnects.lock().await.remove(&id) {
        pending.abort();
    }
    info!(participant_id = %id, %connection, %name, "lobby: participant resumed");

    if let Some(actor) = actor_of(state, room.as_deref()).await {
        forward(actor, RoomCommand::Rejoin { participant: id, tx }, room.as_deref()).await;
    }
    Ok(name)
}

/// `connection` closed: start the grace window, unless the identity has
/// already moved to another connection.
pub async fn disconnect(state: &AppState, id: Uuid, connection: Uuid) {
    {
        let mut participants = state.participants.write().await;
        let Some(participant) = participants.get_mut(&id) else {
            return;
        };
        if participant.connection != connection {
            debug!(participant_id = %id, %connection, "lobby: close from a replaced connection ignored");
            return;
        }
        participant.tx = None;
    }
    let _ = cancel_join(state, id).await;

    let grace = state.config.disconnect_grace;
    let task_state = state.clone();
    let handle = tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        expire(&task_state, id).await;
    });
    if let Some(previous) = state.pending_disconnects.lock().await.insert(id, handle) {
        previous.abort();
    }
    info!(participant_id = %id, grace_ms = grace.as_millis(), "lobby: participant disconnected");
}

/// Grace window over: drop the participant and whatever they were part of.
pub async fn expire(state: &AppState, id: Uuid) {
    state.pending_disconnects.lock().await.remove(&id);
    let (room, connected) = {
        let participants = state.participants.read().await;
        let Some(participant) = participants.get(&id) else {
            return;
        };
        (participant.room.clone(), participant.tx.is_some())
    };
    if connected {
        return;
    }

    if let Some(name) = room {
        let (hosts_waiting, actor) = {
            let rooms = state.rooms.read().await;
            rooms.get(&name).map_or((false, None), |r| {
                (r.host == id && r.summary.status == RoomStatus::Waiting, r.actor.clone())
            })
        };
        if hosts_waiting {
            let _ = delete_room(state, id).await;
        } else if let Some(actor) = actor {
            forward(actor, RoomCommand::Depart { participant: id }, Some(&name)).await;
        }
    }

    state.participants.write().await.remove(&id);
    info!(participant_id = %id, "lobby: participant expired");
}

// =============================================================================
// ROOMS
// =============================================================================

/// Every room, ordered by name.
pub async fn list_rooms(state: &AppState) -> Vec<RoomSummary> {
    let mut rooms: Vec<RoomSummary> = state.rooms.read().await.values().map(|r| r.summary.clone()).collect();
    rooms.sort_by(|a, b| a.name.cmp(&b.name));
    rooms
}

/// Open a waiting room hosted by `host`.
///
/// # Errors
///
/// Fails for unregistered or busy hosts, bad or duplicate names, and unknown
/// dictionaries.
pub async fn create_room(state: &AppState, host: Uuid, settings: RoomSettings) -> Result<RoomSummary, LobbyError> {
    let name = valid_name(&settings.name)?;
    let dictionary = match settings.dictionary {
        Some(title) => title,
        None => state.dictionaries.default_title().await,
    };
    if !state.dictionaries.contains(&dictionary).await {
        return Err(DictionaryError::NotFound(dictionary).into());
    }
    let turn_seconds = state.config.clamp_turn_seconds(settings.turn_seconds);

    let summary = {
        let mut rooms = state.rooms.write().await;
        let mut participants = state.participants.write().await;
        let participant = participants.get_mut(&host).ok_or(LobbyError::NotRegistered)?;
        if participant.room.is_some() || participant.pending_join.is_some() {
            return Err(LobbyError::AlreadyInRoom);
        }
        if rooms.contains_key(&name) {
            return Err(LobbyError::RoomNameTaken);
        }
        let summary = RoomSummary {
            name: name.clone(),
            host: participant.name.clone(),
            mode: settings.mode,
            difficulty: settings.difficulty,
            turn_seconds,
            dictionary,
            status: RoomStatus::Waiting,
            players: vec![participant.name.clone()],
        };
        participant.room = Some(name.clone());
        rooms.insert(name.clone(), RoomHandle { summary: summary.clone(), host, pending: Vec::new(), actor: None });
        summary
    };
    info!(room = %name, host = %summary.host, mode = summary.mode.as_str(), "lobby: room created");
    broadcast_room_list(state).await;
    Ok(summary)
}

/// Ask to join a waiting room. The host is notified.
///
/// # Errors
///
/// Fails when the guest is busy or the room is missing or already started.
pub async fn join_room(state: &AppState, guest: Uuid, room: &str) -> Result<(), LobbyError> {
    let mut rooms = state.rooms.write().await;
    let mut participants = state.participants.write().await;
    let participant = participants.get(&guest).ok_or(LobbyError::NotRegistered)?;
    if participant.room.is_some() || participant.pending_join.is_some() {
        return Err(LobbyError::AlreadyInRoom);
    }
    let guest_name = participant.name.clone();
    let handle = rooms.get_mut(room).ok_or(LobbyError::RoomNotFound)?;
    if handle.summary.status != RoomStatus::Waiting {
        return Err(LobbyError::RoomNotWaiting);
    }
    handle.pending.push(guest);
    if let Some(p) = participants.get_mut(&guest) {
        p.pending_join = Some(room.to_owned());
    }
    if let Some(host) = participants.get(&handle.host) {
        host.send(ServerEvent::JoinRequest { room: room.to_owned(), guest_id: guest, guest_name: guest_name.clone() }.into_frame());
    }
    info!(%room, guest = %guest_name, "lobby: join requested");
    Ok(())
}

/// Withdraw a pending join request.
///
/// # Errors
///
/// `NoPendingJoin` when there is nothing to withdraw.
pub async fn cancel_join(state: &AppState, guest: Uuid) -> Result<(), LobbyError> {
    let mut rooms = state.rooms.write().await;
    let mut participants = state.participants.write().await;
    let room = participants
        .get_mut(&guest)
        .and_then(|p| p.pending_join.take())
        .ok_or(LobbyError::NoPendingJoin)?;
    if let Some(handle) = rooms.get_mut(&room) {
        handle.pending.retain(|id| *id != guest);
        if let Some(host) = participants.get(&handle.host) {
            host.send(ServerEvent::JoinCancelled { room: room.clone(), guest_id: guest }.into_frame());
        }
    }
    info!(%room, participant_id = %guest, "lobby: join cancelled");
    Ok(())
}

/// Turn down one pending guest.
///
/// # Errors
///
/// Fails unless `host` hosts a waiting room with `guest` pending.
pub async fn reject(state: &AppState, host: Uuid, guest: Uuid) -> Result<(), LobbyError> {
    let mut rooms = state.rooms.write().await;
    let mut participants = state.participants.write().await;
    let room = hosted_room(&participants, host)?;
    let handle = rooms.get_mut(&room).ok_or(LobbyError::RoomNotFound)?;
    if handle.host != host {
        return Err(LobbyError::NotHost);
    }
    if !handle.pending.contains(&guest) {
        return Err(LobbyError::GuestNotFound);
    }
    handle.pending.retain(|id| *id != guest);
    if let Some(p) = participants.get_mut(&guest) {
        p.pending_join = None;
        p.send(ServerEvent::JoinRejected { room: room.clone() }.into_frame());
    }
    info!(%room, participant_id = %guest, "lobby: guest rejected");
    Ok(())
}

/// Delete a waiting room. Pending guests are notified.
///
/// # Errors
///
/// Fails unless `host` hosts a room that is still waiting.
pub async fn delete_room(state: &AppState, host: Uuid) -> Result<(), LobbyError> {
    let room = {
        let mut rooms = state.rooms.write().await;
        let mut participants = state.participants.write().await;
        let room = hosted_room(&participants, host)?;
        let handle = rooms.get(&room).ok_or(LobbyError::RoomNotFound)?;
        if handle.host != host {
            return Err(LobbyError::NotHost);
        }
        if handle.summary.status != RoomStatus::Waiting {
            return Err(LobbyError::RoomNotWaiting);
        }
        let Some(handle) = rooms.remove(&room) else {
            return Err(LobbyError::RoomNotFound);
        };
        for guest in handle.pending {
            if let Some(p) = participants.get_mut(&guest) {
                p.pending_join = None;
                p.send(ServerEvent::RoomDeleted { room: room.clone() }.into_frame());
            }
        }
        if let Some(p) = participants.get_mut(&host) {
            p.room = None;
        }
        room
    };
    info!(%room, "lobby: room deleted");
    broadcast_room_list(state).await;
    Ok(())
}

/// Start the game with `guest` as the second seat. Other pending guests
/// are turned down.
///
/// # Errors
///
/// Fails unless `host` hosts a waiting room with `guest` pending.
pub async fn accept(state: &AppState, host: Uuid, guest: Uuid) -> Result<(), LobbyError> {
    let dictionary = waiting_dictionary(state, host).await?;
    let dictionary = state.dictionaries.get(&dictionary).await?;

    let room = {
        let mut rooms = state.rooms.write().await;
        let mut participants = state.participants.write().await;
        let room = hosted_room(&participants, host)?;
        let handle = rooms.get_mut(&room).ok_or(LobbyError::RoomNotFound)?;
        if handle.host != host {
            return Err(LobbyError::NotHost);
        }
        if handle.summary.status != RoomStatus::Waiting {
            return Err(LobbyError::RoomNotWaiting);
        }
        if !handle.pending.contains(&guest) {
            return Err(LobbyError::GuestNotFound);
        }
        let host_seat = human_seat(&participants, host)?;
        let guest_seat = human_seat(&participants, guest)?;

        for other in handle.pending.drain(..).filter(|id| *id != guest) {
            if let Some(p) = participants.get_mut(&other) {
                p.pending_join = None;
                p.send(ServerEvent::JoinRejected { room: room.clone() }.into_frame());
            }
        }
        if let Some(p) = participants.get_mut(&guest) {
            p.pending_join = None;
            p.room = Some(room.clone());
        }

        handle.summary.status = RoomStatus::Playing;
        handle.summary.players = vec![host_seat.name.clone(), guest_seat.name.clone()];
        let setup = RoomSetup {
            name: room.clone(),
            mode: handle.summary.mode,
            difficulty: handle.summary.difficulty,
            turn_seconds: handle.summary.turn_seconds,
            dictionary,
            seats: [host_seat, guest_seat],
            seed: rand::rng().random(),
        };
        handle.actor = Some(room::spawn(state.clone(), setup));
        room
    };
    info!(%room, "lobby: guest accepted");
    broadcast_room_list(state).await;
    Ok(())
}

/// Start the host's waiting room against an AI of the room's difficulty.
///
/// # Errors
///
/// Fails unless `host` hosts a waiting room.
pub async fn start_solo(state: &AppState, host: Uuid) -> Result<(), LobbyError> {
    let dictionary = waiting_dictionary(state, host).await?;
    let dictionary = state.dictionaries.get(&dictionary).await?;
    let difficulty = {
        let rooms = state.rooms.read().await;
        let participants = state.participants.read().await;
        let room = hosted_room(&participants, host)?;
        rooms.get(&room).map_or(Difficulty::default(), |r| r.summary.difficulty)
    };
    let pool = state.store.ai_names(difficulty).await?;

    let room = {
        let mut rooms = state.rooms.write().await;
        let mut participants = state.participants.write().await;
        let room = hosted_room(&participants, host)?;
        let handle = rooms.get_mut(&room).ok_or(LobbyError::RoomNotFound)?;
        if handle.host != host {
            return Err(LobbyError::NotHost);
        }
        if handle.summary.status != RoomStatus::Waiting {
            return Err(LobbyError::RoomNotWaiting);
        }
        let host_seat = human_seat(&participants, host)?;
        let ai_name = pick_ai_name(&pool, &host_seat.name, &mut rand::rng());
        let ai_seat = Seat::ai(ai_name.clone(), handle.summary.difficulty);

        for other in handle.pending.drain(..) {
            if let Some(p) = participants.get_mut(&other) {
                p.pending_join = None;
                p.send(ServerEvent::JoinRejected { room: room.clone() }.into_frame());
            }
        }

        handle.summary.status = RoomStatus::Playing;
        handle.summary.players = vec![host_seat.name.clone(), ai_name];
        let setup = RoomSetup {
            name: room.clone(),
            mode: handle.summary.mode,
            difficulty: handle.summary.difficulty,
            turn_seconds: handle.summary.turn_seconds,
            dictionary,
            seats: [host_seat, ai_seat],
            seed: rand::rng().random(),
        };
        handle.actor = Some(room::spawn(state.clone(), setup));
        room
    };
    info!(%room, "lobby: solo game started");
    broadcast_room_list(state).await;
    Ok(())
}

// =============================================================================
// GAME FORWARDING
// =============================================================================

/// Forward a game action to the participant's room and wait for the answer.
///
/// # Errors
///
/// Lobby errors when the participant has no running game, otherwise the
/// room's own error for the action.
pub async fn play(state: &AppState, participant: Uuid, action: GameAction) -> Result<Data, LobbyError> {
    let actor = running_actor(state, participant).await?;
    let (reply, answer) = oneshot::channel();
    actor
        .send(RoomCommand::Play { participant, action, reply })
        .await
        .map_err(|_| LobbyError::RoomClosed)?;
    let result = answer.await.map_err(|_| LobbyError::RoomClosed)?;
    Ok(result?)
}

/// Walk out of a game in progress. A waiting room the participant hosts is
/// deleted instead.
///
/// # Errors
///
/// `NotInRoom` when there is nothing to abandon.
pub async fn abandon(state: &AppState, participant: Uuid) -> Result<(), LobbyError> {
    match running_actor(state, participant).await {
        Ok(actor) => {
            actor.send(RoomCommand::Depart { participant }).await.map_err(|_| LobbyError::RoomClosed)?;
            Ok(())
        }
        Err(LobbyError::GameNotStarted) => delete_room(state, participant).await,
        Err(e) => Err(e),
    }
}

/// Leave a room after its game ended.
///
/// # Errors
///
/// `NotInRoom` when there is nothing to leave.
pub async fn leave(state: &AppState, participant: Uuid) -> Result<(), LobbyError> {
    let actor = running_actor(state, participant).await?;
    actor.send(RoomCommand::Leave { participant }).await.map_err(|_| LobbyError::RoomClosed)?;
    Ok(())
}

async fn running_actor(state: &AppState, participant: Uuid) -> Result<mpsc::Sender<RoomCommand>, LobbyError> {
    let rooms = state.rooms.read().await;
    let participants = state.participants.read().await;
    let room = participants
        .get(&participant)
        .ok_or(LobbyError::NotRegistered)?
        .room
        .clone()
        .ok_or(LobbyError::NotInRoom)?;
    let handle = rooms.get(&room).ok_or(LobbyError::RoomNotFound)?;
    handle.actor.clone().ok_or(LobbyError::GameNotStarted)
}

async fn actor_of(state: &AppState, room: Option<&str>) -> Option<mpsc::Sender<RoomCommand>> {
    let room = room?;
    state.rooms.read().await.get(room).and_then(|r| r.actor.clone())
}

/// Queue a command for a room actor that nobody waits on. An actor that has
/// already shut down is only logged; its room entry is removed by `close_room`.
async fn forward(actor: mpsc::Sender<RoomCommand>, command: RoomCommand, room: Option<&str>) {
    if actor.send(command).await.is_err() {
        warn!(room = room.unwrap_or_default(), "lobby: room actor gone, command dropped");
    }
}

fn hosted_room(participants: &std::collections::HashMap<Uuid, Participant>, host: Uuid) -> Result<String, LobbyError> {
    participants
        .get(&host)
        .ok_or(LobbyError::NotRegistered)?
        .room
        .clone()
        .ok_or(LobbyError::NotInRoom)
}

fn human_seat(participants: &std::collections::HashMap<Uuid, Participant>, id: Uuid) -> Result<Seat, LobbyError> {
    let p = participants.get(&id).ok_or(LobbyError::ParticipantNotFound)?;
    Ok(Seat::human(id, p.name.clone(), p.tx.clone()))
}

async fn waiting_dictionary(state: &AppState, host: Uuid) -> Result<String, LobbyError> {
    let rooms = state.rooms.read().await;
    let participants = state.participants.read().await;
    let room = hosted_room(&participants, host)?;
    let handle = rooms.get(&room).ok_or(LobbyError::RoomNotFound)?;
    if handle.host != host {
        return Err(LobbyError::NotHost);
    }
    if handle.summary.status != RoomStatus::Waiting {
        return Err(LobbyError::RoomNotWaiting);
    }
    Ok(handle.summary.dictionary.clone())
}

// =============================================================================
// ROOM ACTOR CALLBACKS
// =============================================================================

/// Edit a room's summary and rebroadcast the list.
pub async fn update_room(state: &AppState, name: &str, edit: impl FnOnce(&mut RoomSummary)) {
    {
        let mut rooms = state.rooms.write().await;
        let Some(handle) = rooms.get_mut(name) else {
            return;
        };
        edit(&mut handle.summary);
    }
    broadcast_room_list(state).await;
}

/// Forget a participant's room membership.
pub async fn release(state: &AppState, participant: Uuid, room: &str) {
    let mut participants = state.participants.write().await;
    if let Some(p) = participants.get_mut(&participant)
        && p.room.as_deref() == Some(room)
    {
        p.room = None;
    }
}

/// Remove a room and everyone's membership in it.
pub async fn close_room(state: &AppState, name: &str) {
    {
        let mut rooms = state.rooms.write().await;
        let mut participants = state.participants.write().await;
        rooms.remove(name);
        for p in participants.values_mut() {
            if p.room.as_deref() == Some(name) {
                p.room = None;
            }
        }
    }
    info!(room = %name, "lobby: room archived");
    broadcast_room_list(state).await;
}

/// Move waiting rooms off deleted dictionaries onto the default one and tell
/// their hosts.
pub async fn switch_dictionary(state: &AppState, removed: &[String]) {
    if removed.is_empty() {
        return;
    }
    let default = state.dictionaries.default_title().await;
    let switched = {
        let mut rooms = state.rooms.write().await;
        let participants = state.participants.read().await;
        let mut switched = 0usize;
        for handle in rooms.values_mut() {
            if handle.summary.status != RoomStatus::Waiting || !removed.contains(&handle.summary.dictionary) {
                continue;
            }
            handle.summary.dictionary.clone_from(&default);
            switched += 1;
            if let Some(host) = participants.get(&handle.host) {
                host.send(
                    ServerEvent::DictionarySwitched { room: handle.summary.name.clone(), dictionary: default.clone() }
                        .into_frame(),
                );
            }
        }
        switched
    };
    if switched > 0 {
        info!(count = switched, dictionary = %default, "lobby: rooms switched to default dictionary");
        broadcast_room_list(state).await;
    }
}

/// Follow a dictionary rename in waiting rooms.
pub async fn retitle_dictionary(state: &AppState, old: &str, new: &str) {
    if old == new {
        return;
    }
    let renamed = {
        let mut rooms = state.rooms.write().await;
        let mut renamed = false;
        for handle in rooms.values_mut().filter(|r| r.summary.dictionary == old) {
            handle.summary.dictionary = new.to_owned();
            renamed = true;
        }
        renamed
    };
    if renamed {
        broadcast_room_list(state).await;
    }
}

// =============================================================================
// BROADCASTS
// =============================================================================

pub async fn broadcast_room_list(state: &AppState) {
    let frame = ServerEvent::RoomList(list_rooms(state).await).into_frame();
    state.broadcast_all(&frame).await;
}

pub async fn broadcast_matches(state: &AppState) {
    match state.store.matches().await {
        Ok(matches) => state.broadcast_all(&ServerEvent::Matches(matches).into_frame()).await,
        Err(e) => warn!(error = %e, "lobby: match history unavailable"),
    }
}

#[cfg(test)]
#[path = "lobby_test.rs"]
mod tests;
