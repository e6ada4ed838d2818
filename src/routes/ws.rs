//! WebSocket handler — bidirectional frame relay.
//!
//! DESIGN
//! ======
//! On upgrade, generates a connection ID and enters a `select!` loop:
//! - Incoming client frames → parse into a `ClientRequest` + dispatch
//! - Frames pushed by the lobby and room actors → forward to client
//!
//! Handler functions call into the lobby and room services and return an
//! `Outcome`. The dispatch layer owns all outbound concerns: reply to the
//! sender and any broadcast to other connections. Game notifications such
//! as board, rack, and turn updates never pass through here; room actors
//! push them straight into each participant's channel.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `session:connected` with `connection_id`
//! 2. Client registers a name (`user:register`) or resumes one (`user:resume`)
//! 3. Client sends frames → dispatch → handler returns Outcome
//! 4. Close → `lobby::disconnect` starts the reconnect grace window

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::frame::{Data, Frame};
use crate::game::Difficulty;
use crate::protocol::{self, AdminRequest, ClientRequest, ResetPart, ServerEvent, object};
use crate::services::lobby::{self, LobbyError};
use crate::services::persistence::StorePart;
use crate::state::AppState;

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions. The dispatch layer uses this to
/// decide who receives what. Handlers never send frames directly.
enum Outcome {
    /// Send done+data to sender only.
    Reply(Data),
    /// Send empty done to sender only.
    Done,
    /// Reply to sender, then push a notification to every connection.
    ReplyAndBroadcast { reply: Data, broadcast: Frame },
}

/// Per-connection state threaded through dispatch.
struct Connection {
    id: Uuid,
    /// Registered identity, once `user:register` or `user:resume` succeeded.
    participant: Option<Uuid>,
    /// Sender half of this connection's outbound channel.
    tx: mpsc::Sender<Frame>,
}

impl Connection {
    fn participant(&self) -> Result<Uuid, LobbyError> {
        self.participant.ok_or(LobbyError::NotRegistered)
    }
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    // Per-connection channel for frames pushed by the lobby and rooms.
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(256);
    let mut conn = Connection { id: Uuid::new_v4(), participant: None, tx: client_tx };

    let welcome = ServerEvent::Connected { connection_id: conn.id }.into_frame();
    if send_frame(&mut socket, &welcome).await.is_err() {
        return;
    }

    info!(connection_id = %conn.id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        dispatch_frame(&state, &mut socket, &mut conn, &text).await;
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    if let Some(participant) = conn.participant {
        lobby::disconnect(&state, participant, conn.id).await;
    }
    info!(connection_id = %conn.id, "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Parse an incoming JSON frame, dispatch to handler, apply outcome.
async fn dispatch_frame(state: &AppState, socket: &mut WebSocket, conn: &mut Connection, text: &str) {
    let sender_frames = process_inbound_text(state, conn, text).await;
    for frame in sender_frames {
        let _ = send_frame(socket, &frame).await;
    }
}

/// Parse and process one inbound text frame and return frames for the sender.
///
/// This keeps the websocket transport concerns separate from frame handling,
/// so tests can exercise dispatch without a socket.
async fn process_inbound_text(state: &AppState, conn: &mut Connection, text: &str) -> Vec<Frame> {
    let mut req: Frame = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            warn!(connection_id = %conn.id, error = %e, "ws: invalid inbound frame");
            let err = Frame::request("gateway:error", Data::new()).with_data("message", format!("invalid json: {e}"));
            return vec![err];
        }
    };

    // Stamp the registered identity as `from`.
    req.from = conn.participant.map(|id| id.to_string());
    info!(connection_id = %conn.id, id = %req.id, syscall = %req.syscall, "ws: recv frame");

    let result = match ClientRequest::from_frame(&req) {
        Ok(request) => handle_request(state, conn, &req, request).await,
        Err(e) => Err(req.error_from(&e)),
    };

    match result {
        Ok(Outcome::Reply(data)) => vec![req.done_with(data)],
        Ok(Outcome::Done) => vec![req.done()],
        Ok(Outcome::ReplyAndBroadcast { reply, broadcast }) => {
            state.broadcast_all(&broadcast).await;
            vec![req.done_with(reply)]
        }
        Err(err_frame) => vec![err_frame],
    }
}

/// Run one request against the lobby, a room, the store, or the library.
async fn handle_request(
    state: &AppState,
    conn: &mut Connection,
    req: &Frame,
    request: ClientRequest,
) -> Result<Outcome, Frame> {
    let fail = |e: &dyn crate::frame::ErrorCode| req.error_from(e);

    match request {
        ClientRequest::Register { name } => {
            if conn.participant.is_some() {
                return Err(fail(&LobbyError::AlreadyRegistered));
            }
            let id = lobby::register(state, conn.id, conn.tx.clone(), &name).await.map_err(|e| fail(&e))?;
            conn.participant = Some(id);
            greet(state, id).await;
            Ok(Outcome::Reply(identity(id, name.trim())))
        }
        ClientRequest::Resume { participant_id } => {
            if conn.participant.is_some() {
                return Err(fail(&LobbyError::AlreadyRegistered));
            }
            let name = lobby::resume(state, participant_id, conn.id, conn.tx.clone()).await.map_err(|e| fail(&e))?;
            conn.participant = Some(participant_id);
            greet(state, participant_id).await;
            Ok(Outcome::Reply(identity(participant_id, &name)))
        }
        ClientRequest::ListRooms => {
            let rooms = lobby::list_rooms(state).await;
            Ok(Outcome::Reply(object(json!({ "rooms": rooms }))))
        }
        ClientRequest::Scores { mode } => {
            let scores = state.store.top_scores(mode).await.map_err(|e| fail(&e))?;
            Ok(Outcome::Reply(protocol::scores_data(mode, &scores)))
        }
        ClientRequest::Matches => {
            let matches = state.store.matches().await.map_err(|e| fail(&e))?;
            Ok(Outcome::Reply(protocol::matches_data(&matches)))
        }
        ClientRequest::Admin(admin) => handle_admin(state, req, admin).await,
        request => {
            let participant = conn.participant().map_err(|e| fail(&e))?;
            handle_participant(state, participant, request).await.map_err(|e| fail(&e))
        }
    }
}

/// Requests that act on behalf of a registered participant.
async fn handle_participant(state: &AppState, participant: Uuid, request: ClientRequest) -> Result<Outcome, LobbyError> {
    match request {
        ClientRequest::CreateRoom(settings) => {
            let summary = lobby::create_room(state, participant, settings).await?;
            Ok(Outcome::Reply(object(json!({ "room": summary }))))
        }
        ClientRequest::JoinRoom { room } => lobby::join_room(state, participant, &room).await.map(|()| Outcome::Done),
        ClientRequest::AcceptGuest { guest } => lobby::accept(state, participant, guest).await.map(|()| Outcome::Done),
        ClientRequest::RejectGuest { guest } => lobby::reject(state, participant, guest).await.map(|()| Outcome::Done),
        ClientRequest::CancelJoin => lobby::cancel_join(state, participant).await.map(|()| Outcome::Done),
        ClientRequest::DeleteRoom => lobby::delete_room(state, participant).await.map(|()| Outcome::Done),
        ClientRequest::StartSolo => lobby::start_solo(state, participant).await.map(|()| Outcome::Done),
        ClientRequest::Abandon => lobby::abandon(state, participant).await.map(|()| Outcome::Done),
        ClientRequest::LeaveRoom => lobby::leave(state, participant).await.map(|()| Outcome::Done),
        ClientRequest::Game(action) => lobby::play(state, participant, action).await.map(Outcome::Reply),
        // Identity, listing, and admin requests are answered before this point.
        ClientRequest::Register { .. }
        | ClientRequest::Resume { .. }
        | ClientRequest::ListRooms
        | ClientRequest::Scores { .. }
        | ClientRequest::Matches
        | ClientRequest::Admin(_) => Ok(Outcome::Done),
    }
}

// =============================================================================
// ADMIN HANDLERS
// =============================================================================

async fn handle_admin(state: &AppState, req: &Frame, admin: AdminRequest) -> Result<Outcome, Frame> {
    let fail = |e: &dyn crate::frame::ErrorCode| req.error_from(e);

    match admin {
        AdminRequest::Data => {
            let matches = state.store.matches().await.map_err(|e| fail(&e))?;
            let novice = state.store.ai_names(Difficulty::Novice).await.map_err(|e| fail(&e))?;
            let expert = state.store.ai_names(Difficulty::Expert).await.map_err(|e| fail(&e))?;
            let dictionaries = state.dictionaries.list().await;
            Ok(Outcome::Reply(object(json!({
                "matches": matches,
                "dictionaries": dictionaries,
                "ai_names": { "novice": novice, "expert": expert },
            }))))
        }
        AdminRequest::Reset(part) => {
            info!(?part, "ws: admin reset");
            match part {
                ResetPart::History => {
                    state.store.reset(StorePart::History).await.map_err(|e| fail(&e))?;
                    Ok(Outcome::ReplyAndBroadcast {
                        reply: Data::new(),
                        broadcast: ServerEvent::Matches(Vec::new()).into_frame(),
                    })
                }
                ResetPart::Scores => {
                    state.store.reset(StorePart::Scores).await.map_err(|e| fail(&e))?;
                    Ok(Outcome::Done)
                }
                ResetPart::AiNames => {
                    state.store.reset(StorePart::AiNames).await.map_err(|e| fail(&e))?;
                    Ok(Outcome::Done)
                }
                ResetPart::Dictionaries => {
                    let removed = state.dictionaries.reset().await.map_err(|e| fail(&e))?;
                    lobby::switch_dictionary(state, &removed).await;
                    Ok(Outcome::Reply(object(json!({ "removed": removed }))))
                }
            }
        }
        AdminRequest::AddAiName { name, difficulty } => {
            state.store.add_ai_name(name.trim(), difficulty).await.map_err(|e| fail(&e))?;
            Ok(Outcome::Done)
        }
        AdminRequest::RenameAiName { name, new_name } => {
            state.store.rename_ai_name(&name, new_name.trim()).await.map_err(|e| fail(&e))?;
            Ok(Outcome::Done)
        }
        AdminRequest::DeleteAiName { name } => {
            state.store.delete_ai_name(&name).await.map_err(|e| fail(&e))?;
            Ok(Outcome::Done)
        }
        AdminRequest::AddDictionary(file) => {
            let info = state.dictionaries.add(file).await.map_err(|e| fail(&e))?;
            Ok(Outcome::Reply(object(json!({ "dictionary": info }))))
        }
        AdminRequest::UpdateDictionary { title, new_title, description } => {
            let info = state
                .dictionaries
                .update(&title, &new_title, &description)
                .await
                .map_err(|e| fail(&e))?;
            lobby::retitle_dictionary(state, &title, &info.title).await;
            Ok(Outcome::Reply(object(json!({ "dictionary": info }))))
        }
        AdminRequest::DeleteDictionary { title } => {
            state.dictionaries.delete(&title).await.map_err(|e| fail(&e))?;
            lobby::switch_dictionary(state, &[title]).await;
            Ok(Outcome::Done)
        }
        AdminRequest::DownloadDictionary { title } => {
            let file = state.dictionaries.download(&title).await.map_err(|e| fail(&e))?;
            Ok(Outcome::Reply(object(json!(file))))
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn identity(id: Uuid, name: &str) -> Data {
    object(json!({ "participant_id": id, "name": name }))
}

/// Room list and match history for a freshly bound participant.
async fn greet(state: &AppState, participant: Uuid) {
    let rooms = lobby::list_rooms(state).await;
    state.send_to(participant, ServerEvent::RoomList(rooms).into_frame()).await;
    match state.store.matches().await {
        Ok(matches) => state.send_to(participant, ServerEvent::Matches(matches).into_frame()).await,
        Err(e) => warn!(participant_id = %participant, error = %e, "ws: match history unavailable"),
    }
}

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), ()> {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize frame");
            return Err(());
        }
    };
    let is_timer = frame.syscall == "game:timer";
    if frame.status == crate::frame::Status::Error {
        let code = frame.data.get("code").and_then(|v| v.as_str()).unwrap_or("-");
        let message = frame.data.get("message").and_then(|v| v.as_str()).unwrap_or("-");
        warn!(id = %frame.id, syscall = %frame.syscall, code, message, "ws: send frame status=Error");
    } else if !is_timer {
        info!(id = %frame.id, syscall = %frame.syscall, status = ?frame.status, "ws: send frame");
    }
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
