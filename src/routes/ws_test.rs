use super::*;
use crate::frame::Status;
use crate::state::test_helpers;
use futures::{SinkExt, StreamExt};
use tokio::time::{Duration, timeout};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

fn connection() -> (Connection, mpsc::Receiver<Frame>) {
    let (tx, rx) = mpsc::channel(256);
    (Connection { id: Uuid::new_v4(), participant: None, tx }, rx)
}

fn request(syscall: &str, data: serde_json::Value) -> Frame {
    Frame::request(syscall, object(data))
}

async fn send(state: &AppState, conn: &mut Connection, req: &Frame) -> Frame {
    let text = serde_json::to_string(req).expect("frame serializes");
    let mut frames = process_inbound_text(state, conn, &text).await;
    assert_eq!(frames.len(), 1, "expected exactly one reply");
    frames.remove(0)
}

async fn frame_with(rx: &mut mpsc::Receiver<Frame>, syscall: &str) -> Frame {
    loop {
        let frame = timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("frame receive timed out")
            .expect("channel closed");
        if frame.syscall == syscall {
            return frame;
        }
    }
}

async fn registered(state: &AppState, name: &str) -> (Connection, mpsc::Receiver<Frame>) {
    let (mut conn, rx) = connection();
    let reply = send(state, &mut conn, &request("user:register", json!({ "name": name }))).await;
    assert_eq!(reply.status, Status::Done, "register failed: {:?}", reply.data);
    (conn, rx)
}

// =============================================================================
// DISPATCH
// =============================================================================

#[tokio::test]
async fn invalid_json_returns_gateway_error() {
    let state = test_helpers::test_app_state().await;
    let (mut conn, _rx) = connection();

    let frames = process_inbound_text(&state, &mut conn, "{not json").await;

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].syscall, "gateway:error");
    assert!(frames[0].data["message"].as_str().unwrap().starts_with("invalid json"));
}

#[tokio::test]
async fn unknown_syscall_is_answered_with_an_error_frame() {
    let state = test_helpers::test_app_state().await;
    let (mut conn, _rx) = connection();
    let req = request("board:join", json!({}));

    let reply = send(&state, &mut conn, &req).await;

    assert_eq!(reply.status, Status::Error);
    assert_eq!(reply.parent_id, Some(req.id));
    assert_eq!(reply.data["code"], "E_UNKNOWN_SYSCALL");
}

#[tokio::test]
async fn room_requests_need_a_registered_name() {
    let state = test_helpers::test_app_state().await;
    let (mut conn, _rx) = connection();

    let reply = send(&state, &mut conn, &request("room:create", json!({ "name": "den" }))).await;

    assert_eq!(reply.status, Status::Error);
    assert_eq!(reply.data["code"], "E_NOT_REGISTERED");
}

#[tokio::test]
async fn register_replies_with_identity_and_pushes_the_lobby() {
    let state = test_helpers::test_app_state().await;
    let (mut conn, mut rx) = connection();

    let reply = send(&state, &mut conn, &request("user:register", json!({ "name": "ann" }))).await;

    assert_eq!(reply.status, Status::Done);
    assert_eq!(reply.data["name"], "ann");
    let id: Uuid = reply.data["participant_id"].as_str().unwrap().parse().unwrap();
    assert_eq!(conn.participant, Some(id));
    frame_with(&mut rx, "room:list").await;
    frame_with(&mut rx, "matches:list").await;

    let again = send(&state, &mut conn, &request("user:register", json!({ "name": "bob" }))).await;
    assert_eq!(again.data["code"], "E_ALREADY_REGISTERED");
}

#[tokio::test]
async fn resume_rebinds_a_disconnected_identity() {
    let state = test_helpers::test_app_state().await;
    let (conn, _rx) = registered(&state, "ann").await;
    let id = conn.participant.unwrap();
    lobby::disconnect(&state, id, conn.id).await;

    let (mut fresh, mut rx) = connection();
    let reply = send(&state, &mut fresh, &request("user:resume", json!({ "participant_id": id }))).await;

    assert_eq!(reply.status, Status::Done);
    assert_eq!(reply.data["name"], "ann");
    assert_eq!(fresh.participant, Some(id));
    frame_with(&mut rx, "room:list").await;
}

#[tokio::test]
async fn resume_of_a_live_identity_is_refused() {
    let state = test_helpers::test_app_state().await;
    let (conn, _rx) = registered(&state, "ann").await;
    let id = conn.participant.unwrap();

    let (mut intruder, _intruder_rx) = connection();
    let reply = send(&state, &mut intruder, &request("user:resume", json!({ "participant_id": id }))).await;

    assert_eq!(reply.status, Status::Error);
    assert_eq!(reply.data["code"], "E_STILL_CONNECTED");
    assert_eq!(intruder.participant, None);
}

#[tokio::test]
async fn two_players_meet_and_start_a_game() {
    let state = test_helpers::test_app_state().await;
    let (mut ann, mut ann_rx) = registered(&state, "ann").await;
    let (mut bob, mut bob_rx) = registered(&state, "bob").await;

    let created = send(&state, &mut ann, &request("room:create", json!({ "name": "den", "mode": "classic" }))).await;
    assert_eq!(created.data["room"]["status"], "waiting");

    let joined = send(&state, &mut bob, &request("room:join", json!({ "room": "den" }))).await;
    assert_eq!(joined.status, Status::Done);
    let ask = frame_with(&mut ann_rx, "room:join_request").await;
    let guest_id = ask.data["guest_id"].clone();

    let accepted = send(&state, &mut ann, &request("room:accept", json!({ "guest_id": guest_id }))).await;
    assert_eq!(accepted.status, Status::Done);
    frame_with(&mut ann_rx, "game:started").await;
    frame_with(&mut bob_rx, "game:started").await;

    let board = send(&state, &mut bob, &request("game:board", json!({}))).await;
    assert_eq!(board.data["rows"].as_array().unwrap().len(), 15);
}

#[tokio::test]
async fn room_errors_reach_the_sender() {
    let state = test_helpers::test_app_state().await;
    let (mut ann, _ann_rx) = registered(&state, "ann").await;

    let reply = send(&state, &mut ann, &request("room:join", json!({ "room": "nowhere" }))).await;

    assert_eq!(reply.status, Status::Error);
    assert_eq!(reply.data["code"], "E_ROOM_NOT_FOUND");
}

#[tokio::test]
async fn scores_and_matches_are_readable_without_a_name() {
    let state = test_helpers::test_app_state().await;
    let (mut conn, _rx) = connection();

    let scores = send(&state, &mut conn, &request("scores:list", json!({ "mode": "objectives" }))).await;
    assert_eq!(scores.status, Status::Done);
    assert_eq!(scores.data["mode"], "objectives");
    assert!(scores.data["scores"].is_array());

    let matches = send(&state, &mut conn, &request("matches:list", json!({}))).await;
    assert_eq!(matches.data["matches"], json!([]));
}

// =============================================================================
// ADMIN
// =============================================================================

#[tokio::test]
async fn admin_ai_names_show_up_in_admin_data() {
    let state = test_helpers::test_app_state().await;
    let (mut conn, _rx) = connection();

    let added = send(&state, &mut conn, &request("admin:ai_name:add", json!({ "name": "Hal", "difficulty": "expert" }))).await;
    assert_eq!(added.status, Status::Done);

    let data = send(&state, &mut conn, &request("admin:data", json!({}))).await;
    let expert = data.data["ai_names"]["expert"].as_array().unwrap();
    assert!(expert.contains(&json!("Hal")));
    assert_eq!(data.data["dictionaries"][0]["title"], "Test Words");
}

#[tokio::test]
async fn admin_dictionary_round_trip() {
    let state = test_helpers::test_app_state().await;
    let (mut conn, _rx) = connection();

    let added = send(
        &state,
        &mut conn,
        &request("admin:dict:add", json!({ "title": "Animals", "description": "beasts", "words": ["cat", "gnu"] })),
    )
    .await;
    assert_eq!(added.data["dictionary"]["title"], "Animals");

    let renamed = send(
        &state,
        &mut conn,
        &request("admin:dict:update", json!({ "title": "Animals", "new_title": "Beasts", "description": "zoo" })),
    )
    .await;
    assert_eq!(renamed.data["dictionary"]["title"], "Beasts");

    let download = send(&state, &mut conn, &request("admin:dict:download", json!({ "title": "Beasts" }))).await;
    assert_eq!(download.data["description"], "zoo");
    assert_eq!(download.data["words"].as_array().unwrap().len(), 2);

    let deleted = send(&state, &mut conn, &request("admin:dict:delete", json!({ "title": "Beasts" }))).await;
    assert_eq!(deleted.status, Status::Done);
    let refused = send(&state, &mut conn, &request("admin:dict:delete", json!({ "title": "Test Words" }))).await;
    assert_eq!(refused.data["code"], "E_DICTIONARY_DEFAULT");
}

#[tokio::test]
async fn deleting_a_dictionary_in_use_switches_the_room() {
    let state = test_helpers::test_app_state().await;
    let (mut ann, mut ann_rx) = registered(&state, "ann").await;
    let (mut admin, _admin_rx) = connection();
    send(&state, &mut admin, &request("admin:dict:add", json!({ "title": "Animals", "words": ["cat"] }))).await;
    send(&state, &mut ann, &request("room:create", json!({ "name": "den", "dictionary": "Animals" }))).await;

    send(&state, &mut admin, &request("admin:dict:delete", json!({ "title": "Animals" }))).await;

    let switched = frame_with(&mut ann_rx, "room:dictionary").await;
    assert_eq!(switched.data["dictionary"], "Test Words");
}

#[tokio::test]
async fn history_reset_is_broadcast() {
    let state = test_helpers::test_app_state().await;
    let (_ann, mut ann_rx) = registered(&state, "ann").await;
    frame_with(&mut ann_rx, "matches:list").await;
    let (mut admin, _admin_rx) = connection();

    let reply = send(&state, &mut admin, &request("admin:reset", json!({ "part": "history" }))).await;

    assert_eq!(reply.status, Status::Done);
    let pushed = frame_with(&mut ann_rx, "matches:list").await;
    assert_eq!(pushed.data["matches"], json!([]));
}

// =============================================================================
// TRANSPORT
// =============================================================================

async fn next_frame<S>(stream: &mut S) -> Frame
where
    S: futures::Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let msg = timeout(Duration::from_secs(2), stream.next())
            .await
            .expect("websocket receive timed out")
            .expect("websocket closed")
            .expect("websocket error");
        if let WsMessage::Text(text) = msg {
            return serde_json::from_str(&text).expect("server frames are json");
        }
    }
}

#[tokio::test]
async fn websocket_round_trip_through_the_router() {
    let state = test_helpers::test_app_state().await;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, crate::routes::app(state)).await;
    });

    let (mut stream, _) = connect_async(format!("ws://{addr}/api/ws")).await.expect("websocket handshake");

    let welcome = next_frame(&mut stream).await;
    assert_eq!(welcome.syscall, "session:connected");
    assert!(welcome.data.contains_key("connection_id"));

    let req = request("user:register", json!({ "name": "ann" }));
    stream
        .send(WsMessage::Text(serde_json::to_string(&req).unwrap().into()))
        .await
        .unwrap();

    loop {
        let frame = next_frame(&mut stream).await;
        if frame.parent_id == Some(req.id) {
            assert_eq!(frame.status, Status::Done);
            assert_eq!(frame.data["name"], "ann");
            break;
        }
    }
}
