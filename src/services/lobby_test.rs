use super::*;
use crate::game::GameMode;
use crate::game::dictionary::DictionaryFile;
use crate::state::test_helpers::{connection_of, seed_participant, test_app_state};
use tokio::time::{Duration, sleep, timeout};

fn settings(name: &str) -> RoomSettings {
    RoomSettings {
        name: name.into(),
        turn_seconds: None,
        mode: GameMode::Classic,
        difficulty: Difficulty::Novice,
        dictionary: None,
    }
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

async fn wait_for_room_gone(state: &AppState, name: &str) {
    for _ in 0..100 {
        if !state.rooms.read().await.contains_key(name) {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("room {name} still open");
}

async fn status_of(state: &AppState, name: &str) -> Option<RoomStatus> {
    state.rooms.read().await.get(name).map(|r| r.summary.status)
}

// =============================================================================
// IDENTITY
// =============================================================================

#[tokio::test]
async fn names_are_unique_ignoring_case() {
    let state = test_app_state().await;
    let (tx, _rx) = mpsc::channel(8);

    let id = register(&state, Uuid::new_v4(), tx.clone(), " Ann ").await.unwrap();
    assert_eq!(state.participants.read().await[&id].name, "Ann");

    let err = register(&state, Uuid::new_v4(), tx.clone(), "ann").await.unwrap_err();
    assert!(matches!(err, LobbyError::NameTaken));
    assert_eq!(err.error_code(), "E_NAME_TAKEN");
}

#[tokio::test]
async fn blank_and_overlong_names_are_invalid() {
    let state = test_app_state().await;
    let (tx, _rx) = mpsc::channel(8);
    assert!(matches!(register(&state, Uuid::new_v4(), tx.clone(), "   ").await, Err(LobbyError::NameInvalid)));
    assert!(matches!(register(&state, Uuid::new_v4(), tx, &"x".repeat(MAX_NAME_LEN + 1)).await, Err(LobbyError::NameInvalid)));
}

#[test]
fn ai_names_avoid_the_human_name() {
    let mut rng = StdRng::seed_from_u64(1);
    let pool = vec!["Ann".to_owned(), "Hal".to_owned()];
    assert_eq!(pick_ai_name(&pool, "ann", &mut rng), "Hal");
    assert_eq!(pick_ai_name(&pool[..1], "ann", &mut rng), FALLBACK_AI_NAME);
    assert_eq!(pick_ai_name(&[], "ann", &mut rng), FALLBACK_AI_NAME);
}

// =============================================================================
// WAITING ROOMS
// =============================================================================

#[tokio::test]
async fn created_room_is_listed_with_clamped_settings() {
    let state = test_app_state().await;
    let (ann, mut ann_rx) = seed_participant(&state, "ann").await;

    let mut request = settings("den");
    request.turn_seconds = Some(5);
    let summary = create_room(&state, ann, request).await.unwrap();

    assert_eq!(summary.turn_seconds, state.config.turn_seconds_min);
    assert_eq!(summary.dictionary, "Test Words");
    assert_eq!(summary.status, RoomStatus::Waiting);
    assert_eq!(summary.players, vec!["ann".to_owned()]);
    assert_eq!(state.participants.read().await[&ann].room.as_deref(), Some("den"));

    let list = frame_with(&mut ann_rx, "room:list").await;
    assert_eq!(list.data["rooms"][0]["name"], "den");
}

#[tokio::test]
async fn room_names_and_hosts_are_exclusive() {
    let state = test_app_state().await;
    let (ann, _ann_rx) = seed_participant(&state, "ann").await;
    let (bob, _bob_rx) = seed_participant(&state, "bob").await;
    create_room(&state, ann, settings("den")).await.unwrap();

    assert!(matches!(create_room(&state, bob, settings("den")).await, Err(LobbyError::RoomNameTaken)));
    assert!(matches!(create_room(&state, ann, settings("loft")).await, Err(LobbyError::AlreadyInRoom)));
}

#[tokio::test]
async fn unknown_dictionary_is_refused() {
    let state = test_app_state().await;
    let (ann, _ann_rx) = seed_participant(&state, "ann").await;
    let mut request = settings("den");
    request.dictionary = Some("Klingon".into());

    let err = create_room(&state, ann, request).await.unwrap_err();
    assert_eq!(err.error_code(), "E_DICTIONARY_NOT_FOUND");
    assert!(state.rooms.read().await.is_empty());
}

#[tokio::test]
async fn join_requests_reach_the_host() {
    let state = test_app_state().await;
    let (ann, mut ann_rx) = seed_participant(&state, "ann").await;
    let (bob, _bob_rx) = seed_participant(&state, "bob").await;
    create_room(&state, ann, settings("den")).await.unwrap();

    join_room(&state, bob, "den").await.unwrap();

    let request = frame_with(&mut ann_rx, "room:join_request").await;
    assert_eq!(request.data["guest_name"], "bob");
    assert_eq!(request.data["guest_id"], bob.to_string());
    assert_eq!(state.rooms.read().await["den"].pending, vec![bob]);
}

#[tokio::test]
async fn joining_requires_a_waiting_room() {
    let state = test_app_state().await;
    let (ann, _ann_rx) = seed_participant(&state, "ann").await;
    let (bob, _bob_rx) = seed_participant(&state, "bob").await;

    assert!(matches!(join_room(&state, bob, "den").await, Err(LobbyError::RoomNotFound)));

    create_room(&state, ann, settings("den")).await.unwrap();
    start_solo(&state, ann).await.unwrap();
    assert!(matches!(join_room(&state, bob, "den").await, Err(LobbyError::RoomNotWaiting)));
}

#[tokio::test]
async fn guests_can_withdraw_their_request() {
    let state = test_app_state().await;
    let (ann, mut ann_rx) = seed_participant(&state, "ann").await;
    let (bob, _bob_rx) = seed_participant(&state, "bob").await;
    create_room(&state, ann, settings("den")).await.unwrap();
    join_room(&state, bob, "den").await.unwrap();

    cancel_join(&state, bob).await.unwrap();

    frame_with(&mut ann_rx, "room:join_cancelled").await;
    assert!(state.rooms.read().await["den"].pending.is_empty());
    assert!(matches!(cancel_join(&state, bob).await, Err(LobbyError::NoPendingJoin)));
}

#[tokio::test]
async fn rejected_guest_is_told() {
    let state = test_app_state().await;
    let (ann, _ann_rx) = seed_participant(&state, "ann").await;
    let (bob, mut bob_rx) = seed_participant(&state, "bob").await;
    create_room(&state, ann, settings("den")).await.unwrap();
    join_room(&state, bob, "den").await.unwrap();

    reject(&state, ann, bob).await.unwrap();

    frame_with(&mut bob_rx, "room:rejected").await;
    assert!(state.participants.read().await[&bob].pending_join.is_none());
    assert!(matches!(reject(&state, ann, bob).await, Err(LobbyError::GuestNotFound)));
}

#[tokio::test]
async fn deleting_a_room_notifies_pending_guests() {
    let state = test_app_state().await;
    let (ann, _ann_rx) = seed_participant(&state, "ann").await;
    let (bob, mut bob_rx) = seed_participant(&state, "bob").await;
    create_room(&state, ann, settings("den")).await.unwrap();
    join_room(&state, bob, "den").await.unwrap();

    assert!(matches!(delete_room(&state, bob).await, Err(LobbyError::NotInRoom)));
    delete_room(&state, ann).await.unwrap();

    frame_with(&mut bob_rx, "room:deleted").await;
    assert!(state.rooms.read().await.is_empty());
    assert!(state.participants.read().await[&ann].room.is_none());
    assert!(state.participants.read().await[&bob].pending_join.is_none());
}

// =============================================================================
// STARTING GAMES
// =============================================================================

#[tokio::test]
async fn accepting_a_guest_starts_the_game_and_turns_away_the_rest() {
    let state = test_app_state().await;
    let (ann, mut ann_rx) = seed_participant(&state, "ann").await;
    let (bob, mut bob_rx) = seed_participant(&state, "bob").await;
    let (cid, mut cid_rx) = seed_participant(&state, "cid").await;
    create_room(&state, ann, settings("den")).await.unwrap();
    join_room(&state, bob, "den").await.unwrap();
    join_room(&state, cid, "den").await.unwrap();

    accept(&state, ann, bob).await.unwrap();

    frame_with(&mut cid_rx, "room:rejected").await;
    frame_with(&mut ann_rx, "game:started").await;
    let started = frame_with(&mut bob_rx, "game:started").await;
    assert_eq!(started.data["players"], serde_json::json!(["ann", "bob"]));

    assert_eq!(status_of(&state, "den").await, Some(RoomStatus::Playing));
    let participants = state.participants.read().await;
    assert_eq!(participants[&bob].room.as_deref(), Some("den"));
    assert!(participants[&cid].pending_join.is_none());
}

#[tokio::test]
async fn only_the_host_can_accept() {
    let state = test_app_state().await;
    let (ann, _ann_rx) = seed_participant(&state, "ann").await;
    let (bob, _bob_rx) = seed_participant(&state, "bob").await;
    create_room(&state, ann, settings("den")).await.unwrap();
    join_room(&state, bob, "den").await.unwrap();

    assert!(matches!(accept(&state, bob, ann).await, Err(LobbyError::NotInRoom)));
    assert!(matches!(accept(&state, ann, Uuid::new_v4()).await, Err(LobbyError::GuestNotFound)));
}

#[tokio::test]
async fn solo_game_seats_a_named_ai() {
    let state = test_app_state().await;
    let (ann, mut ann_rx) = seed_participant(&state, "ann").await;
    create_room(&state, ann, settings("den")).await.unwrap();

    start_solo(&state, ann).await.unwrap();

    let started = frame_with(&mut ann_rx, "game:started").await;
    let ai_name = started.data["players"][1].as_str().unwrap().to_owned();
    let novice = state.store.ai_names(Difficulty::Novice).await.unwrap();
    assert!(novice.contains(&ai_name));
    assert_eq!(state.rooms.read().await["den"].summary.players[1], ai_name);
}

// =============================================================================
// PLAYING
// =============================================================================

#[tokio::test]
async fn actions_are_forwarded_to_the_running_game() {
    let state = test_app_state().await;
    let (ann, _ann_rx) = seed_participant(&state, "ann").await;
    create_room(&state, ann, settings("den")).await.unwrap();

    assert!(matches!(play(&state, ann, GameAction::Board).await, Err(LobbyError::GameNotStarted)));

    start_solo(&state, ann).await.unwrap();
    let data = play(&state, ann, GameAction::Board).await.unwrap();
    assert_eq!(data["rows"].as_array().unwrap().len(), 15);
}

#[tokio::test]
async fn actions_need_a_room() {
    let state = test_app_state().await;
    let (ann, _ann_rx) = seed_participant(&state, "ann").await;
    assert!(matches!(play(&state, ann, GameAction::Pass).await, Err(LobbyError::NotInRoom)));
    assert!(matches!(play(&state, Uuid::new_v4(), GameAction::Pass).await, Err(LobbyError::NotRegistered)));
}

#[tokio::test]
async fn room_errors_pass_through_with_their_code() {
    let state = test_app_state().await;
    let (ann, _ann_rx) = seed_participant(&state, "ann").await;
    create_room(&state, ann, settings("den")).await.unwrap();
    start_solo(&state, ann).await.unwrap();

    let err = play(&state, ann, GameAction::Message("!dance".into())).await.unwrap_err();
    assert_eq!(err.error_code(), "E_UNKNOWN_COMMAND");
}

#[tokio::test]
async fn abandoning_a_solo_game_archives_it() {
    let state = test_app_state().await;
    let (ann, _ann_rx) = seed_participant(&state, "ann").await;
    create_room(&state, ann, settings("den")).await.unwrap();
    start_solo(&state, ann).await.unwrap();

    abandon(&state, ann).await.unwrap();
    wait_for_room_gone(&state, "den").await;

    let matches = state.store.matches().await.unwrap();
    assert_eq!(matches.len(), 1);
    assert!(matches[0].abandoned);
    assert!(state.participants.read().await[&ann].room.is_none());
}

#[tokio::test]
async fn abandoning_a_waiting_room_deletes_it() {
    let state = test_app_state().await;
    let (ann, _ann_rx) = seed_participant(&state, "ann").await;
    create_room(&state, ann, settings("den")).await.unwrap();

    abandon(&state, ann).await.unwrap();

    assert!(state.rooms.read().await.is_empty());
}

// =============================================================================
// DISCONNECTS
// =============================================================================

#[tokio::test]
async fn resume_inside_the_grace_window_keeps_the_identity() {
    let state = test_app_state().await;
    let (ann, _ann_rx) = seed_participant(&state, "ann").await;
    create_room(&state, ann, settings("den")).await.unwrap();

    disconnect(&state, ann, connection_of(&state, ann).await).await;
    assert!(state.participants.read().await[&ann].tx.is_none());

    let (tx, _rx) = mpsc::channel(8);
    assert_eq!(resume(&state, ann, Uuid::new_v4(), tx).await.unwrap(), "ann");
    sleep(state.config.disconnect_grace * 3).await;

    assert!(state.participants.read().await.contains_key(&ann));
    assert!(state.rooms.read().await.contains_key("den"));
}

#[tokio::test]
async fn resume_is_refused_while_the_identity_is_connected() {
    let state = test_app_state().await;
    let (ann, _ann_rx) = seed_participant(&state, "ann").await;
    let original = connection_of(&state, ann).await;

    let (tx, _rx) = mpsc::channel(8);
    let err = resume(&state, ann, Uuid::new_v4(), tx).await.unwrap_err();

    assert!(matches!(err, LobbyError::StillConnected));
    assert_eq!(err.error_code(), "E_STILL_CONNECTED");
    assert_eq!(connection_of(&state, ann).await, original);
    assert!(state.participants.read().await[&ann].tx.is_some());
}

#[tokio::test]
async fn late_close_of_a_replaced_connection_is_ignored() {
    let state = test_app_state().await;
    let (ann, _ann_rx) = seed_participant(&state, "ann").await;
    create_room(&state, ann, settings("den")).await.unwrap();
    let old = connection_of(&state, ann).await;
    disconnect(&state, ann, old).await;

    let fresh = Uuid::new_v4();
    let (tx, _rx) = mpsc::channel(8);
    resume(&state, ann, fresh, tx).await.unwrap();
    disconnect(&state, ann, old).await;
    sleep(state.config.disconnect_grace * 3).await;

    let participants = state.participants.read().await;
    assert_eq!(participants[&ann].connection, fresh);
    assert!(participants[&ann].tx.is_some());
    drop(participants);
    assert!(state.pending_disconnects.lock().await.is_empty());
    assert!(state.rooms.read().await.contains_key("den"));
}

async fn seat_in_dead_room(state: &AppState, participant: Uuid, name: &str) {
    let (actor, rx) = mpsc::channel(1);
    drop(rx);
    let mut summary = create_room(state, participant, settings(name)).await.unwrap();
    summary.status = RoomStatus::Playing;
    let mut rooms = state.rooms.write().await;
    let handle = rooms.get_mut(name).expect("room just created");
    handle.summary = summary;
    handle.actor = Some(actor);
}

#[tokio::test]
async fn resume_survives_a_room_actor_that_is_gone() {
    let state = test_app_state().await;
    let (ann, _ann_rx) = seed_participant(&state, "ann").await;
    seat_in_dead_room(&state, ann, "den").await;
    disconnect(&state, ann, connection_of(&state, ann).await).await;

    let (tx, _rx) = mpsc::channel(8);
    assert_eq!(resume(&state, ann, Uuid::new_v4(), tx).await.unwrap(), "ann");
}

#[tokio::test]
async fn expiry_with_a_dead_room_actor_still_removes_the_participant() {
    let state = test_app_state().await;
    let (ann, _ann_rx) = seed_participant(&state, "ann").await;
    seat_in_dead_room(&state, ann, "den").await;

    disconnect(&state, ann, connection_of(&state, ann).await).await;
    sleep(state.config.disconnect_grace * 3).await;

    assert!(!state.participants.read().await.contains_key(&ann));
}

#[tokio::test]
async fn expired_host_loses_the_waiting_room() {
    let state = test_app_state().await;
    let (ann, _ann_rx) = seed_participant(&state, "ann").await;
    create_room(&state, ann, settings("den")).await.unwrap();

    disconnect(&state, ann, connection_of(&state, ann).await).await;
    wait_for_room_gone(&state, "den").await;

    assert!(!state.participants.read().await.contains_key(&ann));
    let (tx, _rx) = mpsc::channel(8);
    assert!(matches!(resume(&state, ann, Uuid::new_v4(), tx).await, Err(LobbyError::ParticipantNotFound)));
}

#[tokio::test]
async fn expired_player_is_replaced_by_an_ai() {
    let state = test_app_state().await;
    let (ann, mut ann_rx) = seed_participant(&state, "ann").await;
    let (bob, _bob_rx) = seed_participant(&state, "bob").await;
    create_room(&state, ann, settings("den")).await.unwrap();
    join_room(&state, bob, "den").await.unwrap();
    accept(&state, ann, bob).await.unwrap();
    frame_with(&mut ann_rx, "game:opponent").await;

    disconnect(&state, bob, connection_of(&state, bob).await).await;

    let opponent = frame_with(&mut ann_rx, "game:opponent").await;
    assert_ne!(opponent.data["name"], "bob");
    assert_eq!(status_of(&state, "den").await, Some(RoomStatus::Playing));
}

#[tokio::test]
async fn disconnect_withdraws_a_pending_join() {
    let state = test_app_state().await;
    let (ann, mut ann_rx) = seed_participant(&state, "ann").await;
    let (bob, _bob_rx) = seed_participant(&state, "bob").await;
    create_room(&state, ann, settings("den")).await.unwrap();
    join_room(&state, bob, "den").await.unwrap();

    disconnect(&state, bob, connection_of(&state, bob).await).await;

    frame_with(&mut ann_rx, "room:join_cancelled").await;
    assert!(state.rooms.read().await["den"].pending.is_empty());
}

// =============================================================================
// DICTIONARIES
// =============================================================================

#[tokio::test]
async fn deleted_dictionary_moves_waiting_rooms_to_the_default() {
    let state = test_app_state().await;
    let (ann, mut ann_rx) = seed_participant(&state, "ann").await;
    state
        .dictionaries
        .add(DictionaryFile { title: "Animals".into(), description: String::new(), words: vec!["cat".into()] })
        .await
        .unwrap();
    let mut request = settings("den");
    request.dictionary = Some("Animals".into());
    create_room(&state, ann, request).await.unwrap();

    state.dictionaries.delete("Animals").await.unwrap();
    switch_dictionary(&state, &["Animals".to_owned()]).await;

    let switched = frame_with(&mut ann_rx, "room:dictionary").await;
    assert_eq!(switched.data["dictionary"], "Test Words");
    assert_eq!(state.rooms.read().await["den"].summary.dictionary, "Test Words");
}
