//! Room actor — one running game.
//!
//! DESIGN
//! ======
//! Each started game is owned by a single tokio task that drains a bounded
//! queue of `RoomCommand`s. The board, bag, racks, scores, objectives, and
//! turn state live inside that task and nowhere else, so commands for one
//! room are strictly serialized while rooms run in parallel.
//!
//! Everything time-based posts back into the same queue:
//!
//! - `TurnTimer` ticks once per `config.tick` with the turn's generation.
//!   It is replaced on every handoff and aborted on drop.
//! - AI think delays, AI pass delays, and rejected-placement board refreshes
//!   are one-shot sleeps.
//!
//! Every handoff bumps `generation`, so a tick or AI wake-up that was
//! already queued for an earlier turn is ignored.
//!
//! SEATS
//! =====
//! Seat 0 is the host, seat 1 the guest or the AI. A seat is either a human
//! with a connection handle or an AI with a difficulty; turn handling is the
//! same for both and only the move source differs. When a human departs a
//! two-human game the seat is handed to an AI and the game continues solo.
//! When the only human departs a solo game, the match is recorded as
//! abandoned and the room closes.
//!
//! ERROR HANDLING
//! ==============
//! Rule, turn, and syntax violations return a `RoomError` to the acting
//! participant and leave the game untouched. Store failures during end-of-game
//! bookkeeping are logged and never block the room.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use rand::prelude::*;
use time::OffsetDateTime;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use uuid::Uuid;

use crate::frame::{Data, ErrorCode, Frame};
use crate::game::ai::{self, AiAction};
use crate::game::bag::LetterBag;
use crate::game::board::{BOARD_LENGTH, Board, Placement, PlacementError};
use crate::game::commands::{self, Command, CommandError};
use crate::game::dictionary::Dictionary;
use crate::game::objectives::{Completion, ObjectiveTracker};
use crate::game::rack::{RACK_LENGTH, Rack, RackError, Wanted};
use crate::game::tile::Tile;
use crate::game::{Difficulty, GameMode, MAX_TURNS_SKIPPED, Standing, leftover_summary, settle_scores};
use crate::protocol::{GameAction, ServerEvent};
use crate::services::lobby;
use crate::services::persistence::MatchRecord;
use crate::state::{AppState, RoomStatus, log_dropped};

const ROOM_QUEUE_CAPACITY: usize = 64;

// =============================================================================
// COMMANDS / ERRORS
// =============================================================================

pub enum RoomCommand {
    /// A participant's move or query. The result answers their request frame.
    Play { participant: Uuid, action: GameAction, reply: oneshot::Sender<Result<Data, RoomError>> },
    Tick { generation: u64 },
    AiTurn { generation: u64 },
    AiPass { generation: u64 },
    RefreshBoard,
    /// Abandon or expired disconnect.
    Depart { participant: Uuid },
    /// Leave a finished game.
    Leave { participant: Uuid },
    /// A resumed participant's new connection.
    Rejoin { participant: Uuid, tx: mpsc::Sender<Frame> },
}

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("it is not your turn")]
    NotYourTurn,
    #[error("the game is over")]
    GameOver,
    #[error("you are not playing in this room")]
    NotSeated,
    #[error("the bag must hold at least 7 letters to exchange")]
    BagTooSmall,
    #[error("messages are limited to {0} characters")]
    MessageTooLong(usize),
    #[error("the new order must use exactly the letters on your rack")]
    RackOrder,
    #[error(transparent)]
    Placement(#[from] PlacementError),
    #[error(transparent)]
    Rack(#[from] RackError),
    #[error(transparent)]
    Command(#[from] CommandError),
}

impl ErrorCode for RoomError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotYourTurn => "E_NOT_YOUR_TURN",
            Self::GameOver => "E_GAME_OVER",
            Self::NotSeated => "E_NOT_SEATED",
            Self::BagTooSmall => "E_BAG_TOO_SMALL",
            Self::MessageTooLong(_) => "E_MESSAGE_TOO_LONG",
            Self::RackOrder => "E_RACK_ORDER",
            Self::Placement(e) => e.error_code(),
            Self::Rack(e) => e.error_code(),
            Self::Command(e) => e.error_code(),
        }
    }
}

// =============================================================================
// SEATS
// =============================================================================

#[derive(Debug, Clone)]
pub enum Player {
    Human { id: Uuid, tx: Option<mpsc::Sender<Frame>> },
    Ai { difficulty: Difficulty },
}

#[derive(Debug, Clone)]
pub struct Seat {
    pub name: String,
    pub player: Player,
    pub rack: Rack,
    pub score: i32,
    /// Set once a human leaves the finished game.
    left: bool,
}

impl Seat {
    #[must_use]
    pub fn human(id: Uuid, name: impl Into<String>, tx: Option<mpsc::Sender<Frame>>) -> Self {
        Self { name: name.into(), player: Player::Human { id, tx }, rack: Rack::new(), score: 0, left: false }
    }

    #[must_use]
    pub fn ai(name: impl Into<String>, difficulty: Difficulty) -> Self {
        Self { name: name.into(), player: Player::Ai { difficulty }, rack: Rack::new(), score: 0, left: false }
    }

    fn participant(&self) -> Option<Uuid> {
        match &self.player {
            Player::Human { id, .. } => Some(*id),
            Player::Ai { .. } => None,
        }
    }

    fn is_ai(&self) -> bool {
        matches!(self.player, Player::Ai { .. })
    }

    fn is_present_human(&self) -> bool {
        !self.is_ai() && !self.left
    }

    fn send(&self, event: ServerEvent) {
        if self.left {
            return;
        }
        if let Player::Human { id, tx: Some(tx) } = &self.player {
            log_dropped(tx.try_send(event.into_frame()), *id);
        }
    }
}

/// Everything needed to start a game.
pub struct RoomSetup {
    pub name: String,
    pub mode: GameMode,
    pub difficulty: Difficulty,
    pub turn_seconds: u32,
    pub dictionary: Arc<Dictionary>,
    pub seats: [Seat; 2],
    pub seed: u64,
}

// =============================================================================
// TURN TIMER
// =============================================================================

/// Per-turn countdown. Aborted when dropped.
struct TurnTimer {
    handle: JoinHandle<()>,
}

impl TurnTimer {
    fn start(commands: mpsc::Sender<RoomCommand>, generation: u64, tick: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if commands.send(RoomCommand::Tick { generation }).await.is_err() {
                    break;
                }
            }
        });
        Self { handle }
    }
}

impl Drop for TurnTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// =============================================================================
// ROOM
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    InProgress,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassReason {
    Declared,
    Timeout,
}

pub struct Room {
    state: AppState,
    name: String,
    mode: GameMode,
    difficulty: Difficulty,
    turn_seconds: u32,
    dictionary: Arc<Dictionary>,
    board: Board,
    bag: LetterBag,
    seats: [Seat; 2],
    turn: usize,
    first_turn: bool,
    passes: u32,
    phase: Phase,
    objectives: Option<ObjectiveTracker>,
    solo: bool,
    generation: u64,
    remaining: u32,
    timer: Option<TurnTimer>,
    rng: StdRng,
    started_at: OffsetDateTime,
    commands: mpsc::Sender<RoomCommand>,
}

/// Start a game in its own task and return the sender into its queue.
pub fn spawn(state: AppState, setup: RoomSetup) -> mpsc::Sender<RoomCommand> {
    let (tx, rx) = mpsc::channel(ROOM_QUEUE_CAPACITY);
    let mut room = Room::new(state, setup, tx.clone());
    tokio::spawn(async move {
        room.start();
        room.run(rx).await;
    });
    tx
}

impl Room {
    /// Deal racks, pick the first player, and draw objectives.
    fn new(state: AppState, setup: RoomSetup, commands: mpsc::Sender<RoomCommand>) -> Self {
        let RoomSetup { name, mode, difficulty, turn_seconds, dictionary, mut seats, seed } = setup;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut bag = LetterBag::new();
        for seat in &mut seats {
            seat.rack = Rack::from_tiles(bag.draw(RACK_LENGTH, &mut rng));
        }
        let turn = rng.random_range(0..2);
        let objectives = (mode == GameMode::Objectives).then(|| ObjectiveTracker::draw(&mut rng));
        let solo = seats.iter().any(Seat::is_ai);

        Self {
            state,
            name,
            mode,
            difficulty,
            turn_seconds,
            dictionary,
            board: Board::new(),
            bag,
            seats,
            turn,
            first_turn: true,
            passes: 0,
            phase: Phase::InProgress,
            objectives,
            solo,
            generation: 0,
            remaining: turn_seconds,
            timer: None,
            rng,
            started_at: OffsetDateTime::now_utc(),
            commands,
        }
    }

    fn start(&mut self) {
        info!(room = %self.name, players = ?[&self.seats[0].name, &self.seats[1].name], first = %self.seats[self.turn].name, "room: game started");
        for seat in 0..2 {
            self.send_intro(seat);
        }
        self.begin_turn();
    }

    async fn run(mut self, mut rx: mpsc::Receiver<RoomCommand>) {
        while let Some(command) = rx.recv().await {
            if self.handle(command).await.is_break() {
                break;
            }
        }
        info!(room = %self.name, "room: closed");
    }

    async fn handle(&mut self, command: RoomCommand) -> ControlFlow<()> {
        match command {
            RoomCommand::Play { participant, action, reply } => {
                let result = self.play(participant, action).await;
                let _ = reply.send(result);
            }
            RoomCommand::Tick { generation } => self.tick(generation).await,
            RoomCommand::AiTurn { generation } => self.ai_turn(generation).await,
            RoomCommand::AiPass { generation } => {
                if self.is_ai_turn(generation) {
                    self.pass(self.turn, PassReason::Declared).await;
                }
            }
            RoomCommand::RefreshBoard => self.push_board(false),
            RoomCommand::Depart { participant } => return self.depart(participant).await,
            RoomCommand::Leave { participant } => return self.leave(participant).await,
            RoomCommand::Rejoin { participant, tx } => self.rejoin(participant, tx),
        }
        ControlFlow::Continue(())
    }

    fn seat_of(&self, participant: Uuid) -> Option<usize> {
        self.seats.iter().position(|s| s.participant() == Some(participant))
    }

    fn ensure_turn(&self, seat: usize) -> Result<(), RoomError> {
        if self.phase == Phase::GameOver {
            return Err(RoomError::GameOver);
        }
        if seat != self.turn {
            return Err(RoomError::NotYourTurn);
        }
        Ok(())
    }

    fn is_ai_turn(&self, generation: u64) -> bool {
        generation == self.generation && self.phase == Phase::InProgress && self.seats[self.turn].is_ai()
    }
}

// =============================================================================
// PLAY
// =============================================================================

fn lines<S: Into<String>>(lines: impl IntoIterator<Item = S>) -> Data {
    let lines: Vec<String> = lines.into_iter().map(Into::into).collect();
    let mut data = Data::new();
    data.insert("lines".into(), serde_json::json!(lines));
    data
}

impl Room {
    async fn play(&mut self, participant: Uuid, action: GameAction) -> Result<Data, RoomError> {
        let seat = self.seat_of(participant).ok_or(RoomError::NotSeated)?;
        match action {
            GameAction::Place { x, y, orientation, word } => {
                self.place(seat, Placement::new(x, y, orientation, &word)).await
            }
            GameAction::Message(text) => self.message(seat, &text).await,
            GameAction::Exchange(letters) => self.exchange(seat, &letters).await,
            GameAction::Pass => {
                self.ensure_turn(seat)?;
                self.pass(seat, PassReason::Declared).await;
                Ok(Data::new())
            }
            GameAction::RackOrder(letters) => self.rack_order(seat, &letters),
            GameAction::Board => Ok(self.snapshot(seat)),
        }
    }

    /// Turn check, trial preview, validation, rack check, commit, notify.
    async fn place(&mut self, seat: usize, placement: Placement) -> Result<Data, RoomError> {
        self.ensure_turn(seat)?;
        if placement.start.x >= BOARD_LENGTH {
            return Err(PlacementError::ColumnOutOfRange.into());
        }
        if placement.start.y >= BOARD_LENGTH {
            return Err(PlacementError::RowOutOfRange.into());
        }

        let trial = self.board.preview(&placement).rows();
        self.broadcast(|_| ServerEvent::Board { room: self.name.clone(), rows: trial.clone(), trial: true });

        let check = match self.board.validate_placement(&placement, self.first_turn, &self.dictionary) {
            Ok(check) => check,
            Err(e) => {
                self.schedule(RoomCommand::RefreshBoard, self.state.config.board_refresh);
                return Err(e.into());
            }
        };
        let slots = match self.seats[seat].rack.locate(&Wanted::from_placement(&check.new_letters)) {
            Ok(slots) => slots,
            Err(e) => {
                self.schedule(RoomCommand::RefreshBoard, self.state.config.board_refresh);
                return Err(e.into());
            }
        };

        let outcome = self.board.apply_placement(&placement, self.first_turn, &self.dictionary)?;
        let fresh = self.bag.draw(slots.len(), &mut self.rng);
        self.seats[seat].rack.replace(&slots, fresh);
        self.seats[seat].score += i32::try_from(outcome.points).unwrap_or(i32::MAX);
        self.first_turn = false;
        self.passes = 0;

        let name = self.seats[seat].name.clone();
        let word = outcome.check.full_word.clone();
        info!(room = %self.name, player = %name, %word, points = outcome.points, "room: word placed");
        self.send_seat(
            1 - seat,
            ServerEvent::Chat {
                room: self.name.clone(),
                from: None,
                text: format!("{name} placed {word} for {} points", outcome.points),
            },
        );

        if let Some(tracker) = &mut self.objectives {
            let done = tracker.on_placement(seat, &outcome.check);
            self.award(seat, &done);
        }
        self.push_scores();
        self.push_racks();
        self.push_board(false);

        if self.seats[seat].rack.is_empty() && self.bag.is_empty() {
            self.end_game(Some(seat)).await;
        } else {
            self.next_turn();
        }

        let mut data = Data::new();
        data.insert("word".into(), serde_json::json!(word));
        data.insert("points".into(), serde_json::json!(outcome.points));
        Ok(data)
    }

    async fn exchange(&mut self, seat: usize, letters: &str) -> Result<Data, RoomError> {
        self.ensure_turn(seat)?;
        if self.bag.remaining() < RACK_LENGTH {
            return Err(RoomError::BagTooSmall);
        }
        let letters: String = letters.chars().filter(|c| !c.is_whitespace()).collect();
        let wanted = Wanted::from_exchange(&letters);
        if wanted.is_empty() || wanted.len() > RACK_LENGTH {
            return Err(RackError::BadCount.into());
        }
        let slots = self.seats[seat].rack.locate(&wanted)?;

        let discarded: Vec<Tile> = slots.iter().map(|&i| self.seats[seat].rack.tiles()[i]).collect();
        let fresh = self.bag.exchange(discarded, &mut self.rng);
        self.seats[seat].rack.replace(&slots, fresh);
        self.passes = 0;

        let name = self.seats[seat].name.clone();
        self.send_seat(
            1 - seat,
            ServerEvent::Chat { room: self.name.clone(), from: None, text: format!("{name} exchanged {} letters", slots.len()) },
        );
        self.push_racks();
        self.next_turn();

        let mut data = Data::new();
        data.insert("exchanged".into(), serde_json::json!(slots.len()));
        Ok(data)
    }

    async fn pass(&mut self, seat: usize, reason: PassReason) {
        self.passes += 1;
        let name = &self.seats[seat].name;
        let text = match reason {
            PassReason::Declared => format!("{name} passed"),
            PassReason::Timeout => format!("{name} ran out of time"),
        };
        self.broadcast(|_| ServerEvent::Chat { room: self.name.clone(), from: None, text: text.clone() });

        if self.passes >= MAX_TURNS_SKIPPED {
            self.end_game(None).await;
        } else {
            self.next_turn();
        }
    }

    /// Chat line, or a `!` command.
    async fn message(&mut self, seat: usize, text: &str) -> Result<Data, RoomError> {
        let limit = self.state.config.max_message_len;
        if text.chars().count() > limit {
            return Err(RoomError::MessageTooLong(limit));
        }
        if !commands::is_command(text) {
            let from = self.seats[seat].name.clone();
            self.broadcast(|_| ServerEvent::Chat { room: self.name.clone(), from: Some(from.clone()), text: text.to_owned() });
            return Ok(Data::new());
        }
        if self.phase == Phase::GameOver {
            return Err(RoomError::GameOver);
        }

        match commands::parse(text)? {
            Command::Place(placement) => self.place(seat, placement).await,
            Command::Exchange(letters) => self.exchange(seat, &letters).await,
            Command::Pass => {
                self.ensure_turn(seat)?;
                self.pass(seat, PassReason::Declared).await;
                Ok(Data::new())
            }
            Command::Hint => Ok(lines(ai::hints(
                &self.board,
                &self.dictionary,
                &self.seats[seat].rack,
                self.first_turn,
                &mut self.rng,
            ))),
            Command::Reserve => Ok(lines(commands::reserve_lines(&self.bag.remaining_by_letter()))),
            Command::Help => Ok(lines(commands::help_lines())),
        }
    }

    fn rack_order(&mut self, seat: usize, letters: &str) -> Result<Data, RoomError> {
        if !self.seats[seat].rack.reorder(letters) {
            return Err(RoomError::RackOrder);
        }
        if self.phase == Phase::InProgress {
            let held = self.seats[seat].rack.letters();
            if let Some(tracker) = &mut self.objectives {
                let done = tracker.on_rack_order(seat, &held);
                if !done.is_empty() {
                    self.award(seat, &done);
                    self.push_scores();
                }
            }
        }
        let mut data = Data::new();
        data.insert("tiles".into(), serde_json::json!(self.seats[seat].rack.tiles()));
        Ok(data)
    }

    fn award(&mut self, seat: usize, done: &[Completion]) {
        for completion in done {
            self.seats[seat].score += i32::try_from(completion.points()).unwrap_or(i32::MAX);
            info!(room = %self.name, player = %self.seats[seat].name, objective = ?completion.objective, "room: objective completed");
            for (target, yours) in [(seat, true), (1 - seat, false)] {
                self.send_seat(
                    target,
                    ServerEvent::ObjectiveCompleted {
                        room: self.name.clone(),
                        objective: completion.objective,
                        scope: completion.scope,
                        yours,
                    },
                );
            }
        }
    }
}

// =============================================================================
// TURNS
// =============================================================================

impl Room {
    fn next_turn(&mut self) {
        self.turn = 1 - self.turn;
        self.begin_turn();
    }

    /// Reset the countdown and announce the turn holder. The previous timer
    /// is dropped, which aborts it.
    fn begin_turn(&mut self) {
        self.generation += 1;
        self.remaining = self.turn_seconds;
        self.timer = Some(TurnTimer::start(self.commands.clone(), self.generation, self.state.config.tick));

        let holder = self.seats[self.turn].name.clone();
        let turn = self.turn;
        self.broadcast(|seat| ServerEvent::Turn { room: self.name.clone(), name: holder.clone(), yours: seat == turn });

        if self.seats[self.turn].is_ai() {
            self.schedule(RoomCommand::AiTurn { generation: self.generation }, self.state.config.ai_play_delay);
        }
    }

    async fn tick(&mut self, generation: u64) {
        if generation != self.generation || self.phase != Phase::InProgress {
            return;
        }
        self.remaining = self.remaining.saturating_sub(1);
        let (remaining, bag) = (self.remaining, self.bag.remaining());
        self.broadcast(|_| ServerEvent::Timer { room: self.name.clone(), remaining, bag });
        if self.remaining == 0 {
            self.pass(self.turn, PassReason::Timeout).await;
        }
    }

    /// One AI turn: pick an action, then play, exchange, or schedule a pass.
    async fn ai_turn(&mut self, generation: u64) {
        if !self.is_ai_turn(generation) {
            return;
        }
        let seat = self.turn;
        let Player::Ai { difficulty } = self.seats[seat].player else {
            return;
        };

        let action = match difficulty {
            Difficulty::Expert => AiAction::Play,
            Difficulty::Novice => ai::choose_action(&mut self.rng),
        };
        if action == AiAction::Play {
            let rack = &self.seats[seat].rack;
            let candidate = match difficulty {
                Difficulty::Expert => ai::best_play(&self.board, &self.dictionary, rack, self.first_turn, &mut self.rng),
                Difficulty::Novice => ai::random_play(&self.board, &self.dictionary, rack, self.first_turn, &mut self.rng),
            };
            if let Some(candidate) = candidate {
                match self.place(seat, candidate.placement).await {
                    Ok(_) => return,
                    Err(e) => warn!(room = %self.name, error = %e, "room: AI placement rejected"),
                }
            }
        }
        if action != AiAction::Pass && self.bag.remaining() >= RACK_LENGTH {
            let letters = ai::random_exchange(&self.seats[seat].rack, &mut self.rng);
            if self.exchange(seat, &letters).await.is_ok() {
                return;
            }
        }

        let config = &self.state.config;
        let delay = if action == AiAction::Pass {
            config.ai_end_turn_delay + config.ai_play_delay
        } else {
            config.ai_end_turn_delay
        };
        self.schedule(RoomCommand::AiPass { generation }, delay);
    }

    fn schedule(&self, command: RoomCommand, delay: Duration) {
        let commands = self.commands.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = commands.send(command).await;
        });
    }
}

// =============================================================================
// END OF GAME
// =============================================================================

impl Room {
    /// Settle scores, announce the result, and record the match.
    /// `rack_emptied` is the seat that went out, if any.
    async fn end_game(&mut self, rack_emptied: Option<usize>) {
        self.phase = Phase::GameOver;
        self.timer = None;
        self.generation += 1;

        let first = rack_emptied.unwrap_or(0);
        let second = 1 - first;
        let (tally, leftovers) = {
            let a = Standing { name: &self.seats[first].name, score: self.seats[first].score, rack: &self.seats[first].rack };
            let b = Standing { name: &self.seats[second].name, score: self.seats[second].score, rack: &self.seats[second].rack };
            (settle_scores(&a, &b, rack_emptied.is_some()), leftover_summary(&a, &b))
        };
        self.seats[first].score = tally.first_score;
        self.seats[second].score = tally.second_score;

        info!(room = %self.name, winner = %tally.winner, "room: game over");
        let scores = [
            (self.seats[0].name.clone(), self.seats[0].score),
            (self.seats[1].name.clone(), self.seats[1].score),
        ];
        self.broadcast(|_| ServerEvent::GameOver { room: self.name.clone(), winner: tally.winner.clone(), scores: scores.clone() });
        for line in leftovers {
            self.broadcast(|_| ServerEvent::Chat { room: self.name.clone(), from: None, text: line.clone() });
        }
        self.push_scores();

        for seat in self.seats.iter().filter(|s| !s.is_ai()) {
            if let Err(e) = self.state.store.record_score(self.mode, &seat.name, seat.score).await {
                warn!(room = %self.name, error = %e, "room: leaderboard update failed");
            }
        }
        self.record_match(false).await;
        lobby::update_room(&self.state, &self.name, |summary| summary.status = RoomStatus::Finished).await;
    }

    fn match_label(&self, seat: usize) -> String {
        let seat = &self.seats[seat];
        if seat.is_ai() { format!("{} (AI)", seat.name) } else { seat.name.clone() }
    }

    async fn record_match(&self, abandoned: bool) {
        let duration = OffsetDateTime::now_utc() - self.started_at;
        let record = MatchRecord {
            played_at: self.started_at,
            duration_secs: duration.whole_seconds(),
            player_one: self.match_label(0),
            player_one_points: self.seats[0].score,
            player_two: self.match_label(1),
            player_two_points: self.seats[1].score,
            mode: self.mode,
            abandoned,
            solo: self.solo,
        };
        if let Err(e) = self.state.store.record_match(&record).await {
            warn!(room = %self.name, error = %e, "room: match record failed");
            return;
        }
        lobby::broadcast_matches(&self.state).await;
    }
}

// =============================================================================
// DEPARTURES
// =============================================================================

impl Room {
    /// A human abandoned or timed out of the game.
    async fn depart(&mut self, participant: Uuid) -> ControlFlow<()> {
        let Some(seat) = self.seat_of(participant) else {
            return ControlFlow::Continue(());
        };
        if self.phase == Phase::GameOver {
            return self.leave_finished(seat, participant).await;
        }
        lobby::release(&self.state, participant, &self.name).await;

        let other = 1 - seat;
        if !self.seats[other].is_present_human() {
            info!(room = %self.name, player = %self.seats[seat].name, "room: solo game abandoned");
            self.phase = Phase::GameOver;
            self.timer = None;
            self.record_match(true).await;
            return self.close().await;
        }

        self.substitute(seat).await;
        ControlFlow::Continue(())
    }

    /// Hand a departed human's seat to an AI of the room's difficulty.
    async fn substitute(&mut self, seat: usize) {
        let pool = match self.state.store.ai_names(self.difficulty).await {
            Ok(names) => names,
            Err(e) => {
                warn!(room = %self.name, error = %e, "room: AI names unavailable");
                Vec::new()
            }
        };
        let ai_name = lobby::pick_ai_name(&pool, &self.seats[1 - seat].name, &mut self.rng);

        let leaver = std::mem::replace(&mut self.seats[seat].name, ai_name.clone());
        self.seats[seat].player = Player::Ai { difficulty: self.difficulty };
        self.solo = true;
        info!(room = %self.name, %leaver, ai = %ai_name, "room: AI substituted");

        self.send_seat(
            1 - seat,
            ServerEvent::Chat { room: self.name.clone(), from: None, text: format!("{leaver} left the game, {ai_name} takes over") },
        );
        self.send_seat(1 - seat, ServerEvent::Opponent { room: self.name.clone(), name: ai_name });
        let players = vec![self.seats[0].name.clone(), self.seats[1].name.clone()];
        lobby::update_room(&self.state, &self.name, |summary| summary.players = players).await;

        if self.turn == seat {
            self.schedule(RoomCommand::AiTurn { generation: self.generation }, self.state.config.ai_play_delay);
        }
    }

    /// Leave a finished game. The room closes with its last human.
    async fn leave(&mut self, participant: Uuid) -> ControlFlow<()> {
        if self.phase == Phase::InProgress {
            return self.depart(participant).await;
        }
        let Some(seat) = self.seat_of(participant) else {
            return ControlFlow::Continue(());
        };
        self.leave_finished(seat, participant).await
    }

    async fn leave_finished(&mut self, seat: usize, participant: Uuid) -> ControlFlow<()> {
        self.seats[seat].left = true;
        lobby::release(&self.state, participant, &self.name).await;
        if self.seats.iter().any(Seat::is_present_human) {
            return ControlFlow::Continue(());
        }
        self.close().await
    }

    async fn close(&mut self) -> ControlFlow<()> {
        self.timer = None;
        lobby::close_room(&self.state, &self.name).await;
        ControlFlow::Break(())
    }

    fn rejoin(&mut self, participant: Uuid, new_tx: mpsc::Sender<Frame>) {
        let Some(seat) = self.seat_of(participant) else {
            return;
        };
        if let Player::Human { tx, .. } = &mut self.seats[seat].player {
            *tx = Some(new_tx);
        }
        info!(room = %self.name, player = %self.seats[seat].name, "room: participant rejoined");
        self.send_intro(seat);
        let holder = self.seats[self.turn].name.clone();
        self.send_seat(seat, ServerEvent::Turn { room: self.name.clone(), name: holder, yours: seat == self.turn });
    }
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

impl Room {
    fn send_seat(&self, seat: usize, event: ServerEvent) {
        if let Some(target) = self.seats.get(seat) {
            target.send(event);
        }
    }

    /// Send each seat its own copy of an event.
    fn broadcast(&self, event: impl Fn(usize) -> ServerEvent) {
        for seat in 0..self.seats.len() {
            self.send_seat(seat, event(seat));
        }
    }

    fn push_board(&self, trial: bool) {
        let rows = self.board.rows();
        self.broadcast(|_| ServerEvent::Board { room: self.name.clone(), rows: rows.clone(), trial });
    }

    fn push_scores(&self) {
        self.broadcast(|seat| ServerEvent::Scores {
            room: self.name.clone(),
            own: self.seats[seat].score,
            opponent: self.seats[1 - seat].score,
        });
    }

    fn push_racks(&self) {
        for seat in 0..2 {
            self.send_seat(seat, ServerEvent::Rack { room: self.name.clone(), tiles: self.seats[seat].rack.tiles().to_vec() });
            self.send_seat(seat, ServerEvent::OpponentRack { room: self.name.clone(), count: self.seats[1 - seat].rack.len() });
        }
    }

    /// Everything a seat needs to draw the game from scratch.
    fn send_intro(&self, seat: usize) {
        let room = self.name.clone();
        self.send_seat(
            seat,
            ServerEvent::GameStarted {
                room: room.clone(),
                players: [self.seats[0].name.clone(), self.seats[1].name.clone()],
                mode: self.mode,
                turn_seconds: self.turn_seconds,
            },
        );
        self.send_seat(seat, ServerEvent::Opponent { room: room.clone(), name: self.seats[1 - seat].name.clone() });
        self.send_seat(seat, ServerEvent::Board { room: room.clone(), rows: self.board.rows(), trial: false });
        self.send_seat(seat, ServerEvent::Rack { room: room.clone(), tiles: self.seats[seat].rack.tiles().to_vec() });
        self.send_seat(seat, ServerEvent::OpponentRack { room: room.clone(), count: self.seats[1 - seat].rack.len() });
        self.send_seat(
            seat,
            ServerEvent::Scores { room: room.clone(), own: self.seats[seat].score, opponent: self.seats[1 - seat].score },
        );
        if let Some(tracker) = &self.objectives {
            self.send_seat(
                seat,
                ServerEvent::Objectives { room, private: tracker.private(seat), public: tracker.public().to_vec() },
            );
        }
    }

    /// Reply payload for `game:board`.
    fn snapshot(&self, seat: usize) -> Data {
        let mut data = Data::new();
        data.insert("rows".into(), serde_json::json!(self.board.rows()));
        data.insert("tiles".into(), serde_json::json!(self.seats[seat].rack.tiles()));
        data.insert("score".into(), serde_json::json!(self.seats[seat].score));
        data.insert("opponent_score".into(), serde_json::json!(self.seats[1 - seat].score));
        data.insert("turn".into(), serde_json::json!(self.seats[self.turn].name));
        data.insert("remaining".into(), serde_json::json!(self.remaining));
        data.insert("bag".into(), serde_json::json!(self.bag.remaining()));
        data.insert("game_over".into(), serde_json::json!(self.phase == Phase::GameOver));
        data
    }
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
