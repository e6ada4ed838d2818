//! Game core — pure rules with no I/O.
//!
//! DESIGN
//! ======
//! Everything under `game` is synchronous and deterministic given an `Rng`.
//! The room actor in `services::room` owns one instance of each piece and
//! is the only caller that mutates them; tests drive the pieces directly.
//!
//! - `tile` / `rack` / `bag`: letter values and containers.
//! - `board`: grid, validation, and scoring.
//! - `dictionary`: word lists and normalization.
//! - `objectives`: one-time bonus conditions for objectives mode.
//! - `ai`: move search for hints and the artificial opponent.
//! - `commands`: the `!` free-text command grammar.

pub mod ai;
pub mod bag;
pub mod board;
pub mod commands;
pub mod dictionary;
pub mod objectives;
pub mod rack;
pub mod tile;

use serde::{Deserialize, Serialize};

use rack::Rack;

/// Consecutive passes (by either side) that end the game.
pub const MAX_TURNS_SKIPPED: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    Classic,
    Objectives,
}

impl GameMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Objectives => "objectives",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "classic" => Some(Self::Classic),
            "objectives" => Some(Self::Objectives),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Novice,
    Expert,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Novice => "novice",
            Self::Expert => "expert",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "novice" => Some(Self::Novice),
            "expert" => Some(Self::Expert),
            _ => None,
        }
    }
}

// =============================================================================
// END OF GAME
// =============================================================================

/// One side's state at the end of a game.
#[derive(Debug, Clone)]
pub struct Standing<'a> {
    pub name: &'a str,
    pub score: i32,
    pub rack: &'a Rack,
}

/// Adjusted scores and the winner line announced to the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalTally {
    pub winner: String,
    pub first_score: i32,
    pub second_score: i32,
}

/// Deduct each side's remaining rack value from its score. When `rack_emptied`
/// is set, `first` went out and also collects `second`'s rack value.
#[must_use]
pub fn settle_scores(first: &Standing<'_>, second: &Standing<'_>, rack_emptied: bool) -> FinalTally {
    let first_rack = rack_points(first.rack);
    let second_rack = rack_points(second.rack);
    let mut first_score = first.score - first_rack;
    let second_score = second.score - second_rack;
    if rack_emptied {
        first_score += second_rack;
    }

    let winner = match first_score.cmp(&second_score) {
        std::cmp::Ordering::Greater => first.name.to_owned(),
        std::cmp::Ordering::Less => second.name.to_owned(),
        std::cmp::Ordering::Equal => format!("{} ET {} ONT GAGNES", first.name, second.name),
    };
    FinalTally { winner, first_score, second_score }
}

/// Lines listing what each side still held when the game ended.
#[must_use]
pub fn leftover_summary(first: &Standing<'_>, second: &Standing<'_>) -> Vec<String> {
    vec![
        "Game over - letters left".to_owned(),
        format!("{} : {}", first.name, first.rack.letters()),
        format!("{} : {}", second.name, second.rack.letters()),
    ]
}

fn rack_points(rack: &Rack) -> i32 {
    i32::try_from(rack.value()).unwrap_or(i32::MAX)
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
