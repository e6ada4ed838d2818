//! Objective tracker — one-time bonus conditions for objectives mode.
//!
//! DESIGN
//! ======
//! At game start four objectives are drawn without replacement from the
//! catalog: one private to each seat and two public. The tracker observes
//! every committed placement (and every rack reorder) and reports each
//! objective the acting seat completed. A completed objective is removed,
//! so it can award points only once per game.
//!
//! Seats are addressed by index (0 = host, 1 = guest). Per-seat history
//! (blanks played) is kept for every seat regardless of which objectives
//! are in play.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;

use super::board::{BOARD_LENGTH, PlacementCheck};

const PUBLIC_OBJECTIVES: usize = 2;
const SAME_WORD_REPEATS: usize = 3;
const SEQUENCE_LENGTH: usize = 5;
const BLANKS_NEEDED: usize = 2;
const WORDS_AT_ONCE: usize = 3;
const LONG_WORD: usize = 8;
const VOWEL_WORD: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    TouchBorder,
    PlaceZ,
    SameWordThrice,
    RackSequence,
    BothBlanks,
    ThreeWordsAtOnce,
    LongWord,
    VowelWord,
}

impl Objective {
    pub const ALL: [Objective; 8] = [
        Self::TouchBorder,
        Self::PlaceZ,
        Self::SameWordThrice,
        Self::RackSequence,
        Self::BothBlanks,
        Self::ThreeWordsAtOnce,
        Self::LongWord,
        Self::VowelWord,
    ];

    #[must_use]
    pub fn points(self) -> u32 {
        match self {
            Self::TouchBorder | Self::LongWord => 25,
            Self::PlaceZ => 10,
            Self::SameWordThrice => 20,
            Self::RackSequence => 40,
            Self::BothBlanks | Self::VowelWord => 15,
            Self::ThreeWordsAtOnce => 30,
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::TouchBorder => "Place a letter on an edge of the board",
            Self::PlaceZ => "Place a z",
            Self::SameWordThrice => "Form the same word 3 times in the game",
            Self::RackSequence => "Hold 5 alphabetically consecutive letters in order in your rack",
            Self::BothBlanks => "Play both blank tiles in the game",
            Self::ThreeWordsAtOnce => "Form 3 words in one placement",
            Self::LongWord => "Form a word of 8 letters or more",
            Self::VowelWord => "Form a word of 3 letters or more using only vowels",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Private,
    Public,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub objective: Objective,
    pub scope: Scope,
}

impl Completion {
    #[must_use]
    pub fn points(&self) -> u32 {
        self.objective.points()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ObjectiveTracker {
    private: [Option<Objective>; 2],
    public: Vec<Objective>,
    words_formed: Vec<String>,
    blanks_played: [usize; 2],
}

impl ObjectiveTracker {
    /// Draw two private and two public objectives without replacement.
    pub fn draw<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut pool = Objective::ALL.to_vec();
        pool.shuffle(rng);
        let mut drawn = pool.into_iter();
        let private = [drawn.next(), drawn.next()];
        let public = drawn.take(PUBLIC_OBJECTIVES).collect();
        Self { private, public, ..Self::default() }
    }

    /// Tracker with a fixed assignment, for staged games.
    #[must_use]
    pub fn with_objectives(private: [Option<Objective>; 2], public: Vec<Objective>) -> Self {
        Self { private, public, ..Self::default() }
    }

    #[must_use]
    pub fn private(&self, seat: usize) -> Option<Objective> {
        self.private.get(seat).copied().flatten()
    }

    #[must_use]
    pub fn public(&self) -> &[Objective] {
        &self.public
    }

    /// Record a committed placement by `seat` and award what it completed.
    pub fn on_placement(&mut self, seat: usize, check: &PlacementCheck) -> Vec<Completion> {
        let full_word = check.full_word.to_lowercase();
        self.words_formed.push(full_word.clone());
        let blanks = check.new_letters.chars().filter(char::is_ascii_uppercase).count();
        if let Some(count) = self.blanks_played.get_mut(seat) {
            *count += blanks;
        }

        let seat_blanks = self.blanks_played.get(seat).copied().unwrap_or_default();
        let repeats = self.words_formed.iter().filter(|w| **w == full_word).count();

        self.settle(seat, |objective| match objective {
            Objective::TouchBorder => check
                .new_cells
                .iter()
                .any(|c| c.x == 0 || c.y == 0 || c.x == BOARD_LENGTH - 1 || c.y == BOARD_LENGTH - 1),
            Objective::PlaceZ => check.new_letters.chars().any(|c| c.eq_ignore_ascii_case(&'z')),
            Objective::SameWordThrice => repeats >= SAME_WORD_REPEATS,
            Objective::BothBlanks => seat_blanks >= BLANKS_NEEDED,
            Objective::ThreeWordsAtOnce => check.words_formed() >= WORDS_AT_ONCE,
            Objective::LongWord => full_word.chars().count() >= LONG_WORD,
            Objective::VowelWord => {
                full_word.chars().count() >= VOWEL_WORD && full_word.chars().all(|c| "aeiouy".contains(c))
            }
            Objective::RackSequence => false,
        })
    }

    /// Check the rack sequence objective after `seat` reordered its rack.
    pub fn on_rack_order(&mut self, seat: usize, letters: &str) -> Vec<Completion> {
        let ordered = has_sequence(letters, SEQUENCE_LENGTH);
        self.settle(seat, |objective| objective == Objective::RackSequence && ordered)
    }

    fn settle(&mut self, seat: usize, met: impl Fn(Objective) -> bool) -> Vec<Completion> {
        let mut done = Vec::new();
        if let Some(slot) = self.private.get_mut(seat) {
            if let Some(objective) = slot.filter(|o| met(*o)) {
                *slot = None;
                done.push(Completion { objective, scope: Scope::Private });
            }
        }
        self.public.retain(|&objective| {
            if met(objective) {
                done.push(Completion { objective, scope: Scope::Public });
                false
            } else {
                true
            }
        });
        done
    }
}

/// Whether `letters` holds a run of `len` consecutive alphabet letters in order.
fn has_sequence(letters: &str, len: usize) -> bool {
    let codes: Vec<u32> = letters.chars().map(|c| u32::from(c.to_ascii_lowercase())).collect();
    let mut run = 1;
    for pair in codes.windows(2) {
        run = if pair[1] == pair[0] + 1 { run + 1 } else { 1 };
        if run >= len {
            return true;
        }
    }
    len <= 1 && !codes.is_empty()
}

#[cfg(test)]
#[path = "objectives_test.rs"]
mod tests;
