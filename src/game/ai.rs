//! Move search — hints and the artificial opponent.
//!
//! DESIGN
//! ======
//! A search starts from anchors: every occupied cell, or the center when
//! the board is empty, kept as separate horizontal and vertical lists. Each
//! step alternates orientation, removes a random anchor from that list, and
//! scans the dictionary in file order for words that
//!
//! 1. can be spelled from the rack plus the anchor's own letter, and
//! 2. pass `Board::validate_placement` when laid so that the anchor letter's
//!    first occurrence in the word sits on the anchor.
//!
//! After a step, anchors contiguous with the explored one on the same line
//! are dropped because their line was just covered. Every search stops after
//! `MAX_SEARCH_STEPS` anchors.
//!
//! BLANKS
//! ======
//! All blanks in the rack stand for one letter drawn once per search. A word
//! letter that can only come from a blank is emitted uppercase, which is how
//! placements mark blank tiles.
//!
//! SELECTION
//! =========
//! - hints: first 3 distinct candidates, at most 3 per anchor.
//! - novice: a point band is drawn (6/12/18); up to 5 candidates scoring in
//!   `(band - 6, band]` are collected, then one is picked at random.
//! - expert: the highest-scoring candidate; the first one found wins ties.

use std::collections::HashMap;

use rand::distr::weighted::WeightedIndex;
use rand::prelude::*;

use super::board::{Board, CENTER, Coord, Orientation, Placement, row_letter};
use super::dictionary::Dictionary;
use super::rack::Rack;

pub const MAX_SEARCH_STEPS: usize = 20;
pub const HINT_COUNT: usize = 3;
const PER_ANCHOR: usize = 3;
const NOVICE_CANDIDATES: usize = 5;
const POINT_BANDS: [u32; 3] = [6, 12, 18];
const POINT_BAND_WEIGHTS: [f64; 3] = [0.4, 0.3, 0.3];
const BAND_WIDTH: u32 = 6;
const ACTION_WEIGHTS: [f64; 3] = [0.1, 0.1, 0.8];

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiAction {
    Pass,
    Exchange,
    Play,
}

/// A legal placement and what it would score right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub placement: Placement,
    pub points: u32,
}

impl Candidate {
    /// The `!place` command that would play this candidate.
    #[must_use]
    pub fn command(&self) -> String {
        let Placement { start, orientation, word } = &self.placement;
        format!("!place {}{}{} {}", row_letter(start.y), start.x + 1, orientation.letter(), word)
    }
}

struct MoveSearch<'a> {
    board: &'a Board,
    dictionary: &'a Dictionary,
    first_turn: bool,
    letters: HashMap<char, usize>,
    blanks: usize,
    blank_as: char,
    horizontal: Vec<Coord>,
    vertical: Vec<Coord>,
}

// =============================================================================
// ENTRY POINTS
// =============================================================================

/// Up to three `!place` suggestions, followed by an availability notice when
/// fewer than three were found.
pub fn hints<R: Rng + ?Sized>(
    board: &Board,
    dictionary: &Dictionary,
    rack: &Rack,
    first_turn: bool,
    rng: &mut R,
) -> Vec<String> {
    let mut search = MoveSearch::new(board, dictionary, rack, first_turn, rng);
    let mut found: Vec<String> = Vec::new();
    search.explore(rng, |s, anchor, orientation| {
        for candidate in s.scan(anchor, orientation).take(PER_ANCHOR) {
            let command = candidate.command();
            if !found.contains(&command) {
                found.push(command);
            }
            if found.len() == HINT_COUNT {
                return true;
            }
        }
        false
    });
    if found.len() < HINT_COUNT {
        found.push(format!("only {} available", found.len()));
    }
    found
}

/// Novice play: a random candidate inside a randomly drawn point band.
pub fn random_play<R: Rng + ?Sized>(
    board: &Board,
    dictionary: &Dictionary,
    rack: &Rack,
    first_turn: bool,
    rng: &mut R,
) -> Option<Candidate> {
    let target = choose_band(rng);
    let low = target.saturating_sub(BAND_WIDTH);
    let mut search = MoveSearch::new(board, dictionary, rack, first_turn, rng);
    let mut pool: Vec<Candidate> = Vec::new();
    search.explore(rng, |s, anchor, orientation| {
        let in_band = s
            .scan(anchor, orientation)
            .filter(|c| c.points > low && c.points <= target)
            .take(PER_ANCHOR);
        for candidate in in_band {
            if !pool.contains(&candidate) {
                pool.push(candidate);
            }
            if pool.len() >= NOVICE_CANDIDATES {
                return true;
            }
        }
        false
    });
    pool.choose(rng).cloned()
}

/// Expert play: the highest-scoring candidate found within the step budget.
pub fn best_play<R: Rng + ?Sized>(
    board: &Board,
    dictionary: &Dictionary,
    rack: &Rack,
    first_turn: bool,
    rng: &mut R,
) -> Option<Candidate> {
    let mut search = MoveSearch::new(board, dictionary, rack, first_turn, rng);
    let mut best: Option<Candidate> = None;
    search.explore(rng, |s, anchor, orientation| {
        for candidate in s.scan(anchor, orientation) {
            if best.as_ref().is_none_or(|b| candidate.points > b.points) {
                best = Some(candidate);
            }
        }
        false
    });
    best
}

/// Novice turn action: pass 10%, exchange 10%, play 80%.
pub fn choose_action<R: Rng + ?Sized>(rng: &mut R) -> AiAction {
    const ACTIONS: [AiAction; 3] = [AiAction::Pass, AiAction::Exchange, AiAction::Play];
    WeightedIndex::new(ACTION_WEIGHTS).map_or(AiAction::Play, |dist| ACTIONS[dist.sample(rng)])
}

/// Upper bound of the point band a novice play aims for.
pub fn choose_band<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    WeightedIndex::new(POINT_BAND_WEIGHTS).map_or(POINT_BANDS[0], |dist| POINT_BANDS[dist.sample(rng)])
}

/// A random non-empty subset of the rack, as exchange letters (`*` for blanks).
pub fn random_exchange<R: Rng + ?Sized>(rack: &Rack, rng: &mut R) -> String {
    let held: Vec<char> = rack.tiles().iter().filter(|t| !t.is_empty()).map(|t| t.face).collect();
    if held.is_empty() {
        return String::new();
    }
    let count = rng.random_range(1..=held.len());
    held.choose_multiple(rng, count).collect()
}

// =============================================================================
// SEARCH
// =============================================================================

impl<'a> MoveSearch<'a> {
    fn new<R: Rng + ?Sized>(
        board: &'a Board,
        dictionary: &'a Dictionary,
        rack: &Rack,
        first_turn: bool,
        rng: &mut R,
    ) -> Self {
        let anchors = if board.is_empty() { vec![Coord::new(CENTER, CENTER)] } else { board.occupied() };
        let mut letters = HashMap::new();
        for tile in rack.tiles().iter().filter(|t| !t.is_empty() && !t.is_blank()) {
            *letters.entry(tile.face.to_ascii_lowercase()).or_default() += 1;
        }
        let blank_as = char::from(b'a' + rng.random_range(0..26u8));
        Self {
            board,
            dictionary,
            first_turn,
            letters,
            blanks: rack.blank_count(),
            blank_as,
            horizontal: anchors.clone(),
            vertical: anchors,
        }
    }

    fn anchors_mut(&mut self, orientation: Orientation) -> &mut Vec<Coord> {
        match orientation {
            Orientation::Horizontal => &mut self.horizontal,
            Orientation::Vertical => &mut self.vertical,
        }
    }

    /// Alternate orientations, handing each drawn anchor to `visit` until it
    /// returns true, anchors run out, or the step budget is spent.
    fn explore<R: Rng + ?Sized>(&mut self, rng: &mut R, mut visit: impl FnMut(&Self, Coord, Orientation) -> bool) {
        let mut orientation = Orientation::Horizontal;
        for _ in 0..MAX_SEARCH_STEPS {
            if self.horizontal.is_empty() && self.vertical.is_empty() {
                break;
            }
            let list = self.anchors_mut(orientation);
            if !list.is_empty() {
                let anchor = list.remove(rng.random_range(0..list.len()));
                let stop = visit(self, anchor, orientation);
                self.skip_run(anchor, orientation);
                if stop {
                    break;
                }
            }
            orientation = orientation.perpendicular();
        }
    }

    fn skip_run(&mut self, anchor: Coord, orientation: Orientation) {
        let board = self.board;
        let mut run = Vec::new();
        let mut cursor = orientation.advance(anchor, 1);
        while let Some(c) = cursor.filter(|c| board.is_occupied(*c)) {
            run.push(c);
            cursor = orientation.advance(c, 1);
        }
        let mut cursor = orientation.retreat(anchor);
        while let Some(c) = cursor.filter(|c| board.is_occupied(*c)) {
            run.push(c);
            cursor = orientation.retreat(c);
        }
        self.anchors_mut(orientation).retain(|a| !run.contains(a));
    }

    /// Legal candidates through `anchor`, in dictionary order.
    fn scan(&self, anchor: Coord, orientation: Orientation) -> impl Iterator<Item = Candidate> + '_ {
        let anchor_face = self
            .board
            .tile(anchor)
            .filter(|t| !t.is_empty())
            .map(|t| t.face.to_ascii_lowercase());
        self.dictionary
            .words()
            .iter()
            .filter_map(move |word| self.candidate(anchor, anchor_face, orientation, word))
    }

    fn candidate(&self, anchor: Coord, anchor_face: Option<char>, orientation: Orientation, word: &str) -> Option<Candidate> {
        let spelled = self.spell(word, anchor_face)?;
        let start = match anchor_face {
            Some(face) => {
                let index = word.chars().position(|c| c == face)?;
                match orientation {
                    Orientation::Horizontal => Coord::new(anchor.x.checked_sub(index)?, anchor.y),
                    Orientation::Vertical => Coord::new(anchor.x, anchor.y.checked_sub(index)?),
                }
            }
            None => anchor,
        };
        let placement = Placement::new(start.x, start.y, orientation, &spelled);
        let check = self.board.validate_placement(&placement, self.first_turn, self.dictionary).ok()?;
        let points = self.board.points_for(orientation, &check);
        Some(Candidate { placement, points })
    }

    /// Spell `word` from the rack plus the anchor letter. Letters covered
    /// only by a blank come back uppercase.
    fn spell(&self, word: &str, anchor_face: Option<char>) -> Option<String> {
        let mut pool = self.letters.clone();
        if let Some(face) = anchor_face {
            *pool.entry(face).or_default() += 1;
        }
        let mut blanks = self.blanks;
        let mut spelled = String::with_capacity(word.len());
        for c in word.chars() {
            match pool.get_mut(&c).filter(|n| **n > 0) {
                Some(n) => {
                    *n -= 1;
                    spelled.push(c);
                }
                None if c == self.blank_as && blanks > 0 => {
                    blanks -= 1;
                    spelled.push(c.to_ascii_uppercase());
                }
                None => return None,
            }
        }
        Some(spelled)
    }
}

#[cfg(test)]
#[path = "ai_test.rs"]
mod tests;
