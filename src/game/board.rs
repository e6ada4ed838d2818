//! Board engine — grid, placement validation, and scoring.
//!
//! DESIGN
//! ======
//! `Board` is the single writer of the grid: the only mutating entry point
//! is `apply_placement`, which re-runs `validate_placement` before touching
//! a cell. Validation is pure (`&self`) so previews, hints, and the AI can
//! call it freely.
//!
//! SCORING
//! =======
//! Letter multipliers scale one tile; word multipliers accumulate and apply
//! once to the word sum. A bonus cell is consumed (removed from the board's
//! bonus map) only when a committed placement scores over it. Cross words
//! formed at newly placed cells score independently, see their bonuses, and
//! never consume them. A letter played from a blank is stored uppercase and
//! contributes 0.
//!
//! COORDINATES
//! ===========
//! `x` is the column (0-based, shown as 1..=15), `y` is the row (0-based,
//! shown as a..=o).

use std::collections::HashMap;

use serde::Serialize;

use super::dictionary::{Dictionary, normalize};
use super::rack::RACK_LENGTH;
use super::tile::{EMPTY, Tile, letter_points};

pub const BOARD_LENGTH: usize = 15;
pub const CENTER: usize = 7;
pub const FULL_RACK_BONUS: u32 = 50;

const WORD_TRIPLE: [(usize, usize); 8] = [(0, 0), (14, 0), (7, 0), (0, 7), (0, 14), (14, 14), (7, 14), (14, 7)];
const WORD_DOUBLE: [(usize, usize); 16] = [
    (1, 1), (2, 2), (3, 3), (4, 4),
    (1, 13), (2, 12), (3, 11), (4, 10),
    (13, 13), (12, 12), (11, 11), (10, 10),
    (13, 1), (12, 2), (11, 3), (10, 4),
];
const LETTER_TRIPLE: [(usize, usize); 12] = [
    (5, 1), (9, 1), (1, 5), (5, 5), (9, 5), (13, 5),
    (1, 9), (5, 9), (5, 13), (9, 13), (13, 9), (9, 9),
];
const LETTER_DOUBLE: [(usize, usize); 24] = [
    (0, 3), (3, 0), (0, 11), (11, 0), (2, 6), (2, 8), (3, 7), (6, 2),
    (8, 2), (7, 3), (3, 14), (14, 3), (11, 14), (14, 11), (6, 12), (8, 12),
    (7, 11), (12, 6), (12, 8), (11, 7), (6, 6), (6, 8), (8, 6), (8, 8),
];

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    #[error("the column must be between 1 and 15")]
    ColumnOutOfRange,
    #[error("the row must be between a and o")]
    RowOutOfRange,
    #[error("a word may only contain the letters a to z")]
    InvalidWord,
    #[error("the word does not fit on the board")]
    OutOfBounds,
    #[error("the word conflicts with letters already on the board")]
    Collision,
    #[error("you must add at least one letter to the board")]
    NoNewLetters,
    #[error("the first word must cover the center square H8")]
    FirstTurnCenter,
    #[error("the word must touch a letter already on the board")]
    NotConnected,
    #[error("the word {0} is not in the dictionary")]
    UnknownWord(String),
}

impl crate::frame::ErrorCode for PlacementError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnOutOfRange | Self::RowOutOfRange => "E_COORDINATES",
            Self::InvalidWord => "E_INVALID_WORD",
            Self::OutOfBounds => "E_OUT_OF_BOUNDS",
            Self::Collision => "E_COLLISION",
            Self::NoNewLetters => "E_NO_NEW_LETTERS",
            Self::FirstTurnCenter => "E_FIRST_TURN",
            Self::NotConnected => "E_NOT_CONNECTED",
            Self::UnknownWord(_) => "E_UNKNOWN_WORD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bonus {
    LetterTriple,
    LetterDouble,
    WordTriple,
    WordDouble,
    Star,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Coord {
    pub x: usize,
    pub y: usize,
}

impl Coord {
    #[must_use]
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Human label, e.g. `H8` for the center.
    #[must_use]
    pub fn label(self) -> String {
        format!("{}{}", row_letter(self.y).to_ascii_uppercase(), self.x + 1)
    }
}

/// Row letter for a 0-based row index (`0` → `a`).
#[must_use]
pub fn row_letter(y: usize) -> char {
    u8::try_from(y).ok().and_then(|y| y.checked_add(b'a')).map_or('?', char::from)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    #[must_use]
    pub fn perpendicular(self) -> Self {
        match self {
            Self::Horizontal => Self::Vertical,
            Self::Vertical => Self::Horizontal,
        }
    }

    #[must_use]
    pub fn letter(self) -> char {
        match self {
            Self::Horizontal => 'h',
            Self::Vertical => 'v',
        }
    }

    /// `n` cells forward from `from`, or `None` past the grid edge.
    #[must_use]
    pub fn advance(self, from: Coord, n: usize) -> Option<Coord> {
        let c = match self {
            Self::Horizontal => Coord::new(from.x.checked_add(n)?, from.y),
            Self::Vertical => Coord::new(from.x, from.y.checked_add(n)?),
        };
        (c.x < BOARD_LENGTH && c.y < BOARD_LENGTH).then_some(c)
    }

    /// One cell backward from `from`, or `None` at the grid edge.
    #[must_use]
    pub fn retreat(self, from: Coord) -> Option<Coord> {
        match self {
            Self::Horizontal => Some(Coord::new(from.x.checked_sub(1)?, from.y)),
            Self::Vertical => Some(Coord::new(from.x, from.y.checked_sub(1)?)),
        }
    }
}

/// A requested placement. The word is accent-normalized on construction;
/// uppercase letters mean "play a blank as this letter".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub start: Coord,
    pub orientation: Orientation,
    pub word: String,
}

impl Placement {
    #[must_use]
    pub fn new(x: usize, y: usize, orientation: Orientation, word: &str) -> Self {
        Self { start: Coord::new(x, y), orientation, word: normalize(word) }
    }

    fn len(&self) -> usize {
        self.word.chars().count()
    }

    /// Coordinates covered by the word, clipped at the grid edge.
    #[must_use]
    pub fn cells(&self) -> Vec<Coord> {
        (0..self.len())
            .map_while(|i| self.orientation.advance(self.start, i))
            .collect()
    }
}

/// A perpendicular word formed through one newly placed tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossWord {
    pub word: String,
    pub start: Coord,
    pub points: u32,
}

/// Everything validation learned about a legal placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementCheck {
    /// Letters that land on empty cells, in word order, case preserved.
    pub new_letters: String,
    pub new_cells: Vec<Coord>,
    /// Main word including any pre-existing prefix/suffix.
    pub full_word: String,
    pub full_word_start: Coord,
    pub cross_words: Vec<CrossWord>,
}

impl PlacementCheck {
    #[must_use]
    pub fn uses_full_rack(&self) -> bool {
        self.new_letters.chars().count() == RACK_LENGTH
    }

    #[must_use]
    pub fn words_formed(&self) -> usize {
        1 + self.cross_words.len()
    }
}

/// Result of a committed placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayOutcome {
    pub points: u32,
    pub check: PlacementCheck,
}

#[derive(Debug, Clone)]
pub struct Board {
    cells: Vec<Vec<Tile>>,
    bonuses: HashMap<Coord, Bonus>,
}

// =============================================================================
// CONSTRUCTION / QUERIES
// =============================================================================

impl Board {
    /// Empty grid with the full bonus layout.
    #[must_use]
    pub fn new() -> Self {
        let mut bonuses = HashMap::new();
        // Inserted from lowest to highest lookup precedence.
        bonuses.insert(Coord::new(CENTER, CENTER), Bonus::Star);
        for (layout, bonus) in [
            (&WORD_DOUBLE[..], Bonus::WordDouble),
            (&WORD_TRIPLE[..], Bonus::WordTriple),
            (&LETTER_DOUBLE[..], Bonus::LetterDouble),
            (&LETTER_TRIPLE[..], Bonus::LetterTriple),
        ] {
            for &(row, col) in layout {
                bonuses.insert(Coord::new(col, row), bonus);
            }
        }
        Self { cells: vec![vec![Tile::empty(); BOARD_LENGTH]; BOARD_LENGTH], bonuses }
    }

    #[must_use]
    pub fn tile(&self, at: Coord) -> Option<&Tile> {
        self.cells.get(at.y).and_then(|row| row.get(at.x))
    }

    fn face(&self, at: Coord) -> Option<char> {
        self.tile(at).filter(|t| !t.is_empty()).map(|t| t.face)
    }

    #[must_use]
    pub fn is_occupied(&self, at: Coord) -> bool {
        self.face(at).is_some()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.iter().flatten().all(Tile::is_empty)
    }

    /// Remaining (unconsumed) bonus at a cell.
    #[must_use]
    pub fn bonus(&self, at: Coord) -> Option<Bonus> {
        self.bonuses.get(&at).copied()
    }

    /// Occupied cells, scanned column by column.
    #[must_use]
    pub fn occupied(&self) -> Vec<Coord> {
        let mut out = Vec::new();
        for x in 0..BOARD_LENGTH {
            for y in 0..BOARD_LENGTH {
                let c = Coord::new(x, y);
                if self.is_occupied(c) {
                    out.push(c);
                }
            }
        }
        out
    }

    /// Rows as strings of faces, `-` for empty cells.
    #[must_use]
    pub fn rows(&self) -> Vec<String> {
        self.cells.iter().map(|row| row.iter().map(|t| t.face).collect()).collect()
    }

    /// Write tiles directly, bypassing validation. Used to stage positions.
    pub fn set(&mut self, at: Coord, face: char) {
        if let Some(cell) = self.cells.get_mut(at.y).and_then(|row| row.get_mut(at.x)) {
            *cell = if face == EMPTY { Tile::empty() } else { Tile::placed(face) };
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// WORD EXTRACTION
// =============================================================================

impl Board {
    /// Extend `added` (to be written at `at`) with the contiguous letters
    /// already on the board before and after it along `orientation`.
    #[must_use]
    pub fn full_word(&self, at: Coord, orientation: Orientation, added: &str) -> String {
        let mut prefix = Vec::new();
        let mut cursor = orientation.retreat(at);
        while let Some(c) = cursor {
            let Some(face) = self.face(c) else { break };
            prefix.push(face);
            cursor = orientation.retreat(c);
        }

        let mut word: String = prefix.into_iter().rev().collect();
        word.push_str(added);

        let mut cursor = orientation.advance(at, added.chars().count());
        while let Some(c) = cursor {
            let Some(face) = self.face(c) else { break };
            word.push(face);
            cursor = orientation.advance(c, 1);
        }
        word
    }

    /// First cell of the contiguous run that `at` extends backward into.
    #[must_use]
    pub fn word_start(&self, at: Coord, orientation: Orientation) -> Coord {
        let mut start = at;
        while let Some(prev) = orientation.retreat(start) {
            if !self.is_occupied(prev) {
                break;
            }
            start = prev;
        }
        start
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

impl Board {
    /// Check a placement against geometry, contact, and dictionary rules.
    /// Returns the first violated rule. Never mutates the board.
    ///
    /// # Errors
    ///
    /// Returns the `PlacementError` for the first rule the placement breaks.
    pub fn validate_placement(
        &self,
        placement: &Placement,
        first_turn: bool,
        dictionary: &Dictionary,
    ) -> Result<PlacementCheck, PlacementError> {
        let Placement { start, orientation, word } = placement;
        let (start, orientation) = (*start, *orientation);

        if start.x >= BOARD_LENGTH {
            return Err(PlacementError::ColumnOutOfRange);
        }
        if start.y >= BOARD_LENGTH {
            return Err(PlacementError::RowOutOfRange);
        }
        if word.is_empty() || !word.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(PlacementError::InvalidWord);
        }

        let cells = placement.cells();
        if cells.len() != placement.len() {
            return Err(PlacementError::OutOfBounds);
        }

        // `merged` keeps the board's own face where the word overlaps it, so a
        // played blank still scores 0 when reused.
        let mut merged = String::new();
        let mut new_letters = String::new();
        let mut new_cells = Vec::new();
        let mut overlaps_existing = false;
        for (letter, &cell) in word.chars().zip(&cells) {
            match self.face(cell) {
                Some(existing) if !existing.eq_ignore_ascii_case(&letter) => return Err(PlacementError::Collision),
                Some(existing) => {
                    overlaps_existing = true;
                    merged.push(existing);
                }
                None => {
                    merged.push(letter);
                    new_letters.push(letter);
                    new_cells.push(cell);
                }
            }
        }
        if new_letters.is_empty() && !first_turn {
            return Err(PlacementError::NoNewLetters);
        }

        let full_word = self.full_word(start, orientation, &merged);
        let perpendicular = orientation.perpendicular();

        if first_turn {
            if !cells.contains(&Coord::new(CENTER, CENTER)) {
                return Err(PlacementError::FirstTurnCenter);
            }
        } else {
            let extends = full_word.chars().count() > placement.len();
            let has_cross_neighbor = new_cells.iter().any(|&c| self.has_neighbor(c, perpendicular));
            if !(extends || overlaps_existing || has_cross_neighbor) {
                return Err(PlacementError::NotConnected);
            }
        }

        if !dictionary.contains(&full_word) {
            return Err(PlacementError::UnknownWord(full_word.to_lowercase()));
        }

        let mut cross_words = Vec::new();
        for (letter, &cell) in word.chars().zip(&cells) {
            if !new_cells.contains(&cell) || !self.has_neighbor(cell, perpendicular) {
                continue;
            }
            let cross = self.full_word(cell, perpendicular, &letter.to_string());
            if !dictionary.contains(&cross) {
                return Err(PlacementError::UnknownWord(cross.to_lowercase()));
            }
            let cross_start = self.word_start(cell, perpendicular);
            let points = self.score_word(cross_start, perpendicular, &cross);
            cross_words.push(CrossWord { word: cross, start: cross_start, points });
        }

        Ok(PlacementCheck {
            new_letters,
            new_cells,
            full_word_start: self.word_start(start, orientation),
            full_word,
            cross_words,
        })
    }

    fn has_neighbor(&self, at: Coord, along: Orientation) -> bool {
        let before = along.retreat(at).is_some_and(|c| self.is_occupied(c));
        let after = along.advance(at, 1).is_some_and(|c| self.is_occupied(c));
        before || after
    }
}

// =============================================================================
// SCORING / COMMIT
// =============================================================================

impl Board {
    /// Score `word` laid from `start` using the current bonus map, without
    /// consuming anything.
    #[must_use]
    pub fn score_word(&self, start: Coord, orientation: Orientation, word: &str) -> u32 {
        let mut sum = 0;
        let mut multiplier = 1;
        for (i, letter) in word.chars().enumerate() {
            let base = if letter.is_ascii_uppercase() { 0 } else { letter_points(letter) };
            let bonus = orientation.advance(start, i).and_then(|c| self.bonus(c));
            match bonus {
                Some(Bonus::LetterTriple) => sum += base * 3,
                Some(Bonus::LetterDouble) => sum += base * 2,
                Some(Bonus::WordTriple) => {
                    sum += base;
                    multiplier *= 3;
                }
                Some(Bonus::WordDouble | Bonus::Star) => {
                    sum += base;
                    multiplier *= 2;
                }
                None => sum += base,
            }
        }
        sum * multiplier
    }

    /// Total a validated placement would earn right now: main word, cross
    /// words, and the full-rack bonus.
    #[must_use]
    pub fn points_for(&self, orientation: Orientation, check: &PlacementCheck) -> u32 {
        let mut points = self.score_word(check.full_word_start, orientation, &check.full_word);
        points += check.cross_words.iter().map(|w| w.points).sum::<u32>();
        if check.uses_full_rack() {
            points += FULL_RACK_BONUS;
        }
        points
    }

    /// Validate, score, and write a placement. Bonus cells under the main
    /// word are consumed.
    ///
    /// # Errors
    ///
    /// Returns the validation error unchanged; the board is untouched then.
    pub fn apply_placement(
        &mut self,
        placement: &Placement,
        first_turn: bool,
        dictionary: &Dictionary,
    ) -> Result<PlayOutcome, PlacementError> {
        let check = self.validate_placement(placement, first_turn, dictionary)?;
        let points = self.points_for(placement.orientation, &check);

        let full_len = check.full_word.chars().count();
        for i in 0..full_len {
            if let Some(c) = placement.orientation.advance(check.full_word_start, i) {
                self.bonuses.remove(&c);
            }
        }
        self.write(placement);

        Ok(PlayOutcome { points, check })
    }

    /// Copy of the board with the word written in, for broadcasting a trial
    /// state. Cells past the edge are dropped; bonuses are left intact.
    #[must_use]
    pub fn preview(&self, placement: &Placement) -> Board {
        let mut trial = self.clone();
        trial.write(placement);
        trial
    }

    fn write(&mut self, placement: &Placement) {
        for (letter, cell) in placement.word.chars().zip(placement.cells()) {
            if !self.is_occupied(cell) {
                self.set(cell, letter);
            }
        }
    }
}

#[cfg(test)]
#[path = "board_test.rs"]
mod tests;
