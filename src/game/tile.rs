//! Letter tiles and the point table.

use serde::{Deserialize, Serialize};

/// Face of an empty board cell or an empty rack slot.
pub const EMPTY: char = '-';

/// Face of a blank tile while it sits in a rack or in the bag.
pub const BLANK: char = '*';

/// Base point value for a face. Case-insensitive; blanks and placeholders are worth 0.
#[must_use]
pub fn letter_points(face: char) -> u32 {
    match face.to_ascii_uppercase() {
        'A' | 'E' | 'I' | 'L' | 'N' | 'O' | 'R' | 'S' | 'T' | 'U' => 1,
        'D' | 'G' => 2,
        'B' | 'C' | 'M' | 'P' => 3,
        'F' | 'H' | 'V' | 'W' | 'Y' => 4,
        'K' => 5,
        'J' | 'X' => 8,
        'Q' | 'Z' => 10,
        _ => 0,
    }
}

/// A single tile. Rack and bag tiles carry uppercase faces (`*` for blanks);
/// board tiles carry lowercase faces, or uppercase when a blank was played
/// as that letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub face: char,
    pub points: u32,
}

impl Tile {
    #[must_use]
    pub fn new(face: char) -> Self {
        Self { face, points: letter_points(face) }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self { face: EMPTY, points: 0 }
    }

    /// Tile written onto the board. An uppercase face marks a played blank.
    #[must_use]
    pub fn placed(face: char) -> Self {
        if face.is_ascii_uppercase() {
            Self { face, points: 0 }
        } else {
            Self::new(face)
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.face == EMPTY
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.face == BLANK
    }

    /// Whether this board tile came from a blank.
    #[must_use]
    pub fn is_played_blank(&self) -> bool {
        self.face.is_ascii_uppercase()
    }
}

impl Default for Tile {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_table_matches_reference_values() {
        assert_eq!(letter_points('a'), 1);
        assert_eq!(letter_points('D'), 2);
        assert_eq!(letter_points('m'), 3);
        assert_eq!(letter_points('W'), 4);
        assert_eq!(letter_points('k'), 5);
        assert_eq!(letter_points('X'), 8);
        assert_eq!(letter_points('q'), 10);
        assert_eq!(letter_points(BLANK), 0);
        assert_eq!(letter_points(EMPTY), 0);
    }

    #[test]
    fn placed_uppercase_tile_scores_zero() {
        assert_eq!(Tile::placed('z').points, 10);
        let blank = Tile::placed('Z');
        assert_eq!(blank.points, 0);
        assert!(blank.is_played_blank());
    }

    #[test]
    fn empty_tile_is_placeholder() {
        let tile = Tile::default();
        assert!(tile.is_empty());
        assert!(!tile.is_blank());
    }
}
