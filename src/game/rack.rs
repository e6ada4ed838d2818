//! Rack — a participant's fixed-capacity hand of tiles.
//!
//! DESIGN
//! ======
//! The rack is always exactly `RACK_LENGTH` slots. Empty slots hold the
//! placeholder tile rather than being absent, so slot indices stay stable
//! across a locate → replace exchange and the client can keep its own
//! ordering.

use serde::{Deserialize, Serialize};

use super::tile::{BLANK, Tile};

pub const RACK_LENGTH: usize = 7;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RackError {
    #[error("you cannot play or exchange letters you do not have")]
    MissingLetters,
    #[error("between 1 and 7 letters can be exchanged")]
    BadCount,
}

impl crate::frame::ErrorCode for RackError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingLetters => "E_MISSING_LETTERS",
            Self::BadCount => "E_EXCHANGE_COUNT",
        }
    }
}

/// One tile a caller wants out of the rack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wanted {
    Letter(char),
    Blank,
}

impl Wanted {
    /// Letters of a placement. An uppercase letter is a blank played as that letter.
    #[must_use]
    pub fn from_placement(letters: &str) -> Vec<Self> {
        letters
            .chars()
            .map(|c| if c.is_ascii_uppercase() { Self::Blank } else { Self::Letter(c) })
            .collect()
    }

    /// Letters of an exchange request. `*` names a blank; case is ignored.
    #[must_use]
    pub fn from_exchange(letters: &str) -> Vec<Self> {
        letters
            .chars()
            .map(|c| if c == BLANK { Self::Blank } else { Self::Letter(c) })
            .collect()
    }

    fn matches(self, tile: &Tile) -> bool {
        match self {
            Self::Blank => tile.is_blank(),
            Self::Letter(c) => !tile.is_empty() && !tile.is_blank() && tile.face.eq_ignore_ascii_case(&c),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rack {
    tiles: Vec<Tile>,
}

// =============================================================================
// CONSTRUCTION / QUERIES
// =============================================================================

impl Rack {
    #[must_use]
    pub fn new() -> Self {
        Self { tiles: vec![Tile::empty(); RACK_LENGTH] }
    }

    /// Build a rack from dealt tiles. Extra tiles are ignored, missing slots are empty.
    #[must_use]
    pub fn from_tiles(tiles: Vec<Tile>) -> Self {
        let mut rack = Self::new();
        for (slot, tile) in rack.tiles.iter_mut().zip(tiles) {
            *slot = tile;
        }
        rack
    }

    #[must_use]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Faces of the occupied slots, in slot order.
    #[must_use]
    pub fn letters(&self) -> String {
        self.tiles.iter().filter(|t| !t.is_empty()).map(|t| t.face).collect()
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.iter().filter(|t| !t.is_empty()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of the point values still held.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.tiles.iter().map(|t| t.points).sum()
    }

    #[must_use]
    pub fn blank_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_blank()).count()
    }
}

impl Default for Rack {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// MUTATION
// =============================================================================

impl Rack {
    /// Find one distinct slot for every wanted tile.
    ///
    /// # Errors
    ///
    /// Returns `MissingLetters` when any wanted tile is not held.
    pub fn locate(&self, wanted: &[Wanted]) -> Result<Vec<usize>, RackError> {
        let mut used = [false; RACK_LENGTH];
        let mut slots = Vec::with_capacity(wanted.len());
        for want in wanted {
            let found = self
                .tiles
                .iter()
                .enumerate()
                .find(|(i, tile)| !used[*i] && want.matches(tile))
                .map(|(i, _)| i);
            let Some(slot) = found else {
                return Err(RackError::MissingLetters);
            };
            used[slot] = true;
            slots.push(slot);
        }
        Ok(slots)
    }

    /// Swap the tiles in `slots` for `replacements`, returning what was removed.
    /// Slots without a replacement become empty.
    pub fn replace(&mut self, slots: &[usize], replacements: Vec<Tile>) -> Vec<Tile> {
        let mut incoming = replacements.into_iter();
        let mut removed = Vec::with_capacity(slots.len());
        for &slot in slots {
            let Some(current) = self.tiles.get_mut(slot) else {
                continue;
            };
            removed.push(*current);
            *current = incoming.next().unwrap_or_default();
        }
        removed
    }

    /// Reorder the rack to follow `order` (a permutation of the held faces).
    /// Returns false and leaves the rack untouched if `order` is not a permutation.
    pub fn reorder(&mut self, order: &str) -> bool {
        let wanted: Vec<Wanted> = Wanted::from_exchange(order);
        if wanted.len() != self.len() {
            return false;
        }
        let Ok(slots) = self.locate(&wanted) else {
            return false;
        };
        let mut reordered: Vec<Tile> = slots.iter().map(|&i| self.tiles[i]).collect();
        reordered.resize(RACK_LENGTH, Tile::empty());
        self.tiles = reordered;
        true
    }
}

#[cfg(test)]
#[path = "rack_test.rs"]
mod tests;
