//! Letter bag — the undealt tiles of one room.
//!
//! DESIGN
//! ======
//! The bag is a plain `Vec<Tile>`; `remaining()` is its length, so the
//! remaining counter can never drift from the contents. Draws pick a uniform
//! index and `swap_remove` it. Every operation takes the caller's `Rng` so
//! rooms can run on a seeded generator.

use std::collections::BTreeMap;

use rand::Rng;

use super::tile::{BLANK, Tile};

/// Tile counts for `A..=Z`, in alphabetical order.
const LETTER_COUNTS: [usize; 26] = [9, 2, 2, 3, 15, 2, 2, 2, 8, 1, 1, 5, 3, 6, 6, 2, 1, 6, 6, 6, 6, 2, 1, 1, 1, 1];
const BLANK_COUNT: usize = 2;

/// Size of a freshly filled bag.
pub const TOTAL_TILES: usize = 102;

#[derive(Debug, Clone)]
pub struct LetterBag {
    tiles: Vec<Tile>,
}

impl LetterBag {
    /// A full bag in the reference distribution.
    #[must_use]
    pub fn new() -> Self {
        let mut tiles = Vec::with_capacity(TOTAL_TILES);
        for (face, &count) in ('A'..='Z').zip(LETTER_COUNTS.iter()) {
            tiles.extend(std::iter::repeat_n(Tile::new(face), count));
        }
        tiles.extend(std::iter::repeat_n(Tile::new(BLANK), BLANK_COUNT));
        Self { tiles }
    }

    /// A bag holding exactly `tiles`. Used to stage end-game positions.
    #[must_use]
    pub fn with_tiles(tiles: Vec<Tile>) -> Self {
        Self { tiles }
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.tiles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Count per face, `A..=Z` then `*`, including letters that ran out.
    #[must_use]
    pub fn remaining_by_letter(&self) -> BTreeMap<char, usize> {
        let mut counts: BTreeMap<char, usize> = ('A'..='Z').chain([BLANK]).map(|c| (c, 0)).collect();
        for tile in &self.tiles {
            *counts.entry(tile.face).or_default() += 1;
        }
        counts
    }

    /// Draw `count` tiles uniformly without replacement. Once the bag runs
    /// dry the remaining slots are filled with placeholder tiles.
    pub fn draw<R: Rng + ?Sized>(&mut self, count: usize, rng: &mut R) -> Vec<Tile> {
        (0..count)
            .map(|_| {
                if self.tiles.is_empty() {
                    Tile::empty()
                } else {
                    let index = rng.random_range(0..self.tiles.len());
                    self.tiles.swap_remove(index)
                }
            })
            .collect()
    }

    /// Draw replacements first, then return the discarded tiles, so a player
    /// never draws back what they just threw in.
    pub fn exchange<R: Rng + ?Sized>(&mut self, discarded: Vec<Tile>, rng: &mut R) -> Vec<Tile> {
        let drawn = self.draw(discarded.len(), rng);
        self.tiles.extend(discarded.into_iter().filter(|t| !t.is_empty()));
        drawn
    }
}

impl Default for LetterBag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "bag_test.rs"]
mod tests;
