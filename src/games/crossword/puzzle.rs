//! Immutable puzzle definitions handed to the board builder.

use super::types::{Direction, SlotId};
use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_new::new;
use serde::{Deserialize, Serialize};

/// One word placement in a puzzle.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize, new)]
pub struct PuzzleEntry {
    /// Solution word.
    word: String,
    /// Clue shown to players.
    clue: String,
    /// Orientation.
    direction: Direction,
    /// Row of the first letter.
    row: usize,
    /// Column of the first letter.
    col: usize,
}

/// A complete puzzle: name, description and word placements.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize, new)]
pub struct PuzzleSpec {
    /// Display name.
    name: String,
    /// Free-form description.
    description: String,
    /// Word placements in declaration order.
    entries: Vec<PuzzleEntry>,
}

/// Reasons a puzzle cannot be turned into a board.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum PuzzleError {
    /// The puzzle has no entries at all.
    #[display("Puzzle has no entries")]
    NoEntries,

    /// An entry's word is empty or contains something other than letters and hyphens.
    #[display("Entry {:?} is not a valid word", word)]
    InvalidWord {
        /// The rejected word.
        word: String,
    },

    /// An entry reaches past the largest supported grid.
    #[display("Entry {:?} at ({}, {}) does not fit in a {}x{} grid", word, row, col, limit, limit)]
    TooLarge {
        /// The offending word.
        word: String,
        /// Start row.
        row: usize,
        /// Start column.
        col: usize,
        /// Largest allowed row and column count.
        limit: usize,
    },

    /// Two entries in the same direction start at the same coordinate.
    #[display("More than one {} entry starts at ({}, {})", direction, row, col)]
    DuplicateStart {
        /// Shared orientation.
        direction: Direction,
        /// Shared start row.
        row: usize,
        /// Shared start column.
        col: usize,
    },

    /// Two entries in the same direction cover the same cell.
    #[display("{} overlaps {} at ({}, {})", slot, other, row, col)]
    Overlap {
        /// Slot being placed.
        slot: SlotId,
        /// Slot already covering the cell.
        other: SlotId,
        /// Row of the shared cell.
        row: usize,
        /// Column of the shared cell.
        col: usize,
    },

    /// Two crossing entries disagree on the shared letter.
    #[display("{} and {} disagree at ({}, {}): '{}' vs '{}'", slot, other, row, col, expected, found)]
    ConflictingCrossing {
        /// Slot being placed.
        slot: SlotId,
        /// Slot already covering the cell.
        other: SlotId,
        /// Row of the shared cell.
        row: usize,
        /// Column of the shared cell.
        col: usize,
        /// Letter already placed.
        expected: char,
        /// Letter the new slot wants.
        found: char,
    },
}
