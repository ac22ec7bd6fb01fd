//! Results of placing or challenging a word.

use serde::{Deserialize, Serialize};

/// Result of [`Board::try_place`](super::Board::try_place) or
/// [`Board::try_challenge`](super::Board::try_challenge).
///
/// Exactly one outcome is reported per call. Only `Success`, `Failed` and
/// `Finished` can follow a mutation; every other variant leaves the board
/// untouched.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    /// No slot with that id.
    #[display("NONEXISTENT")]
    Nonexistent,
    /// Word length differs from the slot length.
    #[display("WRONG_LENGTH")]
    WrongLength,
    /// Every cell of the slot is confirmed.
    #[display("CONFIRMED")]
    Confirmed,
    /// Another player owns the slot with different letters.
    #[display("WORD_OWNED")]
    WordOwned,
    /// Slot is empty or owned by the challenger.
    #[display("CANT_CHALLENGE")]
    CantChallenge,
    /// Placement would overwrite a confirmed or foreign-owned letter.
    #[display("CONFLICT")]
    Conflict,
    /// Challenge word equals the word already entered.
    #[display("SAME_WORD")]
    SameWord,
    /// Move applied; board not complete.
    #[display("SUCCESS")]
    Success,
    /// Challenge resolved against the challenger.
    #[display("FAILED")]
    Failed,
    /// Board is complete.
    #[display("FINISHED")]
    Finished,
}

impl Outcome {
    /// Whether the call may have changed the board.
    pub fn mutated(self) -> bool {
        matches!(self, Outcome::Success | Outcome::Failed | Outcome::Finished)
    }
}
