//! Two-player crossword: puzzle definitions, the shared board and its catalog.

mod board;
mod catalog;
pub mod invariants;
mod outcome;
mod parser;
mod puzzle;
mod types;
mod view;

pub use board::{Board, MAX_DIMENSION, Slot};
pub use catalog::Catalog;
pub use outcome::Outcome;
pub use parser::{PuzzleParseError, parse_puzzle};
pub use puzzle::{PuzzleEntry, PuzzleError, PuzzleSpec};
pub use types::{Cell, Direction, Glyph, Membership, PlayerId, SlotId, SlotIdError};
pub use view::{CellView, PlayView};
