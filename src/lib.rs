//! Crossword Duel library - two-player competitive crossword over TCP
//!
//! Two players share one crossword grid, entering words, challenging each
//! other's entries and collecting points until the grid is solved.
//!
//! # Architecture
//!
//! - **Games**: the crossword board engine, puzzle parser and catalog
//! - **Match**: one board shared by two players, fanning out every change
//! - **Session**: per-connection START/CHOOSE/WAIT/PLAY/SCORE state machine
//! - **Registry**: process-wide directory of players, matches and puzzles
//! - **Server**: tokio TCP front end speaking newline-delimited JSON
//!
//! # Example
//!
//! ```
//! use crossword_duel::{Board, Outcome, SlotId, parse_puzzle};
//!
//! # fn example() -> anyhow::Result<()> {
//! let spec = parse_puzzle(r#">> "Tiny" "one word" (cat, "feline", ACROSS, 0, 0)"#)?;
//! let mut board = Board::from_spec(&spec)?;
//! let slot: SlotId = "1ACROSS".parse()?;
//! assert_eq!(board.try_place(slot, "cat", "alice"), Outcome::Finished);
//! assert_eq!(board.score("alice"), 1);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod cli;
mod config;
mod error;
mod games;
mod matches;
mod protocol;
mod registry;
mod server;
mod session;

// Crate-level exports - CLI
pub use cli::{Cli, Command};

// Crate-level exports - Configuration and errors
pub use config::ServerConfig;
pub use error::{ConfigError, InternalError};

// Crate-level exports - Crossword game types
pub use games::crossword::{
    Board, Catalog, MAX_DIMENSION, Cell, CellView, Direction, Glyph, Membership, Outcome, PlayView, PlayerId,
    PuzzleEntry, PuzzleError, PuzzleParseError, PuzzleSpec, Slot, SlotId, SlotIdError,
    parse_puzzle,
};
pub use games::crossword::invariants;

// Crate-level exports - Matches, protocol and sessions
pub use matches::{BoardUpdate, Match, MatchObserver, MatchSnapshot};
pub use protocol::{
    BOARD_COMPLETE, Command as PlayerCommand, CommandError, PLAYER_LEFT, ProtocolState, STOPPED_WAITING, ServerResponse,
    outcome_message, parse_command,
};
pub use registry::{Outbox, Registry, RegistryError, SessionHandle};
pub use session::{Flow, Session, SessionObserver};

// Crate-level exports - Server
pub use server::CrosswordServer;
