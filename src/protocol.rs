//! Wire vocabulary: protocol states, player commands and server snapshots.
//!
//! Commands arrive one per line as plain text. Every response is a
//! [`ServerResponse`] serialized as a single JSON line, tagged by the state
//! the player is in after the command.

use crate::games::crossword::{Outcome, PlayView, SlotId};
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Connection lifecycle state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum ProtocolState {
    /// Waiting for a player id.
    Start,
    /// Picking a match to join or create.
    Choose,
    /// Created a match, waiting for an opponent.
    Wait,
    /// Playing.
    Play,
    /// Match over, scores shown.
    Score,
}

/// A parsed player command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// START: claim a player id.
    Login {
        /// Requested id.
        player_id: String,
    },
    /// CHOOSE: join an open match.
    Join {
        /// Match to join.
        match_id: String,
    },
    /// CHOOSE: open a new match on a catalog puzzle.
    Create {
        /// New match id.
        match_id: String,
        /// Catalog id of the puzzle.
        puzzle_id: String,
        /// Free-form match description.
        description: String,
    },
    /// PLAY: enter a word.
    Try {
        /// Target slot.
        slot: SlotId,
        /// Word to enter.
        word: String,
    },
    /// PLAY: dispute the opponent's word.
    Challenge {
        /// Target slot.
        slot: SlotId,
        /// Proposed replacement.
        word: String,
    },
    /// SCORE: go back to CHOOSE.
    NewMatch,
    /// Leave the current state; ends the connection from CHOOSE and SCORE.
    Exit,
}

/// Player-facing diagnostics. The `Display` text is sent verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum CommandError {
    /// START input is not alphanumeric.
    #[display("Invalid player ID. ID must be alphanumeric")]
    InvalidPlayerId,
    /// Another connection holds the id.
    #[display("{} player ID already in use", id)]
    PlayerIdInUse {
        /// The contested id.
        id: String,
    },
    /// No open match with that id.
    #[display("Couldn't find match by that ID")]
    UnknownMatch,
    /// Match already has two players.
    #[display("That match already has two players")]
    MatchFull,
    /// No catalog puzzle with that id.
    #[display("Couldn't find board by that ID")]
    UnknownBoard,
    /// A match with that id exists.
    #[display("Please specify a unique Match ID")]
    DuplicateMatch,
    /// CHOOSE input matched no command.
    #[display("Couldn't understand command")]
    NotUnderstood,
    /// WAIT input other than EXIT.
    #[display("Please wait for another player to join.")]
    StillWaiting,
    /// PLAY input matched no command.
    #[display("Unparsable command")]
    Unparsable,
    /// SCORE input matched no command.
    #[display("Unknown command")]
    Unknown,
}

fn is_id(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric())
}

fn is_puzzle_id(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '(' | ')'))
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphabetic() || c == '-')
}

/// Parses `line` as a command valid in `state`.
///
/// Keywords are case-insensitive. Match and puzzle ids are upper-cased.
///
/// # Errors
///
/// Returns the in-state diagnostic when the line matches no command.
#[instrument(level = "debug")]
pub fn parse_command(state: ProtocolState, line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    let upper = line.to_uppercase();
    if state != ProtocolState::Start && upper == "EXIT" {
        return Ok(Command::Exit);
    }

    match state {
        ProtocolState::Start => {
            if is_id(line) {
                Ok(Command::Login {
                    player_id: line.to_string(),
                })
            } else {
                Err(CommandError::InvalidPlayerId)
            }
        }
        ProtocolState::Choose => parse_choose(line).ok_or(CommandError::NotUnderstood),
        ProtocolState::Wait => Err(CommandError::StillWaiting),
        ProtocolState::Play => parse_move(line).ok_or(CommandError::Unparsable),
        ProtocolState::Score => {
            if upper.split_whitespace().eq(["NEW", "MATCH"]) {
                Ok(Command::NewMatch)
            } else {
                Err(CommandError::Unknown)
            }
        }
    }
}

fn parse_choose(line: &str) -> Option<Command> {
    let (keyword, rest) = line.split_once(char::is_whitespace)?;
    match keyword.to_uppercase().as_str() {
        "PLAY" => {
            let match_id = rest.trim();
            is_id(match_id).then(|| Command::Join {
                match_id: match_id.to_uppercase(),
            })
        }
        "NEW" => {
            let (ids, quoted) = rest.split_once('"')?;
            let description = quoted.strip_suffix('"')?;
            if description.contains('"') {
                return None;
            }
            let mut ids = ids.split_whitespace();
            let (match_id, puzzle_id) = (ids.next()?, ids.next()?);
            if ids.next().is_some() || !is_id(match_id) || !is_puzzle_id(puzzle_id) {
                return None;
            }
            Some(Command::Create {
                match_id: match_id.to_uppercase(),
                puzzle_id: puzzle_id.to_uppercase(),
                description: description.to_string(),
            })
        }
        _ => None,
    }
}

fn parse_move(line: &str) -> Option<Command> {
    let mut tokens = line.split_whitespace();
    let (keyword, slot, word) = (tokens.next()?, tokens.next()?, tokens.next()?);
    if tokens.next().is_some() || !is_word(word) {
        return None;
    }
    let slot: SlotId = slot.parse().ok()?;
    let word = word.to_lowercase();
    match keyword.to_uppercase().as_str() {
        "TRY" => Some(Command::Try { slot, word }),
        "CHALLENGE" => Some(Command::Challenge { slot, word }),
        _ => None,
    }
}

/// Score-screen message when the grid is solved.
pub const BOARD_COMPLETE: &str = "Congrats! All correct words were placed on the board!";

/// Score-screen message when a player exits or drops mid-match.
pub const PLAYER_LEFT: &str = "A player left the match";

/// CHOOSE message after abandoning an open match.
pub const STOPPED_WAITING: &str =
    "You stopped waiting for another player to join. Choose a new option";

/// Message reported to the player who made a move.
pub fn outcome_message(outcome: Outcome, challenge: bool, slot: SlotId, word: &str) -> String {
    match (outcome, challenge) {
        (Outcome::Success, false) => format!("successfully placed word {word}"),
        (Outcome::Success, true) => {
            format!("successfully removed previous word and replaced with {word}")
        }
        (Outcome::Conflict, _) => format!("{word} conflicts with another word already on the board"),
        (Outcome::WordOwned, _) => format!("Opponent has already placed a word at {slot}"),
        (Outcome::WrongLength, _) => format!("{word} is incorrect length"),
        (Outcome::Confirmed, _) => format!("the word at {slot} has already been confirmed"),
        (Outcome::Nonexistent, _) => format!("{slot} is a nonexistent ID"),
        (Outcome::Failed, _) => "your challenge was unsuccessful".to_string(),
        (Outcome::SameWord, _) => {
            "you challenged with the same word that was on the board".to_string()
        }
        (Outcome::CantChallenge, _) => {
            format!("you have challenged your own word or there is no word at {slot}")
        }
        (Outcome::Finished, _) => "the board is already complete".to_string(),
    }
}

/// Snapshot pushed to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "UPPERCASE")]
pub enum ServerResponse {
    /// Awaiting a player id.
    Start {
        /// Diagnostic, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Choosing a match.
    Choose {
        /// Diagnostic or notice, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        /// Open matches and catalog puzzles.
        games: Vec<String>,
    },
    /// Waiting for an opponent.
    Wait {
        /// Notice, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Playing.
    Play {
        /// Move result or notice, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        /// Current grid.
        board: PlayView,
        /// `"<slotId>: <clue>"` lines.
        clues: Vec<String>,
        /// `"<playerId>: <score>"` lines.
        scores: Vec<String>,
    },
    /// Match over.
    Score {
        /// Why the match ended, or a diagnostic.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        /// `"<playerId>: <score>"` lines.
        scores: Vec<String>,
    },
}

impl ServerResponse {
    /// State the snapshot belongs to.
    pub fn state(&self) -> ProtocolState {
        match self {
            ServerResponse::Start { .. } => ProtocolState::Start,
            ServerResponse::Choose { .. } => ProtocolState::Choose,
            ServerResponse::Wait { .. } => ProtocolState::Wait,
            ServerResponse::Play { .. } => ProtocolState::Play,
            ServerResponse::Score { .. } => ProtocolState::Score,
        }
    }

    /// Attached message, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            ServerResponse::Start { message }
            | ServerResponse::Choose { message, .. }
            | ServerResponse::Wait { message }
            | ServerResponse::Play { message, .. }
            | ServerResponse::Score { message, .. } => message.as_deref(),
        }
    }
}
