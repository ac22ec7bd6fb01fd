//! Per-connection protocol state machine.

use crate::error::InternalError;
use crate::games::crossword::PlayerId;
use crate::matches::{BoardUpdate, Match, MatchObserver, MatchSnapshot};
use crate::protocol::{
    Command, CommandError, PLAYER_LEFT, ProtocolState, STOPPED_WAITING, ServerResponse,
    outcome_message, parse_command,
};
use crate::registry::{Outbox, Registry, RegistryError, SessionHandle};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// What the connection should do after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading.
    Continue,
    /// Close the connection.
    Close,
}

/// Match notifications for one player, turned into snapshots on its outbox.
#[derive(Debug)]
pub struct SessionObserver {
    player: PlayerId,
    handle: SessionHandle,
}

impl SessionObserver {
    /// Creates an observer pushing to `handle` on behalf of `player`.
    pub fn new(player: PlayerId, handle: SessionHandle) -> Self {
        Self { player, handle }
    }
}

impl MatchObserver for SessionObserver {
    fn on_board_changed(&self, update: &BoardUpdate, snapshot: &MatchSnapshot) {
        let message = match update {
            BoardUpdate::Joined { creator, joiner } => {
                self.handle.set_state(ProtocolState::Play);
                Some(if *joiner == self.player {
                    format!("You have joined a match with {creator}")
                } else {
                    format!("{joiner} has joined your match")
                })
            }
            BoardUpdate::Move {
                mover,
                challenge,
                slot,
                word,
                outcome,
            } => {
                if *mover == self.player {
                    Some(outcome_message(*outcome, *challenge, *slot, word))
                } else if !outcome.mutated() {
                    None
                } else if *challenge {
                    Some(format!("{mover} challenged {slot} with {word}"))
                } else {
                    Some(format!("{mover} placed {word} at {slot}"))
                }
            }
        };
        self.handle.send(ServerResponse::Play {
            message,
            board: snapshot.board.clone(),
            clues: snapshot.clues.clone(),
            scores: snapshot.scores.clone(),
        });
    }

    fn on_match_ended(&self, message: &str, scores: &[String]) {
        self.handle.set_state(ProtocolState::Score);
        self.handle.send(ServerResponse::Score {
            message: (!message.is_empty()).then(|| message.to_string()),
            scores: scores.to_vec(),
        });
    }
}

/// One connected player.
///
/// Lines are handled one at a time; the opponent can still move this
/// session between WAIT, PLAY and SCORE through match notifications.
pub struct Session {
    registry: Arc<Registry>,
    handle: SessionHandle,
    player: Option<PlayerId>,
    current: Option<Arc<Match>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("player", &self.player)
            .field("state", &self.handle.state())
            .field("match", &self.current.as_ref().map(|m| m.id().to_string()))
            .finish()
    }
}

impl Session {
    /// Creates a session in START and queues the opening snapshot.
    pub fn new(registry: Arc<Registry>, outbox: Outbox) -> Self {
        let handle = SessionHandle::new(outbox);
        handle.send(ServerResponse::Start { message: None });
        Self {
            registry,
            handle,
            player: None,
            current: None,
        }
    }

    /// Current protocol state.
    pub fn state(&self) -> ProtocolState {
        self.handle.state()
    }

    /// Reserved player id, once past START.
    pub fn player_id(&self) -> Option<&str> {
        self.player.as_deref()
    }

    /// Handles one command line.
    ///
    /// # Errors
    ///
    /// Returns [`InternalError`] when registry or match bookkeeping is
    /// inconsistent. The caller should drop the connection.
    #[instrument(skip(self), fields(player_id = ?self.player))]
    pub fn handle_line(&mut self, line: &str) -> Result<Flow, InternalError> {
        let state = self.handle.state();
        let command = match parse_command(state, line) {
            Ok(command) => command,
            Err(e) => {
                debug!(%state, error = %e, "Rejected command");
                self.reject(state, &e);
                return Ok(Flow::Continue);
            }
        };
        debug!(%state, ?command, "Handling command");

        match (state, command) {
            (ProtocolState::Start, Command::Login { player_id }) => {
                match self.registry.reserve_id(&player_id, self.handle.clone()) {
                    Ok(()) => {
                        info!(player_id = %player_id, "Player logged in");
                        self.player = Some(player_id);
                    }
                    Err(e) => self.reject(state, &e),
                }
            }
            (ProtocolState::Choose, Command::Join { match_id }) => {
                let player = self.require_player()?;
                let observer = self.observer(&player);
                match self.registry.join_match(&player, &match_id, observer) {
                    Ok(game) => self.current = Some(game),
                    Err(e) => self.registry_failure(state, e)?,
                }
            }
            (
                ProtocolState::Choose,
                Command::Create {
                    match_id,
                    puzzle_id,
                    description,
                },
            ) => {
                let player = self.require_player()?;
                let observer = self.observer(&player);
                match self.registry.create_match(
                    &player,
                    &match_id,
                    &puzzle_id,
                    &description,
                    observer,
                ) {
                    Ok(game) => self.current = Some(game),
                    Err(e) => self.registry_failure(state, e)?,
                }
            }
            (ProtocolState::Choose | ProtocolState::Score, Command::Exit) => {
                self.disconnect();
                return Ok(Flow::Close);
            }
            (ProtocolState::Wait, Command::Exit) => {
                let player = self.require_player()?;
                if self
                    .registry
                    .leave_match(&player, ProtocolState::Wait, Some(STOPPED_WAITING))
                {
                    self.current = None;
                } else {
                    // An opponent joined first: leaving now abandons a running match.
                    self.require_match()?.end(PLAYER_LEFT);
                }
            }
            (ProtocolState::Play, Command::Try { slot, word }) => {
                let player = self.require_player()?;
                let outcome = self.require_match()?.try_place(&player, slot, &word);
                info!(%slot, %word, %outcome, "TRY");
            }
            (ProtocolState::Play, Command::Challenge { slot, word }) => {
                let player = self.require_player()?;
                let outcome = self.require_match()?.try_challenge(&player, slot, &word);
                info!(%slot, %word, %outcome, "CHALLENGE");
            }
            (ProtocolState::Play, Command::Exit) => {
                self.require_match()?.end(PLAYER_LEFT);
            }
            (ProtocolState::Score, Command::NewMatch) => {
                let player = self.require_player()?;
                if self
                    .registry
                    .leave_match(&player, ProtocolState::Score, None)
                {
                    self.current = None;
                }
            }
            (state, command) => {
                return Err(InternalError::new(format!(
                    "{command:?} parsed but not handled in {state}"
                )));
            }
        }
        Ok(Flow::Continue)
    }

    /// Tears the session down as if the player sent EXIT.
    ///
    /// A running match ends for the opponent; an open match is dropped.
    #[instrument(skip(self), fields(player_id = ?self.player))]
    pub fn disconnect(&mut self) {
        if let Some(game) = self.current.take()
            && self.handle.state() == ProtocolState::Play
        {
            game.end(PLAYER_LEFT);
        }
        if let Some(player) = self.player.take() {
            self.registry.release(&player);
            info!(player_id = %player, "Player disconnected");
        }
    }

    fn observer(&self, player: &str) -> Arc<dyn MatchObserver> {
        Arc::new(SessionObserver::new(player.to_string(), self.handle.clone()))
    }

    fn require_player(&self) -> Result<PlayerId, InternalError> {
        self.player
            .clone()
            .ok_or_else(|| InternalError::new("session has no player id past START"))
    }

    fn require_match(&self) -> Result<&Arc<Match>, InternalError> {
        self.current
            .as_ref()
            .ok_or_else(|| InternalError::new(format!("no match in {}", self.handle.state())))
    }

    fn registry_failure(&self, state: ProtocolState, e: RegistryError) -> Result<(), InternalError> {
        match e {
            RegistryError::Command(e) => {
                self.reject(state, &e);
                Ok(())
            }
            RegistryError::Internal(e) => {
                error!(error = %e, "Registry bookkeeping failed");
                Err(e)
            }
        }
    }

    /// Sends an in-state diagnostic without changing state.
    fn reject(&self, state: ProtocolState, e: &CommandError) {
        let message = Some(e.to_string());
        let response = match (state, &self.current) {
            (ProtocolState::Start, _) => ServerResponse::Start { message },
            (ProtocolState::Choose, _) => ServerResponse::Choose {
                message,
                games: self.registry.games(),
            },
            (ProtocolState::Wait, _) => ServerResponse::Wait { message },
            (ProtocolState::Play, Some(game)) => {
                let snapshot = game.snapshot();
                ServerResponse::Play {
                    message,
                    board: snapshot.board,
                    clues: snapshot.clues,
                    scores: snapshot.scores,
                }
            }
            (ProtocolState::Score, Some(game)) => ServerResponse::Score {
                message,
                scores: game.scores(),
            },
            (ProtocolState::Play | ProtocolState::Score, None) => {
                warn!(%state, "No match to report against");
                ServerResponse::Score {
                    message,
                    scores: Vec::new(),
                }
            }
        };
        self.handle.send(response);
    }
}
