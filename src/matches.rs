//! A two-player match around one board, fanning changes out to both players.

use crate::error::InternalError;
use crate::games::crossword::{Board, Outcome, PlayView, PlayerId, SlotId};
use crate::protocol::BOARD_COMPLETE;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn};

/// What changed on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardUpdate {
    /// The second player arrived.
    Joined {
        /// Player who opened the match.
        creator: PlayerId,
        /// Player who just joined.
        joiner: PlayerId,
    },
    /// A player made a move.
    Move {
        /// Player who moved.
        mover: PlayerId,
        /// Whether the move was a challenge.
        challenge: bool,
        /// Target slot.
        slot: SlotId,
        /// Word played.
        word: String,
        /// Board verdict.
        outcome: Outcome,
    },
}

/// Detached board state shared with observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSnapshot {
    /// Grid copy.
    pub board: PlayView,
    /// `"<slotId>: <clue>"` lines.
    pub clues: Vec<String>,
    /// `"<playerId>: <score>"` lines in join order.
    pub scores: Vec<String>,
}

/// Receives match notifications for one player.
///
/// Called with the match lock held: implementations must not block and
/// must not call back into the match or the registry.
pub trait MatchObserver: Send + Sync {
    /// The board changed or the second player joined.
    fn on_board_changed(&self, update: &BoardUpdate, snapshot: &MatchSnapshot);

    /// The match is over.
    fn on_match_ended(&self, message: &str, scores: &[String]);
}

struct MatchInner {
    board: Board,
    players: Vec<(PlayerId, Arc<dyn MatchObserver>)>,
    ended: Option<String>,
}

impl MatchInner {
    fn scores(&self) -> Vec<String> {
        self.players
            .iter()
            .map(|(id, _)| format!("{}: {}", id, self.board.score(id)))
            .collect()
    }

    fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            board: self.board.view(),
            clues: self.board.clues(),
            scores: self.scores(),
        }
    }

    fn broadcast(&self, update: &BoardUpdate) {
        let snapshot = self.snapshot();
        for (_, observer) in &self.players {
            observer.on_board_changed(update, &snapshot);
        }
    }

    fn finish(&mut self, message: &str) {
        if self.ended.is_some() {
            debug!("Match already ended");
            return;
        }
        self.ended = Some(message.to_string());
        let scores = self.scores();
        info!(?scores, message, "Match ended");
        for (_, observer) in &self.players {
            observer.on_match_ended(message, &scores);
        }
    }
}

/// One board shared by at most two players.
///
/// Moves, snapshots and notifications all run under a single lock, so moves
/// are applied one at a time and every player sees them in the same order.
pub struct Match {
    id: String,
    description: String,
    inner: Mutex<MatchInner>,
}

impl std::fmt::Debug for Match {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Match")
            .field("id", &self.id)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl Match {
    /// Creates an empty match that owns `board`.
    #[instrument(skip(board), fields(puzzle = %board.name()))]
    pub fn new(id: String, description: String, board: Board) -> Self {
        info!(match_id = %id, "Creating match");
        Self {
            id,
            description,
            inner: Mutex::new(MatchInner {
                board,
                players: Vec::with_capacity(2),
                ended: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MatchInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Match id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Description given at creation.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Players in join order.
    pub fn players(&self) -> Vec<PlayerId> {
        self.lock().players.iter().map(|(id, _)| id.clone()).collect()
    }

    /// Number of players attached.
    pub fn player_count(&self) -> usize {
        self.lock().players.len()
    }

    /// Whether `end` has been called.
    pub fn is_ended(&self) -> bool {
        self.lock().ended.is_some()
    }

    /// Whether a second player may still join.
    pub fn is_open(&self) -> bool {
        let inner = self.lock();
        inner.players.len() == 1 && inner.ended.is_none()
    }

    /// Attaches a player. The second arrival triggers one `Joined` broadcast.
    ///
    /// # Errors
    ///
    /// Returns [`InternalError`] when the match already has two players or
    /// already contains `player`.
    #[instrument(skip(self, observer), fields(match_id = %self.id))]
    pub fn add_player(
        &self,
        player: &str,
        observer: Arc<dyn MatchObserver>,
    ) -> Result<(), InternalError> {
        let mut inner = self.lock();
        if inner.players.len() >= 2 {
            return Err(InternalError::new(format!(
                "match {} already has two players",
                self.id
            )));
        }
        if inner.players.iter().any(|(id, _)| id == player) {
            return Err(InternalError::new(format!(
                "{} is already in match {}",
                player, self.id
            )));
        }

        inner.board.enroll(player);
        inner.players.push((player.to_string(), observer));
        info!(player_id = %player, players = inner.players.len(), "Player added to match");

        if let [(creator, _), (joiner, _)] = inner.players.as_slice() {
            let update = BoardUpdate::Joined {
                creator: creator.clone(),
                joiner: joiner.clone(),
            };
            inner.broadcast(&update);
        }
        Ok(())
    }

    /// Detaches a player, returning how many remain.
    #[instrument(skip(self), fields(match_id = %self.id))]
    pub fn remove_player(&self, player: &str) -> usize {
        let mut inner = self.lock();
        inner.players.retain(|(id, _)| id != player);
        debug!(remaining = inner.players.len(), "Player removed from match");
        inner.players.len()
    }

    /// Enters `word` at `slot` for `player` and notifies both players.
    ///
    /// Completing the grid ends the match.
    #[instrument(skip(self), fields(match_id = %self.id))]
    pub fn try_place(&self, player: &str, slot: SlotId, word: &str) -> Outcome {
        self.play(player, slot, word, false)
    }

    /// Challenges `slot` with `word` for `player` and notifies both players.
    #[instrument(skip(self), fields(match_id = %self.id))]
    pub fn try_challenge(&self, player: &str, slot: SlotId, word: &str) -> Outcome {
        self.play(player, slot, word, true)
    }

    fn play(&self, player: &str, slot: SlotId, word: &str, challenge: bool) -> Outcome {
        let mut inner = self.lock();
        let Some(mover) = inner
            .players
            .iter()
            .find(|(id, _)| id == player)
            .map(|(_, observer)| Arc::clone(observer))
        else {
            warn!(player_id = %player, "Move from a player outside the match");
            return Outcome::Nonexistent;
        };
        if let Some(message) = &inner.ended {
            debug!(player_id = %player, "Move after the match ended");
            mover.on_match_ended(message, &inner.scores());
            return Outcome::Finished;
        }

        let outcome = if challenge {
            inner.board.try_challenge(slot, word, player)
        } else {
            inner.board.try_place(slot, word, player)
        };
        if outcome == Outcome::Finished {
            inner.finish(BOARD_COMPLETE);
        } else {
            inner.broadcast(&BoardUpdate::Move {
                mover: player.to_string(),
                challenge,
                slot,
                word: word.to_string(),
                outcome,
            });
        }
        outcome
    }

    /// Sends every player to the score screen. Only the first call has any effect.
    #[instrument(skip(self), fields(match_id = %self.id))]
    pub fn end(&self, message: &str) {
        self.lock().finish(message);
    }

    /// Current board, clues and scores.
    pub fn snapshot(&self) -> MatchSnapshot {
        self.lock().snapshot()
    }

    /// `"<playerId>: <score>"` lines in join order.
    pub fn scores(&self) -> Vec<String> {
        self.lock().scores()
    }

    /// Whether the board is complete.
    pub fn is_finished(&self) -> bool {
        self.lock().board.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::crossword::{Direction, PuzzleEntry, PuzzleSpec};

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl MatchObserver for Recorder {
        fn on_board_changed(&self, update: &BoardUpdate, snapshot: &MatchSnapshot) {
            let event = match update {
                BoardUpdate::Joined { joiner, .. } => format!("joined {joiner}"),
                BoardUpdate::Move { outcome, .. } => format!("move {outcome}"),
            };
            self.events.lock().unwrap().push(format!("{event} {:?}", snapshot.scores));
        }

        fn on_match_ended(&self, message: &str, _scores: &[String]) {
            self.events.lock().unwrap().push(format!("ended {message}"));
        }
    }

    fn board() -> Board {
        Board::from_spec(&PuzzleSpec::new(
            "Tiny".into(),
            "tiny".into(),
            vec![
                PuzzleEntry::new("cat".into(), "feline".into(), Direction::Across, 0, 0),
                PuzzleEntry::new("cow".into(), "bovine".into(), Direction::Down, 0, 0),
            ],
        ))
        .expect("valid puzzle")
    }

    #[test]
    fn test_join_broadcasts_once_to_both() {
        let game = Match::new("M1".into(), "first".into(), board());
        let (a, b) = (Arc::new(Recorder::default()), Arc::new(Recorder::default()));
        game.add_player("alice", a.clone()).expect("first player");
        assert!(game.is_open());
        assert!(a.events.lock().unwrap().is_empty());

        game.add_player("bob", b.clone()).expect("second player");
        assert!(!game.is_open());
        let expected = vec![r#"joined bob ["alice: 0", "bob: 0"]"#.to_string()];
        assert_eq!(*a.events.lock().unwrap(), expected);
        assert_eq!(*b.events.lock().unwrap(), expected);
    }

    #[test]
    fn test_third_player_is_internal_error() {
        let game = Match::new("M1".into(), "first".into(), board());
        game.add_player("alice", Arc::new(Recorder::default())).unwrap();
        game.add_player("bob", Arc::new(Recorder::default())).unwrap();
        let err = game.add_player("carol", Arc::new(Recorder::default())).unwrap_err();
        assert!(err.message.contains("two players"));
        assert_eq!(game.player_count(), 2);
    }

    #[test]
    fn test_moves_reach_both_players() {
        let game = Match::new("M1".into(), "first".into(), board());
        let (a, b) = (Arc::new(Recorder::default()), Arc::new(Recorder::default()));
        game.add_player("alice", a.clone()).unwrap();
        game.add_player("bob", b.clone()).unwrap();

        let outcome = game.try_place("alice", SlotId::new(1, Direction::Across), "cat");
        assert_eq!(outcome, Outcome::Success);
        assert_eq!(
            b.events.lock().unwrap().last().unwrap(),
            r#"move SUCCESS ["alice: 0", "bob: 0"]"#
        );
    }

    #[test]
    fn test_completing_the_board_ends_the_match() {
        let game = Match::new("M1".into(), "first".into(), board());
        let (a, b) = (Arc::new(Recorder::default()), Arc::new(Recorder::default()));
        game.add_player("alice", a.clone()).unwrap();
        game.add_player("bob", b.clone()).unwrap();

        game.try_place("alice", SlotId::new(1, Direction::Across), "cat");
        let outcome = game.try_place("bob", SlotId::new(1, Direction::Down), "cow");
        assert_eq!(outcome, Outcome::Finished);
        assert!(game.is_ended());
        assert_eq!(game.scores(), vec!["alice: 1", "bob: 1"]);
        for recorder in [&a, &b] {
            assert_eq!(
                recorder.events.lock().unwrap().last().unwrap(),
                &format!("ended {BOARD_COMPLETE}")
            );
        }

        let late = game.try_place("alice", SlotId::new(1, Direction::Across), "cat");
        assert_eq!(late, Outcome::Finished);
        assert_eq!(a.events.lock().unwrap().len(), 4);
        assert_eq!(b.events.lock().unwrap().len(), 3);
    }

    /// Keeps every move update with the scores that came with it.
    #[derive(Default)]
    struct MoveLog {
        moves: Mutex<Vec<(BoardUpdate, Vec<String>)>>,
    }

    impl MatchObserver for MoveLog {
        fn on_board_changed(&self, update: &BoardUpdate, snapshot: &MatchSnapshot) {
            if matches!(update, BoardUpdate::Move { .. }) {
                self.moves
                    .lock()
                    .unwrap()
                    .push((update.clone(), snapshot.scores.clone()));
            }
        }

        fn on_match_ended(&self, _message: &str, _scores: &[String]) {}
    }

    #[test]
    fn test_concurrent_moves_are_seen_in_one_order() {
        use crate::games::crossword::invariants::{BoardInvariants, InvariantSet};

        // The third slot is never played, so the board cannot finish.
        let board = Board::from_spec(&PuzzleSpec::new(
            "Cross".into(),
            "cross".into(),
            vec![
                PuzzleEntry::new("cat".into(), "feline".into(), Direction::Across, 0, 0),
                PuzzleEntry::new("cow".into(), "bovine".into(), Direction::Down, 0, 0),
                PuzzleEntry::new("toe".into(), "digit".into(), Direction::Down, 0, 2),
            ],
        ))
        .expect("valid puzzle");
        let game = Match::new("M1".into(), "busy".into(), board);
        let (a, b) = (Arc::new(MoveLog::default()), Arc::new(MoveLog::default()));
        game.add_player("alice", a.clone()).unwrap();
        game.add_player("bob", b.clone()).unwrap();

        let across = SlotId::new(1, Direction::Across);
        let down = SlotId::new(1, Direction::Down);
        let plays: [(SlotId, &str, bool); 6] = [
            (across, "car", false),
            (down, "dog", false),
            (down, "cow", true),
            (across, "cab", false),
            (across, "cat", true),
            (down, "cot", false),
        ];

        let outcomes: Vec<(&str, Vec<Outcome>)> = std::thread::scope(|scope| {
            let handles: Vec<_> = ["alice", "bob"]
                .into_iter()
                .enumerate()
                .map(|(shift, player)| {
                    let game = &game;
                    scope.spawn(move || {
                        let seen: Vec<Outcome> = (0..300)
                            .map(|i| {
                                let (slot, word, challenge) = plays[(i + shift * 3) % plays.len()];
                                if challenge {
                                    game.try_challenge(player, slot, word)
                                } else {
                                    game.try_place(player, slot, word)
                                }
                            })
                            .collect();
                        (player, seen)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(!game.is_ended());
        assert!(BoardInvariants::check_all(&game.lock().board).is_ok());

        let seen_by_alice = a.moves.lock().unwrap().clone();
        let seen_by_bob = b.moves.lock().unwrap().clone();
        assert_eq!(seen_by_alice.len(), 600);
        assert_eq!(seen_by_alice, seen_by_bob);

        // Each player's own results appear in the shared order as they were returned.
        for (player, returned) in &outcomes {
            let logged: Vec<Outcome> = seen_by_alice
                .iter()
                .filter_map(|(update, _)| match update {
                    BoardUpdate::Move { mover, outcome, .. } if mover == player => Some(*outcome),
                    _ => None,
                })
                .collect();
            assert_eq!(&logged, returned);
        }

        // Replaying the challenge results gives the scores carried by every snapshot.
        let mut totals = std::collections::BTreeMap::from([("alice", 0), ("bob", 0)]);
        for (update, scores) in &seen_by_alice {
            if let BoardUpdate::Move {
                mover,
                challenge: true,
                outcome,
                ..
            } = update
            {
                let points = match outcome {
                    Outcome::Success => 2,
                    Outcome::Failed => -1,
                    _ => 0,
                };
                *totals.get_mut(mover.as_str()).unwrap() += points;
            }
            let expected: Vec<String> = totals.iter().map(|(id, n)| format!("{id}: {n}")).collect();
            assert_eq!(scores, &expected);
        }
        assert_eq!(
            game.scores(),
            vec![format!("alice: {}", totals["alice"]), format!("bob: {}", totals["bob"])]
        );
    }

    #[test]
    fn test_end_is_idempotent() {
        let game = Match::new("M1".into(), "first".into(), board());
        let a = Arc::new(Recorder::default());
        game.add_player("alice", a.clone()).unwrap();
        game.end("bye");
        game.end("again");
        assert!(game.is_ended());
        assert!(!game.is_open());
        assert_eq!(*a.events.lock().unwrap(), vec!["ended bye".to_string()]);
    }
}
