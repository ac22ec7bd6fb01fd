//! Process-wide directory of players, matches and the puzzle catalog.

use crate::error::InternalError;
use crate::games::crossword::{Catalog, PlayerId};
use crate::matches::{Match, MatchObserver};
use crate::protocol::{CommandError, ProtocolState, ServerResponse};
use derive_more::{Display, Error, From};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, instrument, warn};

/// Outgoing snapshot queue of one connection.
pub type Outbox = UnboundedSender<ServerResponse>;

/// Shared view of one connection: its protocol state and its outbox.
///
/// The state cell is written by the connection itself and by match
/// notifications from the opponent.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    state: Arc<Mutex<ProtocolState>>,
    outbox: Outbox,
}

impl SessionHandle {
    /// Creates a handle in START.
    pub fn new(outbox: Outbox) -> Self {
        Self {
            state: Arc::new(Mutex::new(ProtocolState::Start)),
            outbox,
        }
    }

    fn cell(&self) -> MutexGuard<'_, ProtocolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current protocol state.
    pub fn state(&self) -> ProtocolState {
        *self.cell()
    }

    /// Moves to `state`.
    pub fn set_state(&self, state: ProtocolState) {
        *self.cell() = state;
    }

    /// Queues a snapshot. A closed connection drops it silently.
    pub fn send(&self, response: ServerResponse) {
        if self.outbox.send(response).is_err() {
            debug!("Outbox closed, dropping response");
        }
    }
}

/// Failure of a registry operation.
#[derive(Debug, Display, Error, From)]
pub enum RegistryError {
    /// Bad request from the player; reported in-state.
    Command(CommandError),
    /// Broken bookkeeping; fatal to the connection.
    Internal(InternalError),
}

#[derive(Default)]
struct Directory {
    players: HashMap<PlayerId, SessionHandle>,
    memberships: HashMap<PlayerId, String>,
    matches: BTreeMap<String, Arc<Match>>,
}

impl Directory {
    fn handle(&self, player: &str) -> Result<&SessionHandle, InternalError> {
        self.players
            .get(player)
            .ok_or_else(|| InternalError::new(format!("{player} is not registered")))
    }

    fn games(&self, catalog: &Catalog) -> Vec<String> {
        self.matches
            .values()
            .filter(|m| m.is_open())
            .map(|m| format!("Match: {} \"{}\"", m.id(), m.description()))
            .chain(catalog.listing())
            .collect()
    }

    /// Pushes the games list to every player in CHOOSE except `actor`.
    fn refresh_choosers(&self, catalog: &Catalog, actor: &str) {
        let games = self.games(catalog);
        let choosers = self
            .players
            .iter()
            .filter(|(id, handle)| id.as_str() != actor && handle.state() == ProtocolState::Choose);
        for (id, handle) in choosers {
            debug!(player_id = %id, "Refreshing games list");
            handle.send(ServerResponse::Choose {
                message: None,
                games: games.clone(),
            });
        }
    }

    /// Detaches `player` from its match, dropping the match once empty.
    fn detach(&mut self, player: &str) -> Option<Arc<Match>> {
        let match_id = self.memberships.remove(player)?;
        let game = self.matches.get(&match_id).cloned()?;
        if game.remove_player(player) == 0 {
            info!(match_id = %match_id, "Dropping empty match");
            self.matches.remove(&match_id);
        }
        Some(game)
    }
}

/// Directory of connected players and live matches over an immutable catalog.
///
/// Every operation takes one coarse lock. Lock order is registry, then
/// match, then session state; nothing acquires them the other way round.
pub struct Registry {
    catalog: Catalog,
    directory: Mutex<Directory>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("puzzles", &self.catalog.len())
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// Creates a registry serving `catalog`.
    #[instrument(skip(catalog), fields(puzzles = catalog.len()))]
    pub fn new(catalog: Catalog) -> Self {
        info!("Creating registry");
        Self {
            catalog,
            directory: Mutex::new(Directory::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Directory> {
        self.directory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Puzzle templates.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Open matches then catalog puzzles, as listing lines.
    pub fn games(&self) -> Vec<String> {
        self.lock().games(&self.catalog)
    }

    /// Number of connected players with a reserved id.
    pub fn player_count(&self) -> usize {
        self.lock().players.len()
    }

    /// Open or running match with the given id.
    pub fn find_match(&self, match_id: &str) -> Option<Arc<Match>> {
        self.lock().matches.get(match_id).cloned()
    }

    /// Match `player` currently belongs to.
    pub fn match_of(&self, player: &str) -> Option<Arc<Match>> {
        let directory = self.lock();
        let match_id = directory.memberships.get(player)?;
        directory.matches.get(match_id).cloned()
    }

    /// Claims `player` for `handle`, moving it to CHOOSE with the games list.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidPlayerId`] for a non-alphanumeric id and
    /// [`CommandError::PlayerIdInUse`] when another connection holds it.
    #[instrument(skip(self, handle))]
    pub fn reserve_id(&self, player: &str, handle: SessionHandle) -> Result<(), CommandError> {
        if player.is_empty() || !player.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CommandError::InvalidPlayerId);
        }
        let mut directory = self.lock();
        if directory.players.contains_key(player) {
            warn!(player_id = %player, "Player id already in use");
            return Err(CommandError::PlayerIdInUse {
                id: player.to_string(),
            });
        }

        handle.set_state(ProtocolState::Choose);
        handle.send(ServerResponse::Choose {
            message: None,
            games: directory.games(&self.catalog),
        });
        directory.players.insert(player.to_string(), handle);
        info!(player_id = %player, "Player id reserved");
        Ok(())
    }

    /// Opens a match on a copy of a catalog puzzle and puts `player` in WAIT.
    ///
    /// # Errors
    ///
    /// Unknown puzzle or taken match id are [`CommandError`]s; a player who
    /// is unregistered or already in a match is an [`InternalError`].
    #[instrument(skip(self, observer))]
    pub fn create_match(
        &self,
        player: &str,
        match_id: &str,
        puzzle_id: &str,
        description: &str,
        observer: Arc<dyn MatchObserver>,
    ) -> Result<Arc<Match>, RegistryError> {
        let mut directory = self.lock();
        let template = self
            .catalog
            .get(puzzle_id)
            .ok_or(CommandError::UnknownBoard)?;
        if directory.matches.contains_key(match_id) {
            return Err(CommandError::DuplicateMatch.into());
        }
        if let Some(current) = directory.memberships.get(player) {
            return Err(InternalError::new(format!("{player} is already in match {current}")).into());
        }
        let handle = directory.handle(player)?.clone();

        let game = Arc::new(Match::new(
            match_id.to_string(),
            description.to_string(),
            template.clone(),
        ));
        game.add_player(player, observer)?;
        handle.set_state(ProtocolState::Wait);
        handle.send(ServerResponse::Wait { message: None });

        directory.matches.insert(match_id.to_string(), Arc::clone(&game));
        directory
            .memberships
            .insert(player.to_string(), match_id.to_string());
        directory.refresh_choosers(&self.catalog, player);
        info!(player_id = %player, match_id, puzzle_id, "Match opened");
        Ok(game)
    }

    /// Adds `player` as the second player of an open match.
    ///
    /// Both players move to PLAY through their observers.
    ///
    /// # Errors
    ///
    /// Unknown or ended match and full match are [`CommandError`]s; a player
    /// already in a match is an [`InternalError`].
    #[instrument(skip(self, observer))]
    pub fn join_match(
        &self,
        player: &str,
        match_id: &str,
        observer: Arc<dyn MatchObserver>,
    ) -> Result<Arc<Match>, RegistryError> {
        let mut directory = self.lock();
        let game = directory
            .matches
            .get(match_id)
            .filter(|m| !m.is_ended())
            .cloned()
            .ok_or(CommandError::UnknownMatch)?;
        if game.player_count() >= 2 {
            return Err(CommandError::MatchFull.into());
        }
        if let Some(current) = directory.memberships.get(player) {
            return Err(InternalError::new(format!("{player} is already in match {current}")).into());
        }
        directory.handle(player)?;

        game.add_player(player, observer)?;
        directory
            .memberships
            .insert(player.to_string(), match_id.to_string());
        directory.refresh_choosers(&self.catalog, player);
        info!(player_id = %player, match_id, "Player joined match");
        Ok(game)
    }

    /// Takes `player` out of its match and back to CHOOSE, if it is still in `from`.
    ///
    /// Returns `false` without changing anything when the player's state has
    /// moved on, e.g. an opponent joined while the player was leaving WAIT.
    #[instrument(skip(self))]
    pub fn leave_match(&self, player: &str, from: ProtocolState, message: Option<&str>) -> bool {
        let mut directory = self.lock();
        let Some(handle) = directory.players.get(player).cloned() else {
            warn!(player_id = %player, "Leave from unregistered player");
            return false;
        };
        if handle.state() != from {
            debug!(player_id = %player, state = %handle.state(), "State changed before leave");
            return false;
        }

        directory.detach(player);
        handle.set_state(ProtocolState::Choose);
        handle.send(ServerResponse::Choose {
            message: message.map(str::to_string),
            games: directory.games(&self.catalog),
        });
        directory.refresh_choosers(&self.catalog, player);
        info!(player_id = %player, "Player back to choosing");
        true
    }

    /// Forgets `player` entirely, detaching it from any match.
    #[instrument(skip(self))]
    pub fn release(&self, player: &str) {
        let mut directory = self.lock();
        directory.detach(player);
        if directory.players.remove(player).is_some() {
            info!(player_id = %player, "Player id released");
        }
        directory.refresh_choosers(&self.catalog, player);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::crossword::{Direction, PuzzleEntry, PuzzleSpec};
    use crate::matches::{BoardUpdate, MatchSnapshot};
    use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

    struct Silent;

    impl MatchObserver for Silent {
        fn on_board_changed(&self, _: &BoardUpdate, _: &MatchSnapshot) {}
        fn on_match_ended(&self, _: &str, _: &[String]) {}
    }

    fn registry() -> Registry {
        let specs = [PuzzleSpec::new(
            "Easy".into(),
            "an easy one".into(),
            vec![PuzzleEntry::new("cat".into(), "feline".into(), Direction::Across, 0, 0)],
        )];
        Registry::new(Catalog::from_specs(&specs))
    }

    fn connect(registry: &Registry, id: &str) -> (SessionHandle, UnboundedReceiver<ServerResponse>) {
        let (tx, mut rx) = unbounded_channel();
        let handle = SessionHandle::new(tx);
        registry.reserve_id(id, handle.clone()).expect("reserve");
        assert!(matches!(rx.try_recv(), Ok(ServerResponse::Choose { .. })));
        (handle, rx)
    }

    #[test]
    fn test_reserve_rejects_duplicates_and_bad_ids() {
        let registry = registry();
        let _alice = connect(&registry, "alice");
        let (tx, _rx) = unbounded_channel();
        assert_eq!(
            registry.reserve_id("alice", SessionHandle::new(tx.clone())),
            Err(CommandError::PlayerIdInUse { id: "alice".into() })
        );
        assert_eq!(
            registry.reserve_id("al ice", SessionHandle::new(tx)),
            Err(CommandError::InvalidPlayerId)
        );
        assert_eq!(registry.player_count(), 1);
    }

    #[test]
    fn test_games_list_open_matches_then_boards() {
        let registry = registry();
        let (alice, _rx) = connect(&registry, "alice");
        registry
            .create_match("alice", "M1", "EASY", "come play", Arc::new(Silent))
            .expect("create");
        assert_eq!(alice.state(), ProtocolState::Wait);
        assert_eq!(
            registry.games(),
            vec!["Match: M1 \"come play\"", "Board: EASY \"an easy one\""]
        );
    }

    #[test]
    fn test_create_and_join_errors() {
        let registry = registry();
        let _a = connect(&registry, "alice");
        let _b = connect(&registry, "bob");
        let _c = connect(&registry, "carol");

        assert!(matches!(
            registry.create_match("alice", "M1", "HARD", "d", Arc::new(Silent)),
            Err(RegistryError::Command(CommandError::UnknownBoard))
        ));
        registry
            .create_match("alice", "M1", "EASY", "d", Arc::new(Silent))
            .expect("create");
        assert!(matches!(
            registry.create_match("bob", "M1", "EASY", "d", Arc::new(Silent)),
            Err(RegistryError::Command(CommandError::DuplicateMatch))
        ));
        assert!(matches!(
            registry.join_match("bob", "M2", Arc::new(Silent)),
            Err(RegistryError::Command(CommandError::UnknownMatch))
        ));
        registry.join_match("bob", "M1", Arc::new(Silent)).expect("join");
        assert!(matches!(
            registry.join_match("carol", "M1", Arc::new(Silent)),
            Err(RegistryError::Command(CommandError::MatchFull))
        ));
        assert_eq!(registry.games(), vec!["Board: EASY \"an easy one\""]);
    }

    #[test]
    fn test_choosers_see_new_matches() {
        let registry = registry();
        let _alice = connect(&registry, "alice");
        let (_bob, mut bob_rx) = connect(&registry, "bob");
        registry
            .create_match("alice", "M1", "EASY", "d", Arc::new(Silent))
            .expect("create");
        match bob_rx.try_recv() {
            Ok(ServerResponse::Choose { message: None, games }) => {
                assert_eq!(games[0], "Match: M1 \"d\"");
            }
            other => panic!("expected refreshed games list, got {other:?}"),
        }
    }

    #[test]
    fn test_leaving_wait_drops_match() {
        let registry = registry();
        let (alice, mut rx) = connect(&registry, "alice");
        registry
            .create_match("alice", "M1", "EASY", "d", Arc::new(Silent))
            .expect("create");
        assert!(!registry.leave_match("alice", ProtocolState::Score, None));
        assert!(registry.leave_match("alice", ProtocolState::Wait, Some("bye")));
        assert_eq!(alice.state(), ProtocolState::Choose);
        assert!(registry.find_match("M1").is_none());

        let last = std::iter::from_fn(|| rx.try_recv().ok()).last();
        assert_eq!(last.and_then(|r| r.message().map(str::to_string)), Some("bye".into()));
    }

    #[test]
    fn test_release_keeps_match_for_remaining_player() {
        let registry = registry();
        let _a = connect(&registry, "alice");
        let _b = connect(&registry, "bob");
        registry
            .create_match("alice", "M1", "EASY", "d", Arc::new(Silent))
            .expect("create");
        registry.join_match("bob", "M1", Arc::new(Silent)).expect("join");

        registry.release("alice");
        let game = registry.find_match("M1").expect("match kept");
        assert_eq!(game.players(), vec!["bob".to_string()]);
        assert!(registry.match_of("alice").is_none());

        registry.release("bob");
        assert!(registry.find_match("M1").is_none());
        assert_eq!(registry.player_count(), 0);
    }
}
