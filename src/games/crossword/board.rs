//! Placement and challenge engine for one crossword grid.

use super::invariants::{BoardInvariants, InvariantSet};
use super::outcome::Outcome;
use super::puzzle::{PuzzleError, PuzzleSpec};
use super::types::{Cell, Direction, PlayerId, SlotId};
use super::view::{CellView, PlayView};
use std::collections::BTreeMap;
use tracing::{debug, error, info, instrument};

/// Largest row and column count a puzzle may span.
pub const MAX_DIMENSION: usize = 64;

/// One across or down word placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    id: SlotId,
    row: usize,
    col: usize,
    solution: Vec<char>,
    clue: String,
}

impl Slot {
    /// Slot identity.
    pub fn id(&self) -> SlotId {
        self.id
    }

    /// Start coordinate as (row, col).
    pub fn start(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    /// Number of cells covered.
    pub fn len(&self) -> usize {
        self.solution.len()
    }

    /// Slots always cover at least one cell.
    pub fn is_empty(&self) -> bool {
        self.solution.is_empty()
    }

    /// Lowercase solution text.
    pub fn solution(&self) -> String {
        self.solution.iter().collect()
    }

    /// Clue text.
    pub fn clue(&self) -> &str {
        &self.clue
    }

    /// Grid coordinates covered, first letter first.
    pub fn coordinates(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.solution.len()).map(|offset| self.id.direction().step(self.row, self.col, offset))
    }
}

/// Which of the two moves is being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MoveKind {
    Try,
    Challenge,
}

/// A crossword grid shared by two players.
///
/// Holds the solution grid next to the live play grid, the slot table and
/// the running scores. Templates are built once per puzzle and cloned for
/// every match, so two matches never share grid state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    name: String,
    description: String,
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
    solution: Vec<Option<char>>,
    slots: BTreeMap<SlotId, Slot>,
    scores: BTreeMap<PlayerId, i32>,
    finished: bool,
}

/// Lowercases a word into its letters.
fn letters(word: &str) -> Vec<char> {
    word.chars().flat_map(char::to_lowercase).collect()
}

fn is_valid_letter(c: char) -> bool {
    c.is_alphabetic() || c == '-'
}

impl Board {
    /// Builds an empty play grid for `spec`.
    ///
    /// Slot numbers are handed out to distinct start coordinates in the order
    /// entries appear; an across and a down entry sharing a start share the
    /// number.
    ///
    /// # Errors
    ///
    /// Returns [`PuzzleError`] if the puzzle is empty, a word is malformed,
    /// an entry reaches past [`MAX_DIMENSION`], two entries in one direction share a start or overlap, or two crossing
    /// entries disagree on a letter.
    #[instrument(skip(spec), fields(puzzle = %spec.name(), entries = spec.entries().len()))]
    pub fn from_spec(spec: &PuzzleSpec) -> Result<Self, PuzzleError> {
        if spec.entries().is_empty() {
            return Err(PuzzleError::NoEntries);
        }

        let mut words = Vec::with_capacity(spec.entries().len());
        let (mut rows, mut cols) = (0, 0);
        for entry in spec.entries() {
            let word = letters(entry.word());
            if word.is_empty() || !word.iter().copied().all(is_valid_letter) {
                return Err(PuzzleError::InvalidWord {
                    word: entry.word().clone(),
                });
            }
            let (last_row, last_col) = entry
                .direction()
                .checked_step(*entry.row(), *entry.col(), word.len() - 1)
                .filter(|&(r, c)| r < MAX_DIMENSION && c < MAX_DIMENSION)
                .ok_or_else(|| PuzzleError::TooLarge {
                    word: entry.word().clone(),
                    row: *entry.row(),
                    col: *entry.col(),
                    limit: MAX_DIMENSION,
                })?;
            rows = rows.max(last_row + 1);
            cols = cols.max(last_col + 1);
            words.push(word);
        }

        let mut cells = vec![Cell::black(); rows * cols];
        let mut solution = vec![None; rows * cols];
        let mut starts: Vec<(usize, usize)> = Vec::new();
        let mut slots = BTreeMap::new();

        for (entry, word) in spec.entries().iter().zip(words) {
            let (row, col, direction) = (*entry.row(), *entry.col(), *entry.direction());
            let number = match starts.iter().position(|&start| start == (row, col)) {
                Some(index) => index + 1,
                None => {
                    starts.push((row, col));
                    starts.len()
                }
            };
            let id = SlotId::new(number as u32, direction);
            if slots.contains_key(&id) {
                return Err(PuzzleError::DuplicateStart { direction, row, col });
            }

            for (offset, &letter) in word.iter().enumerate() {
                let (r, c) = direction.step(row, col, offset);
                let index = r * cols + c;
                if let Some(existing) = cells[index].membership(direction) {
                    return Err(PuzzleError::Overlap {
                        slot: id,
                        other: existing.slot(),
                        row: r,
                        col: c,
                    });
                }
                if let Some(expected) = solution[index].filter(|&expected| expected != letter) {
                    let other = cells[index]
                        .membership(direction.orthogonal())
                        .map(|m| m.slot())
                        .unwrap_or(id);
                    return Err(PuzzleError::ConflictingCrossing {
                        slot: id,
                        other,
                        row: r,
                        col: c,
                        expected,
                        found: letter,
                    });
                }
                solution[index] = Some(letter);
                let joined = cells[index].join(id, offset == 0);
                debug_assert!(joined, "overlap check leaves one {direction} membership per cell");
            }

            slots.insert(
                id,
                Slot {
                    id,
                    row,
                    col,
                    solution: word,
                    clue: entry.clue().clone(),
                },
            );
        }

        info!(rows, cols, slots = slots.len(), "Board built");
        Ok(Self {
            name: spec.name().clone(),
            description: spec.description().clone(),
            rows,
            cols,
            cells,
            solution,
            slots,
            scores: BTreeMap::new(),
            finished: false,
        })
    }

    /// Puzzle display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Puzzle description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Catalog key: name upper-cased, spaces to `_`, anything outside `[A-Z0-9_]` dropped.
    pub fn catalog_id(&self) -> String {
        self.name
            .to_uppercase()
            .replace(' ', "_")
            .chars()
            .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || *c == '_')
            .collect()
    }

    /// Grid height.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Grid width.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Play-grid cell at (`row`, `col`).
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        if row < self.rows && col < self.cols {
            self.cells.get(row * self.cols + col)
        } else {
            None
        }
    }

    #[cfg(test)]
    pub(super) fn cell_mut(&mut self, row: usize, col: usize) -> &mut Cell {
        &mut self.cells[row * self.cols + col]
    }

    #[cfg(test)]
    pub(super) fn set_finished(&mut self) {
        self.finished = true;
    }

    /// Slot with the given id.
    pub fn slot(&self, id: SlotId) -> Option<&Slot> {
        self.slots.get(&id)
    }

    /// All slots, ordered by number then direction.
    pub fn slots(&self) -> impl Iterator<Item = &Slot> {
        self.slots.values()
    }

    /// Whether the play grid has reached the solution.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Current score of `player`; players never mentioned score 0.
    pub fn score(&self, player: &str) -> i32 {
        self.scores.get(player).copied().unwrap_or(0)
    }

    /// Records `player` with a zero score if the board has not seen them yet.
    pub fn enroll(&mut self, player: &str) {
        self.scores.entry(player.to_string()).or_insert(0);
    }

    /// Letters currently entered in `slot`, `None` where a cell is empty.
    pub fn entered(&self, slot: SlotId) -> Option<Vec<Option<char>>> {
        let slot = self.slots.get(&slot)?;
        Some(
            slot.coordinates()
                .map(|(r, c)| self.cells[r * self.cols + c].glyph().letter())
                .collect(),
        )
    }

    /// Player who owns `slot`, if anyone.
    pub fn owner(&self, slot: SlotId) -> Option<&str> {
        let (row, col) = self.slots.get(&slot)?.start();
        self.cells[row * self.cols + col]
            .membership(slot.direction())
            .and_then(|m| m.owner())
    }

    /// Solution letter at (`row`, `col`).
    pub fn solution_at(&self, row: usize, col: usize) -> Option<char> {
        if row < self.rows && col < self.cols {
            self.solution[row * self.cols + col]
        } else {
            None
        }
    }

    /// Attempts to enter `word` into `slot` on behalf of `player`.
    ///
    /// All-or-nothing: any conflicting cell aborts the move before anything
    /// changes. Entering a letter that contradicts an orthogonal slot clears
    /// that slot.
    #[instrument(skip(self), fields(puzzle = %self.name))]
    pub fn try_place(&mut self, slot: SlotId, word: &str, player: &str) -> Outcome {
        let word = letters(word);
        let positions = match self.gate(slot, &word, player, MoveKind::Try) {
            Ok(positions) => positions,
            Err(outcome) => {
                debug!(%outcome, "Placement rejected by gate");
                return outcome;
            }
        };

        let conflict = positions.iter().zip(&word).any(|(&index, &letter)| {
            let cell = &self.cells[index];
            if cell.held_only_by(player) {
                cell.is_confirmed() && cell.differs_from(letter)
            } else {
                !cell.is_empty() && cell.differs_from(letter)
            }
        });
        if conflict {
            debug!("Placement conflicts with the board");
            return Outcome::Conflict;
        }

        self.write_slot(slot, &positions, &word, player);
        let outcome = self.settle(Outcome::Success);
        info!(%outcome, "Word placed");
        outcome
    }

    /// Challenges the word currently entered in `slot` with `word`.
    ///
    /// If the entered word is the solution it is confirmed and the challenger
    /// loses a point. If the challenge word is the solution it replaces the
    /// entry, is confirmed, and the challenger gains two points. Otherwise the
    /// slot is cleared and the challenger loses a point.
    #[instrument(skip(self), fields(puzzle = %self.name))]
    pub fn try_challenge(&mut self, slot: SlotId, word: &str, player: &str) -> Outcome {
        let word = letters(word);
        let positions = match self.gate(slot, &word, player, MoveKind::Challenge) {
            Ok(positions) => positions,
            Err(outcome) => {
                debug!(%outcome, "Challenge rejected by gate");
                return outcome;
            }
        };

        let current: Vec<Option<char>> = positions
            .iter()
            .map(|&index| self.cells[index].glyph().letter())
            .collect();
        if current.iter().copied().eq(word.iter().copied().map(Some)) {
            return Outcome::SameWord;
        }

        let solution = self.slots[&slot].solution.clone();
        let outcome = if current.iter().copied().eq(solution.iter().copied().map(Some)) {
            for &index in &positions {
                self.cells[index].confirm(slot);
            }
            self.add_points(player, -1);
            Outcome::Failed
        } else if word == solution {
            self.write_slot(slot, &positions, &word, player);
            for &index in &positions {
                self.cells[index].confirm(slot);
            }
            self.add_points(player, 2);
            self.settle(Outcome::Success)
        } else {
            self.clear_slot(slot);
            self.add_points(player, -1);
            Outcome::Failed
        };
        info!(%outcome, score = self.score(player), "Challenge resolved");
        outcome
    }

    /// Deep copy of the play grid.
    pub fn view(&self) -> PlayView {
        let rows = self
            .cells
            .chunks(self.cols.max(1))
            .map(|row| row.iter().map(CellView::from).collect())
            .collect();
        PlayView::new(rows)
    }

    /// Plain-text grid, one row per line.
    pub fn render_text(&self) -> String {
        self.view().to_string()
    }

    /// Clues rendered as `<slotId>: <clue>`, ordered by slot.
    pub fn clues(&self) -> Vec<String> {
        self.slots
            .values()
            .map(|slot| format!("{}: {}", slot.id, slot.clue))
            .collect()
    }

    /// Shared validity checks; returns the grid indices of the slot's cells.
    fn gate(
        &self,
        slot: SlotId,
        word: &[char],
        player: &str,
        kind: MoveKind,
    ) -> Result<Vec<usize>, Outcome> {
        if self.finished {
            return Err(Outcome::Finished);
        }
        let entry = self.slots.get(&slot).ok_or(Outcome::Nonexistent)?;
        if entry.len() != word.len() {
            return Err(Outcome::WrongLength);
        }
        let positions: Vec<usize> = entry
            .coordinates()
            .map(|(r, c)| r * self.cols + c)
            .collect();
        let direction = slot.direction();
        let confirmed = positions.iter().all(|&index| {
            self.cells[index]
                .membership(direction)
                .is_some_and(|m| m.is_confirmed())
        });
        if confirmed {
            return Err(Outcome::Confirmed);
        }

        match kind {
            MoveKind::Try => {
                let owned = positions.iter().zip(word).any(|(&index, &letter)| {
                    let cell = &self.cells[index];
                    let foreign = cell
                        .membership(direction)
                        .and_then(|m| m.owner())
                        .is_some_and(|owner| owner != player);
                    foreign && cell.differs_from(letter)
                });
                if owned {
                    return Err(Outcome::WordOwned);
                }
            }
            MoveKind::Challenge => match self.owner(slot) {
                Some(owner) if owner != player => {}
                _ => return Err(Outcome::CantChallenge),
            },
        }
        Ok(positions)
    }

    /// Writes `word` over the slot, clearing orthogonal slots it contradicts.
    fn write_slot(&mut self, slot: SlotId, positions: &[usize], word: &[char], player: &str) {
        for (&index, &letter) in positions.iter().zip(word) {
            let contradicted = {
                let cell = &self.cells[index];
                cell.crossing(slot)
                    .filter(|_| !cell.is_empty() && cell.differs_from(letter))
                    .map(|m| m.slot())
            };
            if let Some(other) = contradicted {
                debug!(%other, "Clearing contradicted crossing slot");
                self.clear_slot(other);
            }
            self.cells[index].write(slot, letter, player);
        }
    }

    /// Un-owns every cell of `slot`; letters nothing else holds are erased.
    fn clear_slot(&mut self, slot: SlotId) {
        let Some(entry) = self.slots.get(&slot) else {
            return;
        };
        let positions: Vec<usize> = entry.coordinates().map(|(r, c)| r * self.cols + c).collect();
        for index in positions {
            self.cells[index].release(slot);
        }
    }

    fn add_points(&mut self, player: &str, points: i32) {
        *self.scores.entry(player.to_string()).or_insert(0) += points;
    }

    /// Checks for completion after a mutation and pays the ownership bonus once.
    fn settle(&mut self, progress: Outcome) -> Outcome {
        self.check_invariants();
        let solved = self
            .cells
            .iter()
            .zip(&self.solution)
            .all(|(cell, expected)| cell.glyph().letter() == *expected);
        if !solved {
            return progress;
        }

        self.finished = true;
        let owners: Vec<PlayerId> = self
            .slots
            .keys()
            .filter_map(|&id| self.owner(id).map(str::to_string))
            .collect();
        for owner in owners {
            self.add_points(&owner, 1);
        }
        info!(scores = ?self.scores, "Board finished");
        Outcome::Finished
    }

    fn check_invariants(&self) {
        if let Err(violations) = BoardInvariants::check_all(self) {
            for violation in &violations {
                error!(description = %violation.description, "Board invariant violated");
            }
            debug_assert!(violations.is_empty(), "board invariants violated");
        }
    }
}
