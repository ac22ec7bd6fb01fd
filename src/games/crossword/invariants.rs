//! First-class invariants for the crossword board.
//!
//! Invariants are logical properties that must hold after every move.
//! The board checks them in debug builds and they can be tested independently.

use super::board::Board;
use super::types::Glyph;

/// A logical property that must hold for a given state.
pub trait Invariant<S> {
    /// Checks if the invariant holds for the given state.
    fn holds(state: &S) -> bool;

    /// Human-readable description of the invariant.
    fn description() -> &'static str;
}

/// Violation of an invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub description: String,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// A set of invariants that can be checked together.
///
/// Implementations are provided for tuples.
pub trait InvariantSet<S> {
    /// Checks all invariants in the set, collecting every violation.
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>>;
}

impl<S, I1, I2, I3, I4> InvariantSet<S> for (I1, I2, I3, I4)
where
    I1: Invariant<S>,
    I2: Invariant<S>,
    I3: Invariant<S>,
    I4: Invariant<S>,
{
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
        let violations: Vec<_> = [
            (I1::holds(state), I1::description()),
            (I2::holds(state), I2::description()),
            (I3::holds(state), I3::description()),
            (I4::holds(state), I4::description()),
        ]
        .into_iter()
        .filter(|(holds, _)| !holds)
        .map(|(_, description)| InvariantViolation::new(description))
        .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

impl<S, I1, I2> InvariantSet<S> for (I1, I2)
where
    I1: Invariant<S>,
    I2: Invariant<S>,
{
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
        let mut violations = Vec::new();
        if !I1::holds(state) {
            violations.push(InvariantViolation::new(I1::description()));
        }
        if !I2::holds(state) {
            violations.push(InvariantViolation::new(I2::description()));
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

fn coordinates(board: &Board) -> impl Iterator<Item = (usize, usize)> {
    let cols = board.cols();
    (0..board.rows()).flat_map(move |r| (0..cols).map(move |c| (r, c)))
}

/// Invariant: a confirmed cell always shows its solution letter.
pub struct ConfirmedLettersCorrect;

impl Invariant<Board> for ConfirmedLettersCorrect {
    fn holds(board: &Board) -> bool {
        coordinates(board).all(|(r, c)| match board.cell(r, c) {
            Some(cell) if cell.is_confirmed() => cell.glyph().letter() == board.solution_at(r, c),
            _ => true,
        })
    }

    fn description() -> &'static str {
        "Confirmed cells hold their solution letter"
    }
}

/// Invariant: an owned membership never sits on an empty cell.
pub struct OwnedCellsFilled;

impl Invariant<Board> for OwnedCellsFilled {
    fn holds(board: &Board) -> bool {
        coordinates(board).filter_map(|(r, c)| board.cell(r, c)).all(|cell| {
            let owned = cell.memberships().any(|m| m.owner().is_some());
            !owned || matches!(cell.glyph(), Glyph::Filled(_))
        })
    }

    fn description() -> &'static str {
        "Owned cells hold a letter"
    }
}

/// Invariant: every cell of a slot agrees on the slot's owner and confirmation.
pub struct UniformSlotState;

impl Invariant<Board> for UniformSlotState {
    fn holds(board: &Board) -> bool {
        board.slots().all(|slot| {
            let direction = slot.id().direction();
            let mut states = slot.coordinates().map(|(r, c)| {
                board
                    .cell(r, c)
                    .and_then(|cell| cell.membership(direction))
                    .map(|m| (m.owner(), m.is_confirmed()))
            });
            match states.next() {
                Some(first) => first.is_some() && states.all(|state| state == first),
                None => false,
            }
        })
    }

    fn description() -> &'static str {
        "Cells of one slot share owner and confirmation"
    }
}

/// Invariant: a finished board matches the solution everywhere.
pub struct FinishedMeansSolved;

impl Invariant<Board> for FinishedMeansSolved {
    fn holds(board: &Board) -> bool {
        !board.is_finished()
            || coordinates(board).all(|(r, c)| {
                board.cell(r, c).and_then(|cell| cell.glyph().letter()) == board.solution_at(r, c)
            })
    }

    fn description() -> &'static str {
        "Finished boards match the solution"
    }
}

/// All board invariants as a composable set.
pub type BoardInvariants = (
    ConfirmedLettersCorrect,
    OwnedCellsFilled,
    UniformSlotState,
    FinishedMeansSolved,
);
