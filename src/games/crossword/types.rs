//! Core domain types for the crossword board.

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Unique identifier for a player.
pub type PlayerId = String;

/// Orientation of a word slot.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Direction {
    /// Left to right.
    Across,
    /// Top to bottom.
    Down,
}

impl Direction {
    /// Returns the other orientation.
    pub fn orthogonal(self) -> Self {
        match self {
            Direction::Across => Direction::Down,
            Direction::Down => Direction::Across,
        }
    }

    /// Returns the (row, col) of the `offset`-th cell of a slot starting at (`row`, `col`).
    pub fn step(self, row: usize, col: usize, offset: usize) -> (usize, usize) {
        match self {
            Direction::Across => (row, col + offset),
            Direction::Down => (row + offset, col),
        }
    }

    /// Like [`Direction::step`], but `None` when a coordinate overflows.
    pub fn checked_step(self, row: usize, col: usize, offset: usize) -> Option<(usize, usize)> {
        match self {
            Direction::Across => Some((row, col.checked_add(offset)?)),
            Direction::Down => Some((row.checked_add(offset)?, col)),
        }
    }
}

/// Identity of a word slot: sequence number plus orientation, e.g. `3DOWN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotId {
    number: u32,
    direction: Direction,
}

impl SlotId {
    /// Creates a slot id. Sequence numbers start at 1.
    pub fn new(number: u32, direction: Direction) -> Self {
        Self { number, direction }
    }

    /// Returns the sequence number.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Returns the orientation.
    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.number, self.direction)
    }
}

/// Error parsing a slot id such as `3DOWN`.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("'{}' is not a slot id (expected e.g. 3DOWN or 12ACROSS)", input)]
pub struct SlotIdError {
    /// The rejected input.
    pub input: String,
}

impl FromStr for SlotId {
    type Err = SlotIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || SlotIdError {
            input: s.to_string(),
        };
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .filter(|&i| i > 0)
            .ok_or_else(err)?;
        let (digits, suffix) = s.split_at(split);
        let direction = Direction::from_str(suffix).map_err(|_| err())?;
        let number: u32 = digits.parse().map_err(|_| err())?;
        if number == 0 {
            return Err(err());
        }
        Ok(Self::new(number, direction))
    }
}

/// What a grid position currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Glyph {
    /// No slot covers this position.
    Black,
    /// Covered by a slot, nothing entered.
    Empty,
    /// Covered by a slot and holding a letter.
    Filled(char),
}

impl Glyph {
    /// Returns the entered letter, if any.
    pub fn letter(self) -> Option<char> {
        match self {
            Glyph::Filled(c) => Some(c),
            Glyph::Black | Glyph::Empty => None,
        }
    }

    /// Single-character rendering used by text views.
    pub fn symbol(self) -> char {
        match self {
            Glyph::Black => '#',
            Glyph::Empty => '_',
            Glyph::Filled(c) => c,
        }
    }
}

/// A cell's membership in one word slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    slot: SlotId,
    owner: Option<PlayerId>,
    confirmed: bool,
}

impl Membership {
    /// Creates an unowned, unconfirmed membership.
    pub fn new(slot: SlotId) -> Self {
        Self {
            slot,
            owner: None,
            confirmed: false,
        }
    }

    /// Slot this membership belongs to.
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// Player who entered the current letter for this slot.
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Whether this slot has been confirmed at this cell.
    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }
}

/// One position in the play grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    glyph: Glyph,
    across: Option<Membership>,
    down: Option<Membership>,
    confirmed: bool,
    label: Option<u32>,
}

impl Cell {
    /// A position no slot covers.
    pub fn black() -> Self {
        Self {
            glyph: Glyph::Black,
            across: None,
            down: None,
            confirmed: false,
            label: None,
        }
    }

    /// Current glyph.
    pub fn glyph(&self) -> Glyph {
        self.glyph
    }

    /// Whether no slot covers this cell.
    pub fn is_black(&self) -> bool {
        self.glyph == Glyph::Black
    }

    /// Whether the cell is covered but holds no letter.
    pub fn is_empty(&self) -> bool {
        self.glyph == Glyph::Empty
    }

    /// Whether any slot through this cell has been confirmed.
    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    /// Sequence number of the slot(s) starting here.
    pub fn label(&self) -> Option<u32> {
        self.label
    }

    /// Membership in the slot running in `direction`, if any.
    pub fn membership(&self, direction: Direction) -> Option<&Membership> {
        match direction {
            Direction::Across => self.across.as_ref(),
            Direction::Down => self.down.as_ref(),
        }
    }

    fn membership_mut(&mut self, direction: Direction) -> Option<&mut Membership> {
        match direction {
            Direction::Across => self.across.as_mut(),
            Direction::Down => self.down.as_mut(),
        }
    }

    /// All memberships of this cell (one or two for covered cells).
    pub fn memberships(&self) -> impl Iterator<Item = &Membership> {
        self.across.iter().chain(self.down.iter())
    }

    /// Membership in the slot crossing `slot` at this cell, if this is a crossing.
    pub fn crossing(&self, slot: SlotId) -> Option<&Membership> {
        self.membership(slot.direction().orthogonal())
            .filter(|m| m.slot != slot)
    }

    /// Whether `player` (or nobody) owns every membership of this cell.
    pub fn held_only_by(&self, player: &str) -> bool {
        self.memberships()
            .all(|m| m.owner.as_deref().is_none_or(|owner| owner == player))
    }

    /// Whether the letter differs from `letter`. Empty cells differ from every letter.
    pub fn differs_from(&self, letter: char) -> bool {
        self.glyph.letter() != Some(letter)
    }

    /// Adds `slot` to this cell during board construction.
    ///
    /// Returns `false` if the cell already belongs to a slot in that orientation.
    pub(super) fn join(&mut self, slot: SlotId, starts_here: bool) -> bool {
        let target = match slot.direction() {
            Direction::Across => &mut self.across,
            Direction::Down => &mut self.down,
        };
        if target.is_some() {
            return false;
        }
        *target = Some(Membership::new(slot));
        if self.glyph == Glyph::Black {
            self.glyph = Glyph::Empty;
        }
        if starts_here {
            self.label = Some(slot.number());
        }
        true
    }

    /// Writes a letter and records `player` as owner of `slot` here.
    pub(super) fn write(&mut self, slot: SlotId, letter: char, player: &str) {
        self.glyph = Glyph::Filled(letter);
        if let Some(membership) = self.membership_mut(slot.direction()) {
            membership.owner = Some(player.to_string());
        }
    }

    /// Confirms `slot` at this cell; the cell as a whole becomes confirmed too.
    pub(super) fn confirm(&mut self, slot: SlotId) {
        self.confirmed = true;
        if let Some(membership) = self.membership_mut(slot.direction()) {
            membership.confirmed = true;
        }
    }

    /// Drops ownership of `slot` here.
    ///
    /// The letter is erased unless the cell is confirmed or another membership
    /// still holds it.
    pub(super) fn release(&mut self, slot: SlotId) {
        if let Some(membership) = self.membership_mut(slot.direction()) {
            membership.owner = None;
        }
        let still_held = self.memberships().any(|m| m.owner.is_some());
        if !self.confirmed && !still_held && self.glyph != Glyph::Black {
            self.glyph = Glyph::Empty;
        }
    }
}
