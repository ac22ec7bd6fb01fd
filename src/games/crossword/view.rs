//! Detached copies of the play grid handed to sessions and clients.

use super::types::{Cell, Glyph};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One rendered cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellView {
    /// Letter shown, if any.
    pub character: Option<char>,
    /// Whether no slot covers this cell.
    pub black: bool,
    /// Whether the letter is confirmed.
    pub confirmed: bool,
    /// Slot number starting here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<u32>,
}

impl CellView {
    /// Letter shown, if any.
    pub fn character(&self) -> Option<char> {
        self.character
    }

    fn symbol(&self) -> char {
        match (self.black, self.character) {
            (true, _) => '#',
            (false, None) => '_',
            (false, Some(c)) if self.confirmed => c.to_ascii_uppercase(),
            (false, Some(c)) => c,
        }
    }
}

impl From<&Cell> for CellView {
    fn from(cell: &Cell) -> Self {
        Self {
            character: cell.glyph().letter(),
            black: cell.glyph() == Glyph::Black,
            confirmed: cell.is_confirmed(),
            label: cell.label(),
        }
    }
}

/// Snapshot of the whole play grid, row-major.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayView {
    rows: Vec<Vec<CellView>>,
}

impl PlayView {
    /// Wraps rendered rows.
    pub fn new(rows: Vec<Vec<CellView>>) -> Self {
        Self { rows }
    }

    /// Rendered rows, top to bottom.
    pub fn rows(&self) -> &[Vec<CellView>] {
        &self.rows
    }
}

/// One line per row: `#` black, `_` empty, confirmed letters upper-cased.
impl fmt::Display for PlayView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            let line: Vec<String> = row.iter().map(|cell| cell.symbol().to_string()).collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(character: Option<char>, black: bool, confirmed: bool) -> CellView {
        CellView {
            character,
            black,
            confirmed,
            label: None,
        }
    }

    #[test]
    fn test_renders_grid_as_text() {
        let view = PlayView::new(vec![
            vec![cell(Some('c'), false, true), cell(Some('a'), false, false)],
            vec![cell(None, false, false), cell(None, true, false)],
        ]);
        assert_eq!(view.to_string(), "C a\n_ #\n");
    }

    #[test]
    fn test_serializes_without_missing_label() {
        let json = serde_json::to_string(&cell(Some('x'), false, false)).expect("serialize");
        assert_eq!(json, r#"{"character":"x","black":false,"confirmed":false}"#);
    }
}
