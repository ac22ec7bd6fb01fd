//! Board templates loaded at startup, keyed by catalog id.

use super::board::Board;
use super::parser::parse_puzzle;
use super::puzzle::PuzzleSpec;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, instrument, warn};

/// Immutable set of board templates.
///
/// Matches are created from a clone of a template, never from the template
/// itself.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    templates: BTreeMap<String, Board>,
}

impl Catalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from already parsed puzzles, skipping invalid ones.
    pub fn from_specs<'a>(specs: impl IntoIterator<Item = &'a PuzzleSpec>) -> Self {
        let mut catalog = Self::new();
        for spec in specs {
            match Board::from_spec(spec) {
                Ok(board) => {
                    catalog.insert(board);
                }
                Err(e) => warn!(puzzle = %spec.name(), error = %e, "Skipping invalid puzzle"),
            }
        }
        catalog
    }

    /// Loads every `*.<extension>` file in `dir`, in file-name order.
    ///
    /// Files that cannot be read, parsed or built are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error only if the directory itself cannot be listed.
    #[instrument(skip(dir), fields(dir = %dir.as_ref().display()))]
    pub fn load_dir(dir: impl AsRef<Path>, extension: &str) -> std::io::Result<Self> {
        let mut paths: Vec<_> = std::fs::read_dir(dir.as_ref())?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == extension))
            .collect();
        paths.sort();

        let mut catalog = Self::new();
        for path in paths {
            let text = match std::fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable puzzle");
                    continue;
                }
            };
            let board = parse_puzzle(&text)
                .map_err(|e| e.to_string())
                .and_then(|spec| Board::from_spec(&spec).map_err(|e| e.to_string()));
            match board {
                Ok(board) => {
                    let id = catalog.insert(board);
                    info!(path = %path.display(), catalog_id = %id, "Loaded puzzle");
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping invalid puzzle"),
            }
        }
        info!(count = catalog.len(), "Catalog loaded");
        Ok(catalog)
    }

    /// Adds a template, returning the id it was filed under.
    ///
    /// Colliding ids get `(2)`, `(3)`, ... appended.
    pub fn insert(&mut self, board: Board) -> String {
        let base = board.catalog_id();
        let mut id = base.clone();
        let mut n = 2;
        while self.templates.contains_key(&id) {
            id = format!("{base}({n})");
            n += 1;
        }
        self.templates.insert(id.clone(), board);
        id
    }

    /// Template with the given id.
    pub fn get(&self, id: &str) -> Option<&Board> {
        self.templates.get(id)
    }

    /// Number of templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether no template loaded.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Templates in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Board)> {
        self.templates.iter().map(|(id, board)| (id.as_str(), board))
    }

    /// Listing lines `Board: <id> "<description>"`.
    pub fn listing(&self) -> impl Iterator<Item = String> + '_ {
        self.iter()
            .map(|(id, board)| format!("Board: {} \"{}\"", id, board.description()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::crossword::puzzle::PuzzleEntry;
    use crate::games::crossword::types::Direction;

    fn spec(name: &str) -> PuzzleSpec {
        PuzzleSpec::new(
            name.to_string(),
            format!("{name} puzzle"),
            vec![PuzzleEntry::new("cat".into(), "feline".into(), Direction::Across, 0, 0)],
        )
    }

    #[test]
    fn test_duplicate_ids_are_numbered() {
        let specs = [spec("Easy"), spec("easy"), spec("EASY!")];
        let catalog = Catalog::from_specs(&specs);
        let ids: Vec<_> = catalog.iter().map(|(id, _)| id.to_string()).collect();
        assert_eq!(ids, vec!["EASY", "EASY(2)", "EASY(3)"]);
    }

    #[test]
    fn test_invalid_specs_are_skipped() {
        let empty = PuzzleSpec::new("Empty".into(), "nothing".into(), vec![]);
        let specs = [empty, spec("Good")];
        let catalog = Catalog::from_specs(&specs);
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("GOOD").is_some());
    }

    #[test]
    fn test_listing_format() {
        let specs = [spec("Two Words")];
        let catalog = Catalog::from_specs(&specs);
        assert_eq!(
            catalog.listing().collect::<Vec<_>>(),
            vec!["Board: TWO_WORDS \"Two Words puzzle\""]
        );
    }
}
