//! Reader for the `.puzzle` text format.
//!
//! ```text
//! // comment
//! >> "Easy" "An easy puzzle to get started"
//! (cat, "feline companion", ACROSS, 1, 0)
//! (mat, "lounging place for feline companion", DOWN, 0, 2)
//! ```
//!
//! Whitespace between tokens is insignificant. Quoted strings may use the
//! escapes `\\`, `\"`, `\n`, `\r` and `\t`, but never a raw line break.

use super::puzzle::{PuzzleEntry, PuzzleSpec};
use super::types::Direction;
use derive_more::{Display, Error};
use std::iter::Peekable;
use std::str::{Chars, FromStr};
use tracing::instrument;

/// Syntax error in a puzzle file.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("Puzzle parse error at line {}: {}", line, message)]
pub struct PuzzleParseError {
    /// What went wrong.
    pub message: String,
    /// 1-based line of the offending input.
    pub line: usize,
}

struct Cursor<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
        }
    }

    fn error(&self, message: impl Into<String>) -> PuzzleParseError {
        PuzzleParseError {
            message: message.into(),
            line: self.line,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    /// Skips whitespace and `//` comments.
    fn skip_trivia(&mut self) {
        loop {
            match self.chars.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') => {
                    let mut lookahead = self.chars.clone();
                    lookahead.next();
                    if lookahead.peek() != Some(&'/') {
                        return;
                    }
                    while self.chars.peek().is_some_and(|&c| c != '\n') {
                        self.bump();
                    }
                }
                _ => return,
            }
        }
    }

    fn at_end(&mut self) -> bool {
        self.skip_trivia();
        self.chars.peek().is_none()
    }

    fn expect(&mut self, token: &str) -> Result<(), PuzzleParseError> {
        self.skip_trivia();
        for expected in token.chars() {
            match self.bump() {
                Some(c) if c == expected => {}
                Some(c) => return Err(self.error(format!("expected '{token}', found '{c}'"))),
                None => return Err(self.error(format!("expected '{token}', found end of input"))),
            }
        }
        Ok(())
    }

    fn quoted(&mut self) -> Result<String, PuzzleParseError> {
        self.expect("\"")?;
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(text),
                Some('\\') => {
                    let escaped = match self.bump() {
                        Some('n') => '\n',
                        Some('r') => '\r',
                        Some('t') => '\t',
                        Some(c @ ('\\' | '"')) => c,
                        Some(c) => return Err(self.error(format!("unknown escape '\\{c}'"))),
                        None => return Err(self.error("unterminated string")),
                    };
                    text.push(escaped);
                }
                Some('\n') | None => return Err(self.error("unterminated string")),
                Some(c) => text.push(c),
            }
        }
    }

    /// Reads a run of characters matching `accept`.
    fn token(&mut self, what: &str, accept: impl Fn(char) -> bool) -> Result<String, PuzzleParseError> {
        self.skip_trivia();
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if !accept(c) {
                break;
            }
            text.push(c);
            self.bump();
        }
        if text.is_empty() {
            let found = self
                .chars
                .peek()
                .map_or_else(|| "end of input".to_string(), |c| format!("'{c}'"));
            return Err(self.error(format!("expected {what}, found {found}")));
        }
        Ok(text)
    }

    fn number(&mut self) -> Result<usize, PuzzleParseError> {
        let digits = self.token("a number", |c| c.is_ascii_digit())?;
        digits
            .parse()
            .map_err(|_| self.error(format!("{digits} is out of range")))
    }

    fn entry(&mut self) -> Result<PuzzleEntry, PuzzleParseError> {
        self.expect("(")?;
        let word = self.token("a word", |c| c.is_alphabetic() || c == '-')?;
        self.expect(",")?;
        let clue = self.quoted()?;
        self.expect(",")?;
        let direction = self.token("ACROSS or DOWN", |c| c.is_ascii_alphabetic())?;
        let direction = Direction::from_str(&direction)
            .map_err(|_| self.error(format!("{direction} is not ACROSS or DOWN")))?;
        self.expect(",")?;
        let row = self.number()?;
        self.expect(",")?;
        let col = self.number()?;
        self.expect(")")?;
        Ok(PuzzleEntry::new(word, clue, direction, row, col))
    }
}

/// Parses puzzle text into a [`PuzzleSpec`].
///
/// Only syntax is checked here; [`Board::from_spec`](super::Board::from_spec)
/// validates the geometry.
#[instrument(skip(input), fields(len = input.len()))]
pub fn parse_puzzle(input: &str) -> Result<PuzzleSpec, PuzzleParseError> {
    let mut cursor = Cursor::new(input);
    cursor.expect(">>")?;
    let name = cursor.quoted()?;
    let description = cursor.quoted()?;

    let mut entries = Vec::new();
    while !cursor.at_end() {
        entries.push(cursor.entry()?);
    }
    Ok(PuzzleSpec::new(name, description, entries))
}

impl FromStr for PuzzleSpec {
    type Err = PuzzleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_puzzle(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_header_only() {
        let spec = parse_puzzle(">> \"Test Puzzle\" \"A blank puzzle\"\n").expect("valid");
        assert_eq!(spec.name(), "Test Puzzle");
        assert_eq!(spec.description(), "A blank puzzle");
        assert!(spec.entries().is_empty());
    }

    #[test]
    fn test_parses_entries_with_varied_spacing() {
        let spec = parse_puzzle(
            ">>\"Test\"   \"two\"\n(max,\"6.031 Instructor\",DOWN,0,2)\n\t( armando , \"other\" , across , 1 , 2 )",
        )
        .expect("valid");
        assert_eq!(
            spec.entries(),
            &vec![
                PuzzleEntry::new("max".into(), "6.031 Instructor".into(), Direction::Down, 0, 2),
                PuzzleEntry::new("armando".into(), "other".into(), Direction::Across, 1, 2),
            ]
        );
    }

    #[test]
    fn test_skips_comments_and_decodes_escapes() {
        let spec = parse_puzzle(
            "// leading comment\n>> \"Say \\\"hi\\\"\" \"tab\\there\" // trailing\n(hi, \"greeting\", ACROSS, 0, 0)\n",
        )
        .expect("valid");
        assert_eq!(spec.name(), "Say \"hi\"");
        assert_eq!(spec.description(), "tab\there");
        assert_eq!(spec.entries().len(), 1);
    }

    #[test]
    fn test_reports_line_of_error() {
        let err = parse_puzzle(">> \"T\" \"D\"\n(cat, \"c\", ACROSS, 0, 0)\n(dog \"d\", DOWN, 0, 0)")
            .unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.message.contains("expected ','"), "{err}");
    }

    #[test]
    fn test_rejects_letter_coordinates() {
        let err = parse_puzzle(">> \"T\" \"D\"\n(cat, \"c\", ACROSS, a, 0)").unwrap_err();
        assert!(err.message.contains("a number"), "{err}");
    }

    #[test]
    fn test_rejects_unknown_direction_and_raw_newline() {
        assert!(parse_puzzle(">> \"T\" \"D\" (cat, \"c\", SIDEWAYS, 0, 0)").is_err());
        assert!(parse_puzzle(">> \"T\nX\" \"D\"").is_err());
    }

    #[test]
    fn test_from_str() {
        let spec: PuzzleSpec = ">> \"T\" \"D\" (cat, \"c\", ACROSS, 0, 0)".parse().expect("valid");
        assert_eq!(spec.entries()[0].word(), "cat");
    }
}
