//! Game implementations.

pub mod crossword;
