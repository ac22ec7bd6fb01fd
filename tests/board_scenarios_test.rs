//! Placement, challenge and scoring scenarios on the crossword board.

use crossword_duel::{Board, Direction, Outcome, PuzzleEntry, PuzzleSpec, SlotId};

fn entry(word: &str, direction: Direction, row: usize, col: usize) -> PuzzleEntry {
    PuzzleEntry::new(word.to_string(), format!("clue for {word}"), direction, row, col)
}

fn board(entries: Vec<PuzzleEntry>) -> Board {
    Board::from_spec(&PuzzleSpec::new("Scenario".into(), "test".into(), entries))
        .expect("valid puzzle")
}

/// `cat` across the top row crossing `cow` down the left column.
fn corner() -> Board {
    board(vec![
        entry("cat", Direction::Across, 0, 0),
        entry("cow", Direction::Down, 0, 0),
    ])
}

fn across(n: u32) -> SlotId {
    SlotId::new(n, Direction::Across)
}

fn down(n: u32) -> SlotId {
    SlotId::new(n, Direction::Down)
}

fn text(board: &Board, slot: SlotId) -> String {
    board
        .entered(slot)
        .expect("slot exists")
        .into_iter()
        .map(|c| c.unwrap_or('_'))
        .collect()
}

#[test]
fn test_ownership_clear() {
    let mut board = corner();
    assert_eq!(board.try_place(across(1), "cat", "p1"), Outcome::Success);
    assert_eq!(board.try_place(down(1), "mob", "p2"), Outcome::Conflict);
    assert_eq!(text(&board, down(1)), "c__");

    assert_eq!(board.try_place(down(1), "mat", "p1"), Outcome::Success);
    assert_eq!(text(&board, down(1)), "mat");
    assert_eq!(text(&board, across(1)), "m__");
    assert_eq!(board.owner(across(1)), None);
    assert_eq!(board.owner(down(1)), Some("p1"));
}

#[test]
fn test_challenge_outcomes() {
    let mut board = corner();
    assert_eq!(board.try_place(across(1), "car", "p1"), Outcome::Success);
    assert_eq!(board.try_challenge(across(1), "cat", "p2"), Outcome::Success);
    for col in 0..3 {
        assert!(board.cell(0, col).unwrap().is_confirmed());
    }
    assert_eq!(board.score("p2"), 2);
    assert_eq!(board.owner(across(1)), Some("p2"));
    assert_eq!(board.try_challenge(across(1), "cab", "p1"), Outcome::Confirmed);
    assert_eq!(board.try_place(across(1), "cab", "p1"), Outcome::Confirmed);
}

#[test]
fn test_challenging_a_correct_word_confirms_it() {
    let mut board = corner();
    board.try_place(across(1), "cat", "p1");
    assert_eq!(board.try_challenge(across(1), "cab", "p2"), Outcome::Failed);
    assert_eq!(board.score("p2"), -1);
    assert_eq!(board.owner(across(1)), Some("p1"));
    assert_eq!(board.try_place(across(1), "cab", "p2"), Outcome::Confirmed);
}

#[test]
fn test_wrong_challenge_clears_the_slot() {
    let mut board = corner();
    board.try_place(across(1), "car", "p1");
    assert_eq!(board.try_challenge(across(1), "cab", "p2"), Outcome::Failed);
    assert_eq!(board.score("p2"), -1);
    assert_eq!(text(&board, across(1)), "___");
    assert_eq!(board.owner(across(1)), None);
}

#[test]
fn test_challenge_gate() {
    let mut board = corner();
    assert_eq!(board.try_challenge(across(1), "cat", "p2"), Outcome::CantChallenge);
    board.try_place(across(1), "car", "p1");
    assert_eq!(board.try_challenge(across(1), "cat", "p1"), Outcome::CantChallenge);
    assert_eq!(board.try_challenge(across(1), "car", "p2"), Outcome::SameWord);
    assert_eq!(board.try_challenge(across(1), "cart", "p2"), Outcome::WrongLength);
    assert_eq!(board.try_challenge(across(7), "cat", "p2"), Outcome::Nonexistent);
    assert_eq!(board.score("p2"), 0);
}

#[test]
fn test_try_gate() {
    let mut board = corner();
    assert_eq!(board.try_place(down(2), "cow", "p1"), Outcome::Nonexistent);
    assert_eq!(board.try_place(down(1), "co", "p1"), Outcome::WrongLength);
    board.try_place(across(1), "car", "p1");
    assert_eq!(board.try_place(across(1), "cab", "p2"), Outcome::WordOwned);
    assert_eq!(board.try_place(across(1), "cab", "p1"), Outcome::Success);
    assert_eq!(text(&board, across(1)), "cab");
}

#[test]
fn test_conflict_leaves_board_untouched() {
    let mut board = corner();
    board.try_place(across(1), "cat", "p1");
    let before = board.clone();
    assert_eq!(board.try_place(down(1), "dog", "p2"), Outcome::Conflict);
    assert_eq!(board, before);
}

#[test]
fn test_confirmed_letter_survives_later_moves() {
    let mut board = corner();
    board.try_place(across(1), "car", "p1");
    board.try_challenge(across(1), "cat", "p2");
    assert_eq!(board.try_place(down(1), "mow", "p1"), Outcome::Conflict);
    assert_eq!(board.try_place(down(1), "cow", "p1"), Outcome::Finished);
    assert_eq!(board.cell(0, 0).unwrap().glyph().letter(), Some('c'));
}

#[test]
fn test_finish_and_scoring() {
    // Two across words fill a 2x2 block; the down words are never claimed.
    let mut board = board(vec![
        entry("to", Direction::Across, 0, 0),
        entry("ax", Direction::Across, 1, 0),
        entry("ta", Direction::Down, 0, 0),
        entry("ox", Direction::Down, 0, 1),
    ]);
    let second_row = across(2);
    assert!(board.slot(second_row).is_some());

    assert_eq!(board.try_place(across(1), "to", "p1"), Outcome::Success);
    assert!(!board.is_finished());
    assert_eq!(board.try_place(second_row, "ax", "p2"), Outcome::Finished);
    assert!(board.is_finished());
    assert_eq!(board.owner(down(1)), None);
    assert_eq!(board.owner(down(3)), None);
    assert_eq!(board.score("p1"), 1);
    assert_eq!(board.score("p2"), 1);
}

#[test]
fn test_finished_board_rejects_every_move() {
    let mut board = corner();
    board.try_place(across(1), "car", "p1");
    assert_eq!(board.try_challenge(across(1), "cat", "p2"), Outcome::Success);
    assert_eq!(board.try_place(down(1), "cow", "p1"), Outcome::Finished);
    let scores = (board.score("p1"), board.score("p2"));
    assert_eq!(scores, (1, 3));

    let before = board.clone();
    assert_eq!(board.try_challenge(down(1), "cow", "p2"), Outcome::Finished);
    assert_eq!(board.try_place(across(1), "cab", "p1"), Outcome::Finished);
    assert_eq!(board.try_place(across(9), "cab", "p1"), Outcome::Finished);
    assert_eq!(board, before);
    assert!(board.is_finished());
}

#[test]
fn test_text_rendering() {
    let mut board = corner();
    board.try_place(across(1), "car", "p1");
    board.try_challenge(across(1), "cat", "p2");
    assert_eq!(board.render_text(), "C A T\n_ # #\n_ # #\n");
}
