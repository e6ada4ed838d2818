use super::*;
use crate::game::board::{Board, Coord, Orientation, Placement};
use crate::game::dictionary::Dictionary;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn dict() -> Dictionary {
    Dictionary::new("test", "", ["zoo", "aie", "cat", "as", "at", "abandons", "ta"])
}

fn check(board: &Board, x: usize, y: usize, orientation: Orientation, word: &str, first: bool) -> PlacementCheck {
    board.validate_placement(&Placement::new(x, y, orientation, word), first, &dict()).unwrap()
}

fn tracker_with(objective: Objective, scope: Scope) -> ObjectiveTracker {
    match scope {
        Scope::Private => ObjectiveTracker::with_objectives([Some(objective), None], Vec::new()),
        Scope::Public => ObjectiveTracker::with_objectives([None, None], vec![objective]),
    }
}

#[test]
fn draw_assigns_four_distinct_objectives() {
    let tracker = ObjectiveTracker::draw(&mut StdRng::seed_from_u64(3));
    let mut all: Vec<Objective> = tracker.public().to_vec();
    all.extend([tracker.private(0).unwrap(), tracker.private(1).unwrap()]);
    all.sort_by_key(|o| Objective::ALL.iter().position(|x| x == o));
    all.dedup();
    assert_eq!(all.len(), 4);
}

#[test]
fn placing_z_completes_private_objective_once() {
    let board = Board::new();
    let mut tracker = tracker_with(Objective::PlaceZ, Scope::Private);
    let placed = check(&board, 7, 7, Orientation::Horizontal, "zoo", true);
    let done = tracker.on_placement(0, &placed);
    assert_eq!(done, vec![Completion { objective: Objective::PlaceZ, scope: Scope::Private }]);
    assert_eq!(tracker.private(0), None);
    assert!(tracker.on_placement(0, &placed).is_empty());
}

#[test]
fn private_objective_belongs_to_its_seat() {
    let board = Board::new();
    let mut tracker = tracker_with(Objective::PlaceZ, Scope::Private);
    let placed = check(&board, 7, 7, Orientation::Horizontal, "zoo", true);
    assert!(tracker.on_placement(1, &placed).is_empty());
    assert_eq!(tracker.private(0), Some(Objective::PlaceZ));
}

#[test]
fn public_objective_is_removed_for_everyone() {
    let board = Board::new();
    let mut tracker = tracker_with(Objective::VowelWord, Scope::Public);
    let placed = check(&board, 7, 7, Orientation::Vertical, "aie", true);
    let done = tracker.on_placement(1, &placed);
    assert_eq!(done[0].points(), 15);
    assert!(tracker.public().is_empty());
}

#[test]
fn edge_cell_touches_border() {
    let mut board = Board::new();
    for (x, c) in (7..10).zip("cat".chars()) {
        board.set(Coord::new(x, 7), c);
    }
    let mut tracker = tracker_with(Objective::TouchBorder, Scope::Public);
    let inner = check(&board, 8, 6, Orientation::Vertical, "ta", false);
    assert!(tracker.on_placement(0, &inner).is_empty());

    let mut edge = Board::new();
    edge.set(Coord::new(7, 13), 't');
    let bottom = check(&edge, 7, 14, Orientation::Horizontal, "at", false);
    assert_eq!(tracker.on_placement(0, &bottom).len(), 1);
}

#[test]
fn same_word_three_times() {
    let board = Board::new();
    let mut tracker = tracker_with(Objective::SameWordThrice, Scope::Public);
    let placed = check(&board, 7, 7, Orientation::Horizontal, "cat", true);
    assert!(tracker.on_placement(0, &placed).is_empty());
    assert!(tracker.on_placement(1, &placed).is_empty());
    assert_eq!(tracker.on_placement(0, &placed).len(), 1);
}

#[test]
fn two_blanks_by_the_same_seat() {
    let board = Board::new();
    let mut tracker = tracker_with(Objective::BothBlanks, Scope::Public);
    let one_blank = check(&board, 7, 7, Orientation::Horizontal, "cAt", true);
    assert!(tracker.on_placement(0, &one_blank).is_empty());
    assert!(tracker.on_placement(1, &one_blank).is_empty());
    assert_eq!(tracker.on_placement(0, &one_blank).len(), 1);
}

#[test]
fn long_word_counts_full_word_length() {
    let board = Board::new();
    let mut tracker = tracker_with(Objective::LongWord, Scope::Private);
    let placed = check(&board, 5, 7, Orientation::Horizontal, "abandons", true);
    assert_eq!(tracker.on_placement(0, &placed).len(), 1);
}

#[test]
fn rack_sequence_requires_five_in_order() {
    let mut tracker = tracker_with(Objective::RackSequence, Scope::Private);
    assert!(tracker.on_rack_order(0, "ABCDXE").is_empty());
    assert_eq!(tracker.on_rack_order(0, "XABCDE").len(), 1);
}

#[test]
fn sequence_detection() {
    assert!(has_sequence("abcde", 5));
    assert!(has_sequence("zQRSTUz", 5));
    assert!(!has_sequence("abcdf", 5));
    assert!(!has_sequence("", 5));
}
