use super::*;
use crate::game::tile::Tile;

fn rng() -> StdRng {
    StdRng::seed_from_u64(11)
}

fn rack_of(faces: &str) -> Rack {
    Rack::from_tiles(faces.chars().map(Tile::new).collect())
}

fn board_with_center(face: char) -> Board {
    let mut board = Board::new();
    board.set(Coord::new(CENTER, CENTER), face);
    board
}

// =============================================================================
// hints
// =============================================================================

#[test]
fn hints_follow_dictionary_order_around_single_anchor() {
    let board = board_with_center('t');
    let dict = Dictionary::new("test", "", ["act", "ayooooo", "bruh", "tact", "toi"]);
    let hints = hints(&board, &dict, &rack_of("AACTOI"), false, &mut rng());
    assert_eq!(hints, vec!["!place h6h act", "!place h8h tact", "!place h8h toi"]);
}

#[test]
fn hints_report_shortfall() {
    let board = board_with_center('t');
    let dict = Dictionary::new("test", "", ["ayooooo", "bruh", "tact"]);
    let hints = hints(&board, &dict, &rack_of("AACTAI"), false, &mut rng());
    assert_eq!(hints, vec!["!place h8h tact", "!place h8v tact", "only 2 available"]);
}

#[test]
fn hints_on_empty_board_start_at_center() {
    let dict = Dictionary::new("test", "", ["cat"]);
    let hints = hints(&Board::new(), &dict, &rack_of("CAT"), true, &mut rng());
    assert_eq!(hints, vec!["!place h8h cat", "!place h8v cat", "only 2 available"]);
}

#[test]
fn hints_with_nothing_playable() {
    let dict = Dictionary::new("test", "", ["zzz"]);
    let hints = hints(&board_with_center('t'), &dict, &rack_of("AEI"), false, &mut rng());
    assert_eq!(hints, vec!["only 0 available"]);
}

#[test]
fn blank_fills_missing_letter_as_uppercase() {
    let mut rng = rng();
    let dict = Dictionary::new("test", "", ["at"]);
    let board = board_with_center('t');
    let search = MoveSearch::new(&board, &dict, &rack_of("*"), false, &mut rng);
    let spelled = search.spell(&search.blank_as.to_string(), None);
    assert_eq!(spelled, Some(search.blank_as.to_ascii_uppercase().to_string()));
    assert_eq!(search.spell("qq", None), None);
}

// =============================================================================
// plays
// =============================================================================

#[test]
fn best_play_takes_highest_score() {
    let board = board_with_center('t');
    let dict = Dictionary::new("test", "", ["at", "tact"]);
    let best = best_play(&board, &dict, &rack_of("ACT"), false, &mut rng()).unwrap();
    assert_eq!(best.placement.word, "tact");
    assert_eq!(best.points, 12);
}

#[test]
fn best_play_is_none_without_candidates() {
    let dict = Dictionary::new("test", "", ["zzz"]);
    assert!(best_play(&board_with_center('t'), &dict, &rack_of("AEI"), false, &mut rng()).is_none());
}

#[test]
fn random_play_stays_inside_a_point_band() {
    let board = board_with_center('t');
    let dict = Dictionary::new("test", "", ["at", "ta", "tact", "cat", "act"]);
    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        if let Some(candidate) = random_play(&board, &dict, &rack_of("ACT"), false, &mut rng) {
            assert!(candidate.points > 0 && candidate.points <= 18);
            assert!(board.validate_placement(&candidate.placement, false, &dict).is_ok());
        }
    }
}

#[test]
fn candidate_command_uses_row_letter_and_column() {
    let candidate = Candidate { placement: Placement::new(4, 2, Orientation::Vertical, "doG"), points: 5 };
    assert_eq!(candidate.command(), "!place c5v doG");
}

// =============================================================================
// actions
// =============================================================================

#[test]
fn play_is_the_most_frequent_action() {
    let mut rng = rng();
    let plays = (0..1000).filter(|_| choose_action(&mut rng) == AiAction::Play).count();
    assert!(plays > 700, "plays = {plays}");
}

#[test]
fn bands_are_reference_targets() {
    let mut rng = rng();
    for _ in 0..100 {
        assert!(POINT_BANDS.contains(&choose_band(&mut rng)));
    }
}

#[test]
fn random_exchange_picks_held_letters() {
    let rack = rack_of("AB*");
    let mut rng = rng();
    for _ in 0..20 {
        let letters = random_exchange(&rack, &mut rng);
        assert!((1..=3).contains(&letters.len()));
        assert!(rack.locate(&crate::game::rack::Wanted::from_exchange(&letters)).is_ok());
    }
    assert_eq!(random_exchange(&Rack::new(), &mut rng), "");
}
