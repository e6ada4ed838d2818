use super::*;

#[test]
fn env_parse_missing_returns_default() {
    let val: usize = env_parse("__WORDGAME_TEST_MISSING__", 42);
    assert_eq!(val, 42);
}

#[test]
fn env_parse_present_valid() {
    unsafe { std::env::set_var("__WORDGAME_TEST_VALID__", "99") };
    let val: u64 = env_parse("__WORDGAME_TEST_VALID__", 0);
    assert_eq!(val, 99);
    unsafe { std::env::remove_var("__WORDGAME_TEST_VALID__") };
}

#[test]
fn env_parse_present_invalid_returns_default() {
    unsafe { std::env::set_var("__WORDGAME_TEST_INVALID__", "sixty") };
    let val: u32 = env_parse("__WORDGAME_TEST_INVALID__", 60);
    assert_eq!(val, 60);
    unsafe { std::env::remove_var("__WORDGAME_TEST_INVALID__") };
}

#[test]
fn turn_seconds_are_clamped() {
    let config = GameConfig::for_tests();
    assert_eq!(config.clamp_turn_seconds(None), DEFAULT_TURN_SECONDS);
    assert_eq!(config.clamp_turn_seconds(Some(5)), DEFAULT_TURN_SECONDS_MIN);
    assert_eq!(config.clamp_turn_seconds(Some(9000)), DEFAULT_TURN_SECONDS_MAX);
    assert_eq!(config.clamp_turn_seconds(Some(90)), 90);
}

#[test]
fn test_config_uses_short_delays() {
    let config = GameConfig::for_tests();
    assert!(config.tick < Duration::from_millis(100));
    assert!(config.database_url.is_none());
    assert_eq!(config.max_message_len, 512);
}
