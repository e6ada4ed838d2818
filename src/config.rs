//! Runtime configuration from environment variables.
//!
//! Every knob has a `DEFAULT_*` constant and is read once at startup with
//! `env_parse`, which falls back to the default on a missing or malformed
//! value. Tests build a `GameConfig` with `for_tests()` instead, which keeps
//! every delay in the low milliseconds.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_DICTIONARY_DIR: &str = "assets/dictionaries";
pub const DEFAULT_TURN_SECONDS: u32 = 60;
pub const DEFAULT_TURN_SECONDS_MIN: u32 = 30;
pub const DEFAULT_TURN_SECONDS_MAX: u32 = 300;
pub const DEFAULT_TICK_MS: u64 = 1000;
pub const DEFAULT_DISCONNECT_GRACE_MS: u64 = 5000;
pub const DEFAULT_BOARD_REFRESH_MS: u64 = 3000;
pub const DEFAULT_AI_PLAY_DELAY_MS: u64 = 3000;
pub const DEFAULT_AI_END_TURN_DELAY_MS: u64 = 17_000;
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 512;

/// Parse an environment variable, or return `default`.
pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct GameConfig {
    pub port: u16,
    /// `None` runs on the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub dictionary_dir: PathBuf,
    pub turn_seconds_default: u32,
    pub turn_seconds_min: u32,
    pub turn_seconds_max: u32,
    pub tick: Duration,
    pub disconnect_grace: Duration,
    pub board_refresh: Duration,
    pub ai_play_delay: Duration,
    pub ai_end_turn_delay: Duration,
    pub max_message_len: usize,
}

impl GameConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let ms = |key: &str, default: u64| Duration::from_millis(env_parse(key, default));
        Self {
            port: env_parse("PORT", DEFAULT_PORT),
            database_url: std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            dictionary_dir: std::env::var("DICTIONARY_DIR")
                .map_or_else(|_| PathBuf::from(DEFAULT_DICTIONARY_DIR), PathBuf::from),
            turn_seconds_default: env_parse("TURN_SECONDS_DEFAULT", DEFAULT_TURN_SECONDS),
            turn_seconds_min: env_parse("TURN_SECONDS_MIN", DEFAULT_TURN_SECONDS_MIN),
            turn_seconds_max: env_parse("TURN_SECONDS_MAX", DEFAULT_TURN_SECONDS_MAX),
            tick: ms("TICK_MS", DEFAULT_TICK_MS),
            disconnect_grace: ms("DISCONNECT_GRACE_MS", DEFAULT_DISCONNECT_GRACE_MS),
            board_refresh: ms("BOARD_REFRESH_MS", DEFAULT_BOARD_REFRESH_MS),
            ai_play_delay: ms("AI_PLAY_DELAY_MS", DEFAULT_AI_PLAY_DELAY_MS),
            ai_end_turn_delay: ms("AI_END_TURN_DELAY_MS", DEFAULT_AI_END_TURN_DELAY_MS),
            max_message_len: env_parse("MAX_MESSAGE_LEN", DEFAULT_MAX_MESSAGE_LEN),
        }
    }

    /// Reference timings compressed so room tests finish quickly.
    #[must_use]
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            database_url: None,
            db_max_connections: 1,
            dictionary_dir: PathBuf::from(DEFAULT_DICTIONARY_DIR),
            turn_seconds_default: DEFAULT_TURN_SECONDS,
            turn_seconds_min: DEFAULT_TURN_SECONDS_MIN,
            turn_seconds_max: DEFAULT_TURN_SECONDS_MAX,
            tick: Duration::from_millis(5),
            disconnect_grace: Duration::from_millis(30),
            board_refresh: Duration::from_millis(10),
            ai_play_delay: Duration::from_millis(5),
            ai_end_turn_delay: Duration::from_millis(10),
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
        }
    }

    /// Requested turn length clamped to the allowed range; `None` uses the default.
    #[must_use]
    pub fn clamp_turn_seconds(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.turn_seconds_default)
            .clamp(self.turn_seconds_min, self.turn_seconds_max.max(self.turn_seconds_min))
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
