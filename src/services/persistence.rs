//! Persistence service — leaderboards, match history, and AI names.
//!
//! DESIGN
//! ======
//! Rooms and the lobby talk to a `Store` trait object so the server can run
//! against Postgres (`PgStore`) or entirely in memory (`MemoryStore`, used by
//! tests and by database-less runs). Both implementations share the same
//! semantics:
//!
//! - Leaderboards keep one row per (mode, name) holding that name's best
//!   score. The public view merges names that share a score and keeps the
//!   five best scores.
//! - Match history is append-only.
//! - AI names are tagged by difficulty. The last name of a difficulty cannot
//!   be deleted, so a solo game can always name its opponent.
//! - `reset` wipes one category and reseeds its defaults.
//!
//! ERROR HANDLING
//! ==============
//! Store failures never end a game. Callers log them at warn and carry on;
//! admin requests surface them to the requester as structured error frames.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::game::{Difficulty, GameMode};

/// Scores shown per leaderboard.
pub const LEADERBOARD_SIZE: usize = 5;

const DEFAULT_AI_NAMES: [(&str, Difficulty); 6] = [
    ("Andy", Difficulty::Novice),
    ("Chu", Difficulty::Novice),
    ("Laurent", Difficulty::Novice),
    ("Olivier", Difficulty::Expert),
    ("Lucy", Difficulty::Expert),
    ("Jason", Difficulty::Expert),
];

const DEFAULT_SCORES: [(&str, i32); 5] =
    [("Player1", 5), ("Player2", 10), ("Player3", 15), ("Player4", 20), ("Player5", 25)];

const MODES: [GameMode; 2] = [GameMode::Classic, GameMode::Objectives];

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("AI name not found: {0}")]
    AiNameNotFound(String),
    #[error("AI name already exists: {0}")]
    AiNameTaken(String),
    #[error("the last {0} AI name cannot be deleted")]
    LastAiName(&'static str),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl crate::frame::ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::AiNameNotFound(_) => "E_AI_NAME_NOT_FOUND",
            Self::AiNameTaken(_) => "E_AI_NAME_TAKEN",
            Self::LastAiName(_) => "E_LAST_AI_NAME",
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

/// Store categories that can be wiped and reseeded. Dictionaries live on
/// disk and are reset by the dictionary library instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorePart {
    History,
    Scores,
    AiNames,
}

/// One leaderboard line: every name that reached `points`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreEntry {
    pub names: Vec<String>,
    pub points: i32,
}

/// Summary of one finished (or abandoned) match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchRecord {
    #[serde(with = "time::serde::timestamp")]
    pub played_at: OffsetDateTime,
    pub duration_secs: i64,
    pub player_one: String,
    pub player_one_points: i32,
    pub player_two: String,
    pub player_two_points: i32,
    pub mode: GameMode,
    pub abandoned: bool,
    pub solo: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AiName {
    pub name: String,
    pub difficulty: Difficulty,
}

// =============================================================================
// STORE TRAIT
// =============================================================================

#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Record `points` for `name`, keeping only the name's best score.
    async fn record_score(&self, mode: GameMode, name: &str, points: i32) -> Result<(), StoreError>;

    /// The merged top scores for `mode`, best first.
    async fn top_scores(&self, mode: GameMode) -> Result<Vec<ScoreEntry>, StoreError>;

    async fn record_match(&self, record: &MatchRecord) -> Result<(), StoreError>;

    /// Every stored match, oldest first.
    async fn matches(&self) -> Result<Vec<MatchRecord>, StoreError>;

    async fn ai_names(&self, difficulty: Difficulty) -> Result<Vec<String>, StoreError>;

    async fn add_ai_name(&self, name: &str, difficulty: Difficulty) -> Result<(), StoreError>;

    async fn rename_ai_name(&self, name: &str, new_name: &str) -> Result<(), StoreError>;

    async fn delete_ai_name(&self, name: &str) -> Result<(), StoreError>;

    /// Wipe one category and reseed its defaults.
    async fn reset(&self, part: StorePart) -> Result<(), StoreError>;

    /// Seed default scores and AI names into empty tables.
    async fn seed_defaults(&self) -> Result<(), StoreError>;
}

/// Group best-per-name rows into the public leaderboard view.
fn merge_scores(rows: impl IntoIterator<Item = (String, i32)>) -> Vec<ScoreEntry> {
    let mut by_points: BTreeMap<i32, Vec<String>> = BTreeMap::new();
    for (name, points) in rows {
        by_points.entry(points).or_default().push(name);
    }
    by_points
        .into_iter()
        .rev()
        .take(LEADERBOARD_SIZE)
        .map(|(points, mut names)| {
            names.sort();
            ScoreEntry { names, points }
        })
        .collect()
}

// =============================================================================
// POSTGRES
// =============================================================================

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn seed_scores(&self) -> Result<(), StoreError> {
        for mode in MODES {
            for (name, points) in DEFAULT_SCORES {
                self.record_score(mode, name, points).await?;
            }
        }
        Ok(())
    }

    async fn seed_ai_names(&self) -> Result<(), StoreError> {
        for (name, difficulty) in DEFAULT_AI_NAMES {
            sqlx::query("INSERT INTO ai_names (name, difficulty) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING")
                .bind(name)
                .bind(difficulty.as_str())
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    async fn is_empty(&self, table: &str) -> Result<bool, StoreError> {
        let (count,) = sqlx::query_as::<_, (i64,)>(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await?;
        Ok(count == 0)
    }
}

#[async_trait::async_trait]
impl Store for PgStore {
    async fn record_score(&self, mode: GameMode, name: &str, points: i32) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO leaderboard (mode, username, points) VALUES ($1, $2, $3)
             ON CONFLICT (mode, username) DO UPDATE SET points = EXCLUDED.points
             WHERE leaderboard.points < EXCLUDED.points",
        )
        .bind(mode.as_str())
        .bind(name)
        .bind(points)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn top_scores(&self, mode: GameMode) -> Result<Vec<ScoreEntry>, StoreError> {
        let rows = sqlx::query_as::<_, (i32, Vec<String>)>(
            "SELECT points, array_agg(username ORDER BY username)
             FROM leaderboard WHERE mode = $1
             GROUP BY points ORDER BY points DESC LIMIT $2",
        )
        .bind(mode.as_str())
        .bind(i64::try_from(LEADERBOARD_SIZE).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(points, names)| ScoreEntry { names, points }).collect())
    }

    async fn record_match(&self, record: &MatchRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO match_history (id, played_at, duration_secs, player_one, player_one_points,
                                        player_two, player_two_points, mode, abandoned, solo)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(Uuid::new_v4())
        .bind(record.played_at.unix_timestamp())
        .bind(record.duration_secs)
        .bind(&record.player_one)
        .bind(record.player_one_points)
        .bind(&record.player_two)
        .bind(record.player_two_points)
        .bind(record.mode.as_str())
        .bind(record.abandoned)
        .bind(record.solo)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn matches(&self) -> Result<Vec<MatchRecord>, StoreError> {
        type Row = (i64, i64, String, i32, String, i32, String, bool, bool);
        let rows = sqlx::query_as::<_, Row>(
            "SELECT played_at, duration_secs, player_one, player_one_points, player_two,
                    player_two_points, mode, abandoned, solo
             FROM match_history ORDER BY played_at, seq",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(played_at, duration_secs, player_one, p1, player_two, p2, mode, abandoned, solo)| MatchRecord {
                played_at: OffsetDateTime::from_unix_timestamp(played_at).unwrap_or(OffsetDateTime::UNIX_EPOCH),
                duration_secs,
                player_one,
                player_one_points: p1,
                player_two,
                player_two_points: p2,
                mode: GameMode::parse(&mode).unwrap_or_default(),
                abandoned,
                solo,
            })
            .collect())
    }

    async fn ai_names(&self, difficulty: Difficulty) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query_as::<_, (String,)>("SELECT name FROM ai_names WHERE difficulty = $1 ORDER BY created_at, name")
            .bind(difficulty.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn add_ai_name(&self, name: &str, difficulty: Difficulty) -> Result<(), StoreError> {
        let result = sqlx::query("INSERT INTO ai_names (name, difficulty) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .bind(difficulty.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::AiNameTaken(name.to_owned()));
        }
        Ok(())
    }

    async fn rename_ai_name(&self, name: &str, new_name: &str) -> Result<(), StoreError> {
        if name != new_name {
            let taken = sqlx::query_as::<_, (String,)>("SELECT name FROM ai_names WHERE name = $1")
                .bind(new_name)
                .fetch_optional(&self.pool)
                .await?;
            if taken.is_some() {
                return Err(StoreError::AiNameTaken(new_name.to_owned()));
            }
        }
        let result = sqlx::query("UPDATE ai_names SET name = $2 WHERE name = $1")
            .bind(name)
            .bind(new_name)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::AiNameNotFound(name.to_owned()));
        }
        Ok(())
    }

    async fn delete_ai_name(&self, name: &str) -> Result<(), StoreError> {
        let Some((difficulty,)) = sqlx::query_as::<_, (String,)>("SELECT difficulty FROM ai_names WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Err(StoreError::AiNameNotFound(name.to_owned()));
        };
        let difficulty = Difficulty::parse(&difficulty).unwrap_or_default();
        if self.ai_names(difficulty).await?.len() <= 1 {
            return Err(StoreError::LastAiName(difficulty.as_str()));
        }
        sqlx::query("DELETE FROM ai_names WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn reset(&self, part: StorePart) -> Result<(), StoreError> {
        match part {
            StorePart::History => {
                sqlx::query("DELETE FROM match_history").execute(&self.pool).await?;
            }
            StorePart::Scores => {
                sqlx::query("DELETE FROM leaderboard").execute(&self.pool).await?;
                self.seed_scores().await?;
            }
            StorePart::AiNames => {
                sqlx::query("DELETE FROM ai_names").execute(&self.pool).await?;
                self.seed_ai_names().await?;
            }
        }
        Ok(())
    }

    async fn seed_defaults(&self) -> Result<(), StoreError> {
        if self.is_empty("leaderboard").await? {
            self.seed_scores().await?;
        }
        if self.is_empty("ai_names").await? {
            self.seed_ai_names().await?;
        }
        Ok(())
    }
}

// =============================================================================
// IN MEMORY
// =============================================================================

#[derive(Default)]
struct MemoryTables {
    scores: HashMap<(GameMode, String), i32>,
    matches: Vec<MatchRecord>,
    ai_names: Vec<AiName>,
}

impl MemoryTables {
    fn seed_scores(&mut self) {
        for mode in MODES {
            for (name, points) in DEFAULT_SCORES {
                self.scores.insert((mode, name.to_owned()), points);
            }
        }
    }

    fn seed_ai_names(&mut self) {
        self.ai_names = DEFAULT_AI_NAMES
            .iter()
            .map(|&(name, difficulty)| AiName { name: name.to_owned(), difficulty })
            .collect();
    }
}

/// Process-local store. Starts seeded with the defaults.
pub struct MemoryStore {
    tables: Mutex<MemoryTables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        let mut tables = MemoryTables::default();
        tables.seed_scores();
        tables.seed_ai_names();
        Self { tables: Mutex::new(tables) }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn record_score(&self, mode: GameMode, name: &str, points: i32) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        let best = tables.scores.entry((mode, name.to_owned())).or_insert(points);
        *best = (*best).max(points);
        Ok(())
    }

    async fn top_scores(&self, mode: GameMode) -> Result<Vec<ScoreEntry>, StoreError> {
        let tables = self.tables.lock().await;
        let rows = tables
            .scores
            .iter()
            .filter(|((m, _), _)| *m == mode)
            .map(|((_, name), points)| (name.clone(), *points));
        Ok(merge_scores(rows))
    }

    async fn record_match(&self, record: &MatchRecord) -> Result<(), StoreError> {
        self.tables.lock().await.matches.push(record.clone());
        Ok(())
    }

    async fn matches(&self) -> Result<Vec<MatchRecord>, StoreError> {
        Ok(self.tables.lock().await.matches.clone())
    }

    async fn ai_names(&self, difficulty: Difficulty) -> Result<Vec<String>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .ai_names
            .iter()
            .filter(|ai| ai.difficulty == difficulty)
            .map(|ai| ai.name.clone())
            .collect())
    }

    async fn add_ai_name(&self, name: &str, difficulty: Difficulty) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.ai_names.iter().any(|ai| ai.name == name) {
            return Err(StoreError::AiNameTaken(name.to_owned()));
        }
        tables.ai_names.push(AiName { name: name.to_owned(), difficulty });
        Ok(())
    }

    async fn rename_ai_name(&self, name: &str, new_name: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if name != new_name && tables.ai_names.iter().any(|ai| ai.name == new_name) {
            return Err(StoreError::AiNameTaken(new_name.to_owned()));
        }
        let Some(entry) = tables.ai_names.iter_mut().find(|ai| ai.name == name) else {
            return Err(StoreError::AiNameNotFound(name.to_owned()));
        };
        new_name.clone_into(&mut entry.name);
        Ok(())
    }

    async fn delete_ai_name(&self, name: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        let Some(index) = tables.ai_names.iter().position(|ai| ai.name == name) else {
            return Err(StoreError::AiNameNotFound(name.to_owned()));
        };
        let difficulty = tables.ai_names[index].difficulty;
        if tables.ai_names.iter().filter(|ai| ai.difficulty == difficulty).count() <= 1 {
            return Err(StoreError::LastAiName(difficulty.as_str()));
        }
        tables.ai_names.remove(index);
        Ok(())
    }

    async fn reset(&self, part: StorePart) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        match part {
            StorePart::History => tables.matches.clear(),
            StorePart::Scores => {
                tables.scores.clear();
                tables.seed_scores();
            }
            StorePart::AiNames => tables.seed_ai_names(),
        }
        Ok(())
    }

    async fn seed_defaults(&self) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.scores.is_empty() {
            tables.seed_scores();
        }
        if tables.ai_names.is_empty() {
            tables.seed_ai_names();
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "persistence_test.rs"]
mod tests;
