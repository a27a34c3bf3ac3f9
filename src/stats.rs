use crate::app_dirs::AppDirs;
use crate::error::{IoSnafu, Result};
use crate::language::KeyDifficulty;
use crate::metrics::SessionResult;
use crate::review::{CharacterOutcome, ReviewRecord};
use chrono::{DateTime, Local};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS sessions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        lesson INTEGER,
        scheme TEXT NOT NULL,
        duration_ms INTEGER NOT NULL,
        speed_cpm INTEGER NOT NULL,
        accuracy_pct INTEGER NOT NULL,
        error_count INTEGER NOT NULL,
        total_characters INTEGER NOT NULL,
        correct_characters INTEGER NOT NULL,
        completed BOOLEAN NOT NULL,
        score INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_sessions_timestamp ON sessions(timestamp);

    CREATE TABLE IF NOT EXISTS key_stats (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id INTEGER NOT NULL REFERENCES sessions(id),
        code TEXT NOT NULL,
        stage TEXT NOT NULL,
        was_correct BOOLEAN NOT NULL,
        time_to_press_ms INTEGER NOT NULL,
        timestamp TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_key_stats_code ON key_stats(code);

    CREATE TABLE IF NOT EXISTS achievements (
        id TEXT PRIMARY KEY,
        unlocked_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS review_records (
        character TEXT PRIMARY KEY,
        initial_code TEXT NOT NULL,
        final_code TEXT NOT NULL,
        error_count INTEGER NOT NULL,
        last_error TEXT NOT NULL,
        review_count INTEGER NOT NULL DEFAULT 0,
        last_review TEXT
    );

    CREATE TABLE IF NOT EXISTS review_sessions (
        session_id INTEGER PRIMARY KEY REFERENCES sessions(id)
    );
"#;

/// One row of practice history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub timestamp: DateTime<Local>,
    pub lesson: Option<u32>,
    pub scheme: String,
    pub duration_ms: u64,
    pub speed_cpm: u32,
    pub accuracy_pct: u32,
    pub error_count: usize,
    pub total_characters: usize,
    pub correct_characters: usize,
    pub completed: bool,
    pub score: u32,
}

impl SessionRecord {
    pub fn from_result(result: &SessionResult, scheme: &str, lesson: Option<u32>) -> Self {
        Self {
            timestamp: result.started_at,
            lesson,
            scheme: scheme.to_string(),
            duration_ms: result.duration_ms,
            speed_cpm: result.speed_cpm,
            accuracy_pct: result.accuracy_pct,
            error_count: result.errors.len(),
            total_characters: result.total_characters,
            correct_characters: result.correct_characters,
            completed: result.completed,
            score: result.score,
        }
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            timestamp: parse_timestamp(row, 0)?,
            lesson: row.get(1)?,
            scheme: row.get(2)?,
            duration_ms: row.get(3)?,
            speed_cpm: row.get(4)?,
            accuracy_pct: row.get(5)?,
            error_count: row.get(6)?,
            total_characters: row.get(7)?,
            correct_characters: row.get(8)?,
            completed: row.get(9)?,
            score: row.get(10)?,
        })
    }
}

/// Aggregated history for one key code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeySummary {
    pub code: String,
    pub avg_time_ms: f64,
    pub miss_rate: f64,
    pub total_attempts: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnlockedAchievement {
    pub id: String,
    pub unlocked_at: DateTime<Local>,
}

/// SQLite store for session history, per-key statistics and achievements
#[derive(Debug)]
pub struct StatsDb {
    conn: Connection,
}

impl StatsDb {
    /// Open the database at the platform state directory
    pub fn new() -> Result<Self> {
        let path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("shuangpin_stats.db"));
        Self::open(path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).context(IoSnafu)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(StatsDb { conn })
    }

    /// Store a finished session and every keystroke it logged
    pub fn record_session(
        &mut self,
        result: &SessionResult,
        scheme: &str,
        lesson: Option<u32>,
    ) -> Result<i64> {
        let record = SessionRecord::from_result(result, scheme, lesson);
        let timestamp = record.timestamp.to_rfc3339();
        let tx = self.conn.transaction()?;
        let session_id = insert_session(&tx, &record)?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO key_stats
                (session_id, code, stage, was_correct, time_to_press_ms, timestamp)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;
            for keystroke in &result.keystrokes {
                stmt.execute(params![
                    session_id,
                    keystroke.expected_code,
                    keystroke.stage.to_string(),
                    keystroke.correct,
                    keystroke.interval_ms,
                    timestamp,
                ])?;
            }
        }

        tx.commit()?;
        Ok(session_id)
    }

    /// Add history rows that carry no keystroke detail, e.g. from an export.
    /// Rows whose timestamp is already stored are skipped; returns how many were added.
    pub fn import_sessions(&mut self, records: &[SessionRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut added = 0;
        for record in records {
            let exists: Option<i64> = tx
                .query_row(
                    "SELECT id FROM sessions WHERE timestamp = ?1",
                    params![record.timestamp.to_rfc3339()],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_none() {
                insert_session(&tx, record)?;
                added += 1;
            }
        }
        tx.commit()?;
        Ok(added)
    }

    /// Newest first
    pub fn recent_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>> {
        self.query_sessions(
            &format!("{SESSION_COLUMNS} ORDER BY timestamp DESC, id DESC LIMIT ?1"),
            params![limit],
        )
    }

    /// Oldest first
    pub fn all_sessions(&self) -> Result<Vec<SessionRecord>> {
        self.query_sessions(
            &format!("{SESSION_COLUMNS} ORDER BY timestamp ASC, id ASC"),
            params![],
        )
    }

    fn query_sessions<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<SessionRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, SessionRecord::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn key_summary(&self) -> Result<Vec<KeySummary>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                code,
                AVG(CASE WHEN was_correct = 1 THEN time_to_press_ms END) as avg_time,
                (SUM(CASE WHEN was_correct = 0 THEN 1 ELSE 0 END) * 100.0 / COUNT(*)) as miss_rate,
                COUNT(*) as total_attempts
            FROM key_stats
            WHERE code != ''
            GROUP BY code
            ORDER BY code
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let avg_time: Option<f64> = row.get(1)?;
            Ok(KeySummary {
                code: row.get(0)?,
                avg_time_ms: avg_time.unwrap_or(0.0),
                miss_rate: row.get(2)?,
                total_attempts: row.get(3)?,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Per-code difficulty for adaptive selection
    pub fn key_difficulties(&self) -> Result<HashMap<String, KeyDifficulty>> {
        Ok(self
            .key_summary()?
            .into_iter()
            .map(|s| {
                (
                    s.code,
                    KeyDifficulty {
                        miss_rate: s.miss_rate,
                        avg_time_ms: s.avg_time_ms,
                        total_attempts: s.total_attempts,
                    },
                )
            })
            .collect())
    }

    /// Returns `true` only the first time an id is unlocked
    pub fn unlock_achievement(&self, id: &str, at: DateTime<Local>) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO achievements (id, unlocked_at) VALUES (?1, ?2)",
            params![id, at.to_rfc3339()],
        )?;
        Ok(inserted > 0)
    }

    pub fn unlocked_achievements(&self) -> Result<Vec<UnlockedAchievement>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, unlocked_at FROM achievements ORDER BY unlocked_at, id")?;
        let rows = stmt.query_map([], |row| {
            Ok(UnlockedAchievement {
                id: row.get(0)?,
                unlocked_at: parse_timestamp(row, 1)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Fold one drill into the per-character mistake history.
    ///
    /// Misses always count. A clean completion counts as a review only in a
    /// review drill, at most once per character, and only for characters that
    /// already have a record.
    pub fn update_review_records(
        &mut self,
        outcomes: &[CharacterOutcome],
        reviewing: bool,
        at: DateTime<Local>,
    ) -> Result<()> {
        let at = at.to_rfc3339();
        let mut reviewed = HashSet::new();
        let tx = self.conn.transaction()?;
        for outcome in outcomes {
            let character = outcome.item.character.to_string();
            if outcome.misses > 0 {
                tx.execute(
                    r#"
                    INSERT INTO review_records
                    (character, initial_code, final_code, error_count, last_error)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    ON CONFLICT(character) DO UPDATE SET
                        initial_code = excluded.initial_code,
                        final_code = excluded.final_code,
                        error_count = error_count + excluded.error_count,
                        last_error = excluded.last_error
                    "#,
                    params![
                        character,
                        outcome.item.initial_code,
                        outcome.item.final_code,
                        outcome.misses,
                        at,
                    ],
                )?;
            } else if reviewing && outcome.completed && reviewed.insert(outcome.item.character) {
                tx.execute(
                    r#"
                    UPDATE review_records
                    SET review_count = review_count + 1, last_review = ?2
                    WHERE character = ?1
                    "#,
                    params![character, at],
                )?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn review_records(&self) -> Result<Vec<ReviewRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT character, initial_code, final_code, error_count, last_error,
                   review_count, last_review
            FROM review_records
            ORDER BY character
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            let character: String = row.get(0)?;
            let last_review: Option<String> = row.get(6)?;
            Ok(ReviewRecord {
                character: character.chars().next().ok_or_else(|| {
                    rusqlite::Error::FromSqlConversionFailure(
                        0,
                        rusqlite::types::Type::Text,
                        "empty review character".into(),
                    )
                })?,
                initial_code: row.get(1)?,
                final_code: row.get(2)?,
                error_count: row.get(3)?,
                last_error: parse_timestamp(row, 4)?,
                review_count: row.get(5)?,
                last_review: last_review
                    .map(|raw| parse_rfc3339(&raw, 6))
                    .transpose()?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Mark a stored session as a finished review drill
    pub fn record_review_session(&self, session_id: i64) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO review_sessions (session_id) VALUES (?1)",
            params![session_id],
        )?;
        Ok(())
    }

    pub fn review_session_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM review_sessions", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Clear all history (for testing or reset purposes)
    pub fn clear_all(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            DELETE FROM key_stats;
            DELETE FROM review_sessions;
            DELETE FROM sessions;
            DELETE FROM achievements;
            DELETE FROM review_records;
            "#,
        )?;
        Ok(())
    }
}

fn insert_session(tx: &Transaction, record: &SessionRecord) -> rusqlite::Result<i64> {
    tx.execute(
        r#"
        INSERT INTO sessions
        (timestamp, lesson, scheme, duration_ms, speed_cpm, accuracy_pct, error_count,
         total_characters, correct_characters, completed, score)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
        params![
            record.timestamp.to_rfc3339(),
            record.lesson,
            record.scheme,
            record.duration_ms,
            record.speed_cpm,
            record.accuracy_pct,
            record.error_count,
            record.total_characters,
            record.correct_characters,
            record.completed,
            record.score,
        ],
    )?;
    Ok(tx.last_insert_rowid())
}

const SESSION_COLUMNS: &str = r#"
    SELECT timestamp, lesson, scheme, duration_ms, speed_cpm, accuracy_pct, error_count,
           total_characters, correct_characters, completed, score
    FROM sessions"#;

fn parse_timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Local>> {
    let raw: String = row.get(idx)?;
    parse_rfc3339(&raw, idx)
}

fn parse_rfc3339(raw: &str, idx: usize) -> rusqlite::Result<DateTime<Local>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Local))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}
