//! Storage layer for focus sessions.
//!
//! Persists the blocked-app list, user preferences and the archive of
//! finished session summaries using `rusqlite`.
//!
//! # Thread Safety
//!
//! [`Database`] wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! The CLI owns a single instance on its event-loop thread.
//!
//! # Schema
//!
//! Timestamps are stored as TEXT in RFC 3339 format with millisecond precision
//! (e.g., `2024-01-15T10:30:00.000Z`), so lexicographic order matches
//! chronological order. The per-kind distraction breakdown of a summary is
//! stored as a JSON object keyed by distraction kind name.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use focus_core::registry::PreferenceStore;
use focus_core::summary::{SessionEnd, SessionSummary};
use focus_core::types::{BlockedApp, DistractionKind, SessionKind, ValidationError};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use uuid::Uuid;

const DEFAULT_KIND_KEY: &str = "default_session_kind";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for summary {id}: {timestamp}")]
    TimestampParse {
        id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored summary could not be decoded.
    #[error("invalid summary {id}: {message}")]
    InvalidSummary { id: String, message: String },
    /// A stored preference holds an unknown value.
    #[error("invalid preference {key}")]
    InvalidPreference {
        key: &'static str,
        #[source]
        source: ValidationError,
    },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// An archived session summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRecord {
    pub id: String,
    pub summary: SessionSummary,
}

/// Aggregates over archived summaries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalStats {
    pub total_sessions: u64,
    pub completed_sessions: u64,
    /// Percentage, rounded to one decimal.
    pub completion_rate: f64,
    pub total_focus_minutes: u64,
    pub avg_focus_minutes: f64,
    pub avg_focus_score: f64,
}

struct SummaryRow {
    id: String,
    ended_at: String,
    kind: String,
    planned_secs: u32,
    focused_secs: u32,
    completed: bool,
    total_distractions: u32,
    blocked_shortcuts: u32,
    focus_score: u32,
    breakdown: String,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The schema is initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database, destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Idempotent.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS blocked_apps (
                name TEXT PRIMARY KEY,
                category TEXT NOT NULL DEFAULT '',
                blocked INTEGER NOT NULL DEFAULT 1
            );

            CREATE TABLE IF NOT EXISTS preferences (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            -- One row per finished session.
            -- breakdown: JSON object of distraction kind -> count
            CREATE TABLE IF NOT EXISTS session_summaries (
                id TEXT PRIMARY KEY,
                ended_at TEXT NOT NULL,
                kind TEXT NOT NULL,
                planned_secs INTEGER NOT NULL,
                focused_secs INTEGER NOT NULL,
                completed INTEGER NOT NULL,
                total_distractions INTEGER NOT NULL,
                blocked_shortcuts INTEGER NOT NULL,
                focus_score INTEGER NOT NULL,
                breakdown TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_session_summaries_ended ON session_summaries(ended_at);
            ",
        )?;
        Ok(())
    }

    /// Stores a finished session and returns its archive ID.
    pub fn archive_summary(&mut self, summary: &SessionSummary) -> Result<String, DbError> {
        let id = Uuid::new_v4().to_string();
        let breakdown = serde_json::to_string(&summary.breakdown_by_kind).map_err(|err| {
            DbError::InvalidSummary {
                id: id.clone(),
                message: err.to_string(),
            }
        })?;
        self.conn.execute(
            "
            INSERT INTO session_summaries
            (id, ended_at, kind, planned_secs, focused_secs, completed,
             total_distractions, blocked_shortcuts, focus_score, breakdown)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                id,
                format_timestamp(summary.ended_at),
                summary.kind.as_str(),
                summary.planned_secs,
                summary.focused_secs,
                summary.completed(),
                summary.total_distractions,
                summary.blocked_shortcut_count,
                summary.focus_score_percent,
                breakdown,
            ],
        )?;
        tracing::debug!(%id, kind = %summary.kind, "archived session summary");
        Ok(id)
    }

    /// Lists summaries that ended at or after `since`, newest first.
    pub fn list_summaries(&self, since: DateTime<Utc>) -> Result<Vec<SummaryRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, ended_at, kind, planned_secs, focused_secs, completed,
                   total_distractions, blocked_shortcuts, focus_score, breakdown
            FROM session_summaries
            WHERE ended_at >= ?
            ORDER BY ended_at DESC, id ASC
            ",
        )?;
        let rows = stmt.query_map([format_timestamp(since)], |row| {
            Ok(SummaryRow {
                id: row.get(0)?,
                ended_at: row.get(1)?,
                kind: row.get(2)?,
                planned_secs: row.get(3)?,
                focused_secs: row.get(4)?,
                completed: row.get(5)?,
                total_distractions: row.get(6)?,
                blocked_shortcuts: row.get(7)?,
                focus_score: row.get(8)?,
                breakdown: row.get(9)?,
            })
        })?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }
        Ok(records)
    }

    /// Aggregates summaries that ended at or after `since`.
    #[allow(clippy::cast_precision_loss)]
    pub fn summary_stats(&self, since: DateTime<Utc>) -> Result<LocalStats, DbError> {
        let (total, completed, focused_secs, avg_score) = self.conn.query_row(
            "
            SELECT COUNT(*), COALESCE(SUM(completed), 0), COALESCE(SUM(focused_secs), 0), AVG(focus_score)
            FROM session_summaries
            WHERE ended_at >= ?
            ",
            [format_timestamp(since)],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<f64>>(3)?,
                ))
            },
        )?;
        let total_sessions = u64::try_from(total).unwrap_or(0);
        let completed_sessions = u64::try_from(completed).unwrap_or(0);
        let focused_secs = u64::try_from(focused_secs).unwrap_or(0);

        let (completion_rate, avg_focus_minutes) = if total_sessions == 0 {
            (0.0, 0.0)
        } else {
            (
                round_tenth(completed_sessions as f64 * 100.0 / total_sessions as f64),
                round_tenth(focused_secs as f64 / 60.0 / total_sessions as f64),
            )
        };
        Ok(LocalStats {
            total_sessions,
            completed_sessions,
            completion_rate,
            total_focus_minutes: focused_secs / 60,
            avg_focus_minutes,
            avg_focus_score: round_tenth(avg_score.unwrap_or(0.0)),
        })
    }
}

impl PreferenceStore for Database {
    type Error = DbError;

    fn load_blocked_apps(&self) -> Result<Vec<BlockedApp>, Self::Error> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, category, blocked FROM blocked_apps ORDER BY name COLLATE NOCASE")?;
        let rows = stmt.query_map([], |row| {
            Ok(BlockedApp {
                name: row.get(0)?,
                category: row.get(1)?,
                blocked: row.get(2)?,
            })
        })?;
        let mut apps = Vec::new();
        for row in rows {
            apps.push(row?);
        }
        Ok(apps)
    }

    fn save_blocked_app(&mut self, app: &BlockedApp) -> Result<(), Self::Error> {
        self.conn.execute(
            "
            INSERT INTO blocked_apps (name, category, blocked) VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET category = excluded.category, blocked = excluded.blocked
            ",
            params![app.name, app.category, app.blocked],
        )?;
        Ok(())
    }

    fn delete_blocked_app(&mut self, name: &str) -> Result<(), Self::Error> {
        self.conn
            .execute("DELETE FROM blocked_apps WHERE name = ?", [name])?;
        Ok(())
    }

    fn load_default_kind(&self) -> Result<Option<SessionKind>, Self::Error> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?",
                [DEFAULT_KIND_KEY],
                |row| row.get(0),
            )
            .optional()?;
        value
            .map(|value| value.parse::<SessionKind>())
            .transpose()
            .map_err(|source| DbError::InvalidPreference {
                key: DEFAULT_KIND_KEY,
                source,
            })
    }

    fn save_default_kind(&mut self, kind: SessionKind) -> Result<(), Self::Error> {
        self.conn.execute(
            "
            INSERT INTO preferences (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            ",
            params![DEFAULT_KIND_KEY, kind.as_str()],
        )?;
        Ok(())
    }
}

impl SummaryRow {
    fn into_record(self) -> Result<SummaryRecord, DbError> {
        let ended_at = parse_timestamp(&self.ended_at, &self.id)?;
        let kind: SessionKind = self.kind.parse().map_err(|err: ValidationError| {
            DbError::InvalidSummary {
                id: self.id.clone(),
                message: err.to_string(),
            }
        })?;
        let breakdown_by_kind: BTreeMap<DistractionKind, u32> =
            serde_json::from_str(&self.breakdown).map_err(|err| DbError::InvalidSummary {
                id: self.id.clone(),
                message: err.to_string(),
            })?;
        let end = if self.completed {
            SessionEnd::Completed
        } else {
            SessionEnd::Stopped
        };
        Ok(SummaryRecord {
            id: self.id,
            summary: SessionSummary {
                total_distractions: self.total_distractions,
                blocked_shortcut_count: self.blocked_shortcuts,
                focus_score_percent: self.focus_score,
                breakdown_by_kind,
                kind,
                planned_secs: self.planned_secs,
                focused_secs: self.focused_secs,
                end,
                ended_at,
            },
        })
    }
}

fn parse_timestamp(timestamp: &str, id: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            id: id.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
