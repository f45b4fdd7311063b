use chrono::{DateTime, Local, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::error::{Result, SessionError, StoreError};
use crate::record::{RecordedExercise, RecordedSet, WorkoutRecord};
use crate::session::WorkoutSessionState;
use crate::util::mean;

/// Durable sink for finalized workouts. No retries happen behind this trait.
pub trait SessionStore {
    /// Persist a record, returning its storage id
    fn persist(&mut self, record: &WorkoutRecord) -> Result<i64, StoreError>;
}

/// What happened to a finished session's record
#[derive(Debug)]
pub enum FinishOutcome {
    Saved { id: i64, record: WorkoutRecord },
    /// The session is finalized but the store refused the record; the caller
    /// decides whether to retry with the returned record.
    NotSaved {
        record: WorkoutRecord,
        error: StoreError,
    },
}

impl FinishOutcome {
    pub fn record(&self) -> &WorkoutRecord {
        match self {
            FinishOutcome::Saved { record, .. } | FinishOutcome::NotSaved { record, .. } => record,
        }
    }
}

/// Finalizes `session` and hands the record to `store` once
pub fn finish_session<S: SessionStore + ?Sized>(
    session: &mut WorkoutSessionState,
    notes: &str,
    store: &mut S,
) -> Result<FinishOutcome, SessionError> {
    let record = session.finalize(notes)?;
    Ok(match store.persist(&record) {
        Ok(id) => FinishOutcome::Saved { id, record },
        Err(error) => {
            log::warn!("failed to persist session {}: {error}", record.template_id);
            FinishOutcome::NotSaved { record, error }
        }
    })
}

/// Keeps records in memory; useful for tests and dry runs
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    pub records: Vec<WorkoutRecord>,
}

impl SessionStore for MemorySessionStore {
    fn persist(&mut self, record: &WorkoutRecord) -> Result<i64, StoreError> {
        self.records.push(record.clone());
        Ok(self.records.len() as i64)
    }
}

/// One row of the history listing
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub id: i64,
    pub template_name: String,
    pub started_at: DateTime<Local>,
    pub elapsed_secs: u64,
    pub completed: bool,
    pub completed_sets: i64,
    pub total_sets: i64,
    pub total_volume: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryTotals {
    pub total_sessions: usize,
    pub total_sets: i64,
    pub total_volume: f64,
    pub avg_elapsed_secs: f64,
}

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    session_id: i64,
    started_at: &'a str,
    template: &'a str,
    exercise: &'a str,
    set_number: i64,
    reps: Option<u32>,
    weight: Option<f64>,
    duration_secs: Option<u32>,
    rest_secs: u32,
    completed: bool,
    note: &'a str,
}

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS sessions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        template_id TEXT NOT NULL,
        template_name TEXT NOT NULL,
        started_at TEXT NOT NULL,
        ended_at TEXT NOT NULL,
        elapsed_secs INTEGER NOT NULL,
        notes TEXT NOT NULL DEFAULT '',
        completed BOOLEAN NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );
    CREATE TABLE IF NOT EXISTS session_exercises (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id INTEGER NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
        position INTEGER NOT NULL,
        exercise_id TEXT NOT NULL,
        name TEXT NOT NULL,
        note TEXT NOT NULL DEFAULT ''
    );
    CREATE TABLE IF NOT EXISTS session_sets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        exercise_row INTEGER NOT NULL REFERENCES session_exercises(id) ON DELETE CASCADE,
        position INTEGER NOT NULL,
        reps INTEGER,
        weight REAL,
        duration_secs INTEGER,
        rest_secs INTEGER NOT NULL,
        completed BOOLEAN NOT NULL,
        note TEXT NOT NULL DEFAULT ''
    );
    CREATE INDEX IF NOT EXISTS idx_sessions_started_at ON sessions(started_at);
    CREATE INDEX IF NOT EXISTS idx_session_exercises_session ON session_exercises(session_id);
    CREATE INDEX IF NOT EXISTS idx_session_sets_exercise ON session_sets(exercise_row);
"#;

/// Fixed-width UTC text, so SQL ordering on the column is chronological
fn format_timestamp(at: &DateTime<Local>) -> String {
    at.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Local>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Local))
        .map_err(|_| {
            rusqlite::Error::InvalidColumnType(idx, raw.to_string(), rusqlite::types::Type::Text)
        })
}

/// SQLite-backed session history
#[derive(Debug)]
pub struct SqliteSessionStore {
    conn: Connection,
}

impl SqliteSessionStore {
    /// Open (or create) the database at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    /// Open the database at the default state location
    pub fn open_default() -> Result<Self, StoreError> {
        let path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("setwise_sessions.db"));
        log::info!("opening session store at {}", path.display());
        Self::new(path)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn recent_sessions(&self, limit: usize) -> Result<Vec<SessionSummary>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                s.id,
                s.template_name,
                s.started_at,
                s.elapsed_secs,
                s.completed,
                COALESCE(SUM(CASE WHEN ss.completed = 1 THEN 1 ELSE 0 END), 0),
                COUNT(ss.id),
                COALESCE(SUM(CASE WHEN ss.completed = 1
                    THEN COALESCE(ss.reps, 0) * COALESCE(ss.weight, 0.0) ELSE 0.0 END), 0.0)
            FROM sessions s
            LEFT JOIN session_exercises se ON se.session_id = s.id
            LEFT JOIN session_sets ss ON ss.exercise_row = se.id
            GROUP BY s.id
            ORDER BY s.started_at DESC, s.id DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let started_at: String = row.get(2)?;
            Ok(SessionSummary {
                id: row.get(0)?,
                template_name: row.get(1)?,
                started_at: parse_timestamp(2, &started_at)?,
                elapsed_secs: row.get::<_, i64>(3)? as u64,
                completed: row.get(4)?,
                completed_sets: row.get(5)?,
                total_sets: row.get(6)?,
                total_volume: row.get(7)?,
            })
        })?;

        let mut summaries = Vec::new();
        for summary in rows {
            summaries.push(summary?);
        }
        Ok(summaries)
    }

    pub fn totals(&self) -> Result<HistoryTotals, StoreError> {
        let summaries = self.recent_sessions(usize::MAX >> 1)?;
        let durations: Vec<f64> = summaries.iter().map(|s| s.elapsed_secs as f64).collect();
        Ok(HistoryTotals {
            total_sessions: summaries.len(),
            total_sets: summaries.iter().map(|s| s.completed_sets).sum(),
            total_volume: summaries.iter().map(|s| s.total_volume).sum(),
            avg_elapsed_secs: mean(&durations).unwrap_or(0.0),
        })
    }

    /// Rebuild a stored record
    pub fn load_record(&self, id: i64) -> Result<WorkoutRecord, StoreError> {
        let header = self
            .conn
            .query_row(
                r#"
                SELECT template_id, template_name, started_at, ended_at, elapsed_secs, notes, completed
                FROM sessions WHERE id = ?1
                "#,
                [id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, bool>(6)?,
                    ))
                },
            )
            .optional()?
            .ok_or(StoreError::NotFound(id))?;

        let (template_id, template_name, started_at, ended_at, elapsed_secs, notes, completed) =
            header;
        let started_at = DateTime::parse_from_rfc3339(&started_at)
            .map_err(|_| StoreError::BadTimestamp(started_at.clone()))?
            .with_timezone(&Local);
        let ended_at = DateTime::parse_from_rfc3339(&ended_at)
            .map_err(|_| StoreError::BadTimestamp(ended_at.clone()))?
            .with_timezone(&Local);

        let mut ex_stmt = self.conn.prepare(
            "SELECT id, exercise_id, name, note FROM session_exercises WHERE session_id = ?1 ORDER BY position",
        )?;
        let mut set_stmt = self.conn.prepare(
            r#"
            SELECT reps, weight, duration_secs, rest_secs, completed, note
            FROM session_sets WHERE exercise_row = ?1 ORDER BY position
            "#,
        )?;

        let exercise_rows = ex_stmt
            .query_map([id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut exercises = Vec::with_capacity(exercise_rows.len());
        for (row_id, exercise_id, name, note) in exercise_rows {
            let sets = set_stmt
                .query_map([row_id], |row| {
                    Ok(RecordedSet {
                        reps: row.get(0)?,
                        weight: row.get(1)?,
                        duration_secs: row.get(2)?,
                        rest_secs: row.get(3)?,
                        completed: row.get(4)?,
                        note: row.get(5)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            exercises.push(RecordedExercise {
                exercise_id,
                name,
                note,
                sets,
            });
        }

        Ok(WorkoutRecord {
            template_id,
            template_name,
            started_at,
            ended_at,
            elapsed_secs: elapsed_secs as u64,
            notes,
            completed,
            exercises,
        })
    }

    /// Completed sets of one exercise across all sessions, newest first
    pub fn exercise_history(
        &self,
        exercise_id: &str,
    ) -> Result<Vec<(DateTime<Local>, RecordedSet)>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT s.started_at, ss.reps, ss.weight, ss.duration_secs, ss.rest_secs, ss.completed, ss.note
            FROM session_sets ss
            JOIN session_exercises se ON ss.exercise_row = se.id
            JOIN sessions s ON se.session_id = s.id
            WHERE se.exercise_id = ?1 AND ss.completed = 1
            ORDER BY s.started_at DESC, ss.position
            "#,
        )?;

        let rows = stmt.query_map([exercise_id], |row| {
            let started_at: String = row.get(0)?;
            Ok((
                parse_timestamp(0, &started_at)?,
                RecordedSet {
                    reps: row.get(1)?,
                    weight: row.get(2)?,
                    duration_secs: row.get(3)?,
                    rest_secs: row.get(4)?,
                    completed: row.get(5)?,
                    note: row.get(6)?,
                },
            ))
        })?;

        let mut history = Vec::new();
        for entry in rows {
            history.push(entry?);
        }
        Ok(history)
    }

    /// Write every recorded set as CSV; returns the number of rows written
    pub fn export_csv<W: io::Write>(&self, writer: W) -> Result<usize, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT s.id, s.started_at, s.template_name, se.name, ss.position,
                   ss.reps, ss.weight, ss.duration_secs, ss.rest_secs, ss.completed, ss.note
            FROM session_sets ss
            JOIN session_exercises se ON ss.exercise_row = se.id
            JOIN sessions s ON se.session_id = s.id
            ORDER BY s.started_at, se.position, ss.position
            "#,
        )?;

        let mut csv_writer = csv::Writer::from_writer(writer);
        let mut count = 0;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let started_at: String = row.get(1)?;
            let template: String = row.get(2)?;
            let exercise: String = row.get(3)?;
            let note: String = row.get(10)?;
            csv_writer.serialize(ExportRow {
                session_id: row.get(0)?,
                started_at: &started_at,
                template: &template,
                exercise: &exercise,
                set_number: row.get::<_, i64>(4)? + 1,
                reps: row.get(5)?,
                weight: row.get(6)?,
                duration_secs: row.get(7)?,
                rest_secs: row.get(8)?,
                completed: row.get(9)?,
                note: &note,
            })?;
            count += 1;
        }
        csv_writer.flush()?;
        Ok(count)
    }

    /// Clear all history (for testing or reset purposes)
    pub fn clear_all(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "DELETE FROM session_sets; DELETE FROM session_exercises; DELETE FROM sessions;",
        )?;
        Ok(())
    }
}

impl SessionStore for SqliteSessionStore {
    fn persist(&mut self, record: &WorkoutRecord) -> Result<i64, StoreError> {
        let tx = self.conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO sessions
            (template_id, template_name, started_at, ended_at, elapsed_secs, notes, completed)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                record.template_id,
                record.template_name,
                format_timestamp(&record.started_at),
                format_timestamp(&record.ended_at),
                record.elapsed_secs as i64,
                record.notes,
                record.completed,
            ],
        )?;
        let session_id = tx.last_insert_rowid();

        for (position, exercise) in record.exercises.iter().enumerate() {
            tx.execute(
                r#"
                INSERT INTO session_exercises (session_id, position, exercise_id, name, note)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    session_id,
                    position as i64,
                    exercise.exercise_id,
                    exercise.name,
                    exercise.note,
                ],
            )?;
            let exercise_row = tx.last_insert_rowid();

            for (set_position, set) in exercise.sets.iter().enumerate() {
                tx.execute(
                    r#"
                    INSERT INTO session_sets
                    (exercise_row, position, reps, weight, duration_secs, rest_secs, completed, note)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    "#,
                    params![
                        exercise_row,
                        set_position as i64,
                        set.reps,
                        set.weight,
                        set.duration_secs,
                        set.rest_secs,
                        set.completed,
                        set.note,
                    ],
                )?;
            }
        }

        tx.commit()?;
        log::info!(
            "persisted session {session_id} ({}, {}/{} sets)",
            record.template_name,
            record.completed_sets(),
            record.total_sets()
        );
        Ok(session_id)
    }
}
