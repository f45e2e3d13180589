//! SQLite database store implementation.

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use super::models::*;

mod embedded {
    refinery::embed_migrations!("migrations");
}

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.9f";

/// Database error types.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Database lock poisoned")]
    Poisoned,
}

/// Persistence used by the analyzer. Writes are create-only.
pub trait ReportStore: Send + Sync {
    fn save_report(&self, report: &NewReport) -> Result<i64, DbError>;
    fn save_session(&self, session_id: &str, urls: &[String]) -> Result<(), DbError>;
    fn list_recent_reports(&self, limit: usize) -> Result<Vec<StoredReport>, DbError>;
}

/// Thread-safe database store.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Create a new store with the given database path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Create a store backed by a private in-memory database.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, DbError> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init()?;
        Ok(store)
    }

    /// Initialize the database with migrations.
    fn init(&self) -> Result<(), DbError> {
        let mut conn = self.conn()?;
        embedded::migrations::runner()
            .run(&mut *conn)
            .map_err(|e| DbError::Migration(e.to_string()))?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    // --- Reports ---

    /// Insert a report and return its ID.
    pub fn add_report(&self, report: &NewReport) -> Result<i64, DbError> {
        let api_response = serde_json::to_string(&report.api_response)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO crux_reports (url, form_factor, largest_contentful_paint, first_input_delay,
                cumulative_layout_shift, first_contentful_paint, interaction_to_next_paint,
                time_to_first_byte, overall_performance, api_response, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                report.url,
                report.form_factor,
                report.largest_contentful_paint,
                report.first_input_delay,
                report.cumulative_layout_shift,
                report.first_contentful_paint,
                report.interaction_to_next_paint,
                report.time_to_first_byte,
                report.overall_performance,
                api_response,
                format_db_time(Utc::now()),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Get the most recent reports, newest first.
    pub fn get_recent_reports(&self, limit: usize) -> Result<Vec<StoredReport>, DbError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, url, form_factor, largest_contentful_paint, first_input_delay,
                cumulative_layout_shift, first_contentful_paint, interaction_to_next_paint,
                time_to_first_byte, overall_performance, api_response, created_at
             FROM crux_reports ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], read_report)?;
        let mut reports = Vec::new();
        for row in rows {
            let (mut report, raw_response) = row?;
            report.api_response = serde_json::from_str(&raw_response)?;
            reports.push(report);
        }
        Ok(reports)
    }

    // --- Sessions ---

    /// Record an analysis session.
    pub fn add_session(&self, session_id: &str, urls: &[String]) -> Result<(), DbError> {
        let urls_json = serde_json::to_string(urls)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO analysis_sessions (session_id, urls, created_at) VALUES (?1, ?2, ?3)",
            params![session_id, urls_json, format_db_time(Utc::now())],
        )?;
        Ok(())
    }

    /// Get a session by its identifier.
    pub fn get_session(&self, session_id: &str) -> Result<Option<Session>, DbError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, session_id, urls, created_at FROM analysis_sessions WHERE session_id = ?1",
                params![session_id],
                |row| {
                    let urls: String = row.get(2)?;
                    let time_str: String = row.get(3)?;
                    Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, urls, time_str))
                },
            )
            .optional()?;

        match row {
            Some((id, session_id, urls, time_str)) => Ok(Some(Session {
                id,
                session_id,
                urls: serde_json::from_str(&urls)?,
                created_at: parse_db_time(&time_str).unwrap_or_else(Utc::now),
            })),
            None => Ok(None),
        }
    }
}

impl ReportStore for Store {
    fn save_report(&self, report: &NewReport) -> Result<i64, DbError> {
        self.add_report(report)
    }

    fn save_session(&self, session_id: &str, urls: &[String]) -> Result<(), DbError> {
        self.add_session(session_id, urls)
    }

    fn list_recent_reports(&self, limit: usize) -> Result<Vec<StoredReport>, DbError> {
        self.get_recent_reports(limit)
    }
}

fn read_report(row: &Row<'_>) -> rusqlite::Result<(StoredReport, String)> {
    let time_str: String = row.get(11)?;
    let report = StoredReport {
        id: row.get(0)?,
        url: row.get(1)?,
        form_factor: row.get(2)?,
        largest_contentful_paint: row.get(3)?,
        first_input_delay: row.get(4)?,
        cumulative_layout_shift: row.get(5)?,
        first_contentful_paint: row.get(6)?,
        interaction_to_next_paint: row.get(7)?,
        time_to_first_byte: row.get(8)?,
        overall_performance: row.get(9)?,
        api_response: serde_json::Value::Null,
        created_at: parse_db_time(&time_str).unwrap_or_else(Utc::now),
    };
    Ok((report, row.get(10)?))
}

fn format_db_time(dt: DateTime<Utc>) -> String {
    dt.format(TIME_FORMAT).to_string()
}

/// Parse a datetime string from the database.
fn parse_db_time(s: &str) -> Option<DateTime<Utc>> {
    let formats = [TIME_FORMAT, "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];

    for fmt in &formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(DateTime::from_naive_utc_and_offset(dt, Utc));
        }
    }

    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
