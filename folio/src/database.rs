//! SQLite database layer for the report cache
//!
//! Three tables: `reports` (one row per search action), `pages` (ordered
//! artifact references keyed by report and index) and `users` (per-user
//! session fields). Uses r2d2 connection pooling so independent users can read
//! and write concurrently; WAL mode keeps readers from blocking each other.

use chrono::{DateTime, TimeZone, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Parse timestamp string from database to DateTime<Utc>
fn parse_db_timestamp(timestamp_str: &str) -> DateTime<Utc> {
    chrono::NaiveDateTime::parse_from_str(timestamp_str, TIMESTAMP_FORMAT)
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(timestamp_str, "%Y-%m-%d %H:%M:%S"))
        .map(|dt| Utc.from_utc_datetime(&dt))
        .unwrap_or_else(|_| Utc::now())
}

fn format_db_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub id: String,
    pub query: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageRow {
    pub report_id: String,
    pub page_idx: usize,
    pub artifact_ref: String,
    pub tags_json: String,
    pub doc_id: String,
}

/// A page row joined with its report's live page count and query.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLookup {
    pub page: PageRow,
    pub total: usize,
    /// `None` when pages were written for a report id that has no report row.
    pub query: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserRow {
    pub user_id: String,
    pub filters_json: Option<String>,
    pub last_query: Option<String>,
    pub last_report_id: Option<String>,
}

/// Nullable per-user session column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserField {
    Filters,
    LastQuery,
    LastReport,
}

impl UserField {
    fn column(self) -> &'static str {
        match self {
            UserField::Filters => "filters_json",
            UserField::LastQuery => "last_query",
            UserField::LastReport => "last_report_id",
        }
    }
}

/// Thread-safe report database using connection pooling
pub struct ReportDatabase {
    pool: Pool<SqliteConnectionManager>,
}

impl ReportDatabase {
    /// Open or create a database at the given path with connection pooling
    pub fn open<P: AsRef<Path>>(path: P) -> DatabaseResult<Self> {
        if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| {
                conn.execute_batch("
                    PRAGMA journal_mode=WAL;
                    PRAGMA synchronous=NORMAL;
                    PRAGMA busy_timeout=5000;
                    PRAGMA cache_size=-8000;
                ")?;
                Ok(())
            });

        let pool = Pool::builder()
            .max_size(8)
            .build(manager)?;

        let db = Self { pool };
        db.setup_schema()?;
        Ok(db)
    }

    /// Open an in-memory database
    pub fn open_in_memory() -> DatabaseResult<Self> {
        let manager = SqliteConnectionManager::memory();

        // In-memory needs single connection to maintain state
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)?;

        let db = Self { pool };
        db.setup_schema()?;
        Ok(db)
    }

    fn get_conn(&self) -> DatabaseResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    fn setup_schema(&self) -> DatabaseResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(r#"
            CREATE TABLE IF NOT EXISTS reports (
                id TEXT PRIMARY KEY,
                query TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS pages (
                report_id TEXT NOT NULL,
                page_idx INTEGER NOT NULL,
                artifact_ref TEXT NOT NULL,
                tags_json TEXT NOT NULL,
                doc_id TEXT NOT NULL,
                PRIMARY KEY (report_id, page_idx)
            );

            CREATE TABLE IF NOT EXISTS users (
                user_id TEXT PRIMARY KEY,
                filters_json TEXT,
                last_query TEXT,
                last_report_id TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_reports_created ON reports(created_at);
        "#)?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // reports
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a report row; re-creating an existing id replaces its query.
    pub fn insert_report(&self, id: &str, query: &str, created_at: DateTime<Utc>) -> DatabaseResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO reports (id, query, created_at) VALUES (?1, ?2, ?3)
               ON CONFLICT(id) DO UPDATE SET query = excluded.query"#,
            params![id, query, format_db_timestamp(created_at)],
        )?;
        Ok(())
    }

    pub fn fetch_report(&self, id: &str) -> DatabaseResult<Option<ReportRow>> {
        let conn = self.get_conn()?;
        let row = conn
            .query_row(
                "SELECT id, query, created_at FROM reports WHERE id = ?1",
                [id],
                |row| {
                    let created_at: String = row.get(2)?;
                    Ok(ReportRow {
                        id: row.get(0)?,
                        query: row.get(1)?,
                        created_at: parse_db_timestamp(&created_at),
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    pub fn count_reports(&self) -> DatabaseResult<u64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM reports", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Ids of reports created strictly before `cutoff`, oldest first.
    pub fn report_ids_created_before(&self, cutoff: DateTime<Utc>) -> DatabaseResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id FROM reports WHERE created_at < ?1 ORDER BY created_at",
        )?;
        let ids = stmt
            .query_map([format_db_timestamp(cutoff)], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    /// Delete a report and all of its pages. Returns whether a report row existed.
    pub fn delete_report(&self, id: &str) -> DatabaseResult<bool> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        tx.execute("DELETE FROM pages WHERE report_id = ?1", [id])?;
        let removed = tx.execute("DELETE FROM reports WHERE id = ?1", [id])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // pages
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert or replace the page at `(report_id, page_idx)`.
    pub fn upsert_page(&self, page: &PageRow) -> DatabaseResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO pages (report_id, page_idx, artifact_ref, tags_json, doc_id)
               VALUES (?1, ?2, ?3, ?4, ?5)
               ON CONFLICT(report_id, page_idx) DO UPDATE SET
                   artifact_ref = excluded.artifact_ref,
                   tags_json = excluded.tags_json,
                   doc_id = excluded.doc_id"#,
            params![
                page.report_id,
                page.page_idx as i64,
                page.artifact_ref,
                page.tags_json,
                page.doc_id,
            ],
        )?;
        Ok(())
    }

    /// Fetch one page together with the live page count and the report query.
    pub fn fetch_page(&self, report_id: &str, page_idx: usize) -> DatabaseResult<Option<PageLookup>> {
        let conn = self.get_conn()?;
        let lookup = conn
            .query_row(
                r#"SELECT p.artifact_ref, p.tags_json, p.doc_id,
                          (SELECT COUNT(*) FROM pages WHERE report_id = ?1),
                          r.query
                   FROM pages p
                   LEFT JOIN reports r ON r.id = p.report_id
                   WHERE p.report_id = ?1 AND p.page_idx = ?2"#,
                params![report_id, page_idx as i64],
                |row| {
                    let total: i64 = row.get(3)?;
                    Ok(PageLookup {
                        page: PageRow {
                            report_id: report_id.to_string(),
                            page_idx,
                            artifact_ref: row.get(0)?,
                            tags_json: row.get(1)?,
                            doc_id: row.get(2)?,
                        },
                        total: total as usize,
                        query: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(lookup)
    }

    pub fn count_pages(&self, report_id: &str) -> DatabaseResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE report_id = ?1",
            [report_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// All pages of a report ordered by index.
    pub fn fetch_pages(&self, report_id: &str) -> DatabaseResult<Vec<PageRow>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT page_idx, artifact_ref, tags_json, doc_id
               FROM pages WHERE report_id = ?1 ORDER BY page_idx"#,
        )?;
        let pages = stmt
            .query_map([report_id], |row| {
                let idx: i64 = row.get(0)?;
                Ok(PageRow {
                    report_id: report_id.to_string(),
                    page_idx: idx as usize,
                    artifact_ref: row.get(1)?,
                    tags_json: row.get(2)?,
                    doc_id: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pages)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // users
    // ─────────────────────────────────────────────────────────────────────────

    /// Upsert a single session column; `None` stores NULL (unset).
    pub fn set_user_field(&self, user_id: &str, field: UserField, value: Option<&str>) -> DatabaseResult<()> {
        let conn = self.get_conn()?;
        let column = field.column();
        conn.execute(
            &format!(
                "INSERT INTO users (user_id, {col}) VALUES (?1, ?2)
                 ON CONFLICT(user_id) DO UPDATE SET {col} = excluded.{col}",
                col = column
            ),
            params![user_id, value],
        )?;
        Ok(())
    }

    pub fn fetch_user(&self, user_id: &str) -> DatabaseResult<Option<UserRow>> {
        let conn = self.get_conn()?;
        let row = conn
            .query_row(
                "SELECT user_id, filters_json, last_query, last_report_id FROM users WHERE user_id = ?1",
                [user_id],
                |row| {
                    Ok(UserRow {
                        user_id: row.get(0)?,
                        filters_json: row.get(1)?,
                        last_query: row.get(2)?,
                        last_report_id: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}
