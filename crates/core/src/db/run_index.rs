use std::path::Path;

use rusqlite::{params, Connection};
use thiserror::Error;

use crate::db::RunRecord;

/// Minimum schema version we know how to handle.
///
/// `0` means "no schema yet" (fresh DB).
const MIN_SUPPORTED_SCHEMA_VERSION: i32 = 0;

/// Latest schema version this crate knows about.
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// The index was created by a newer version of this tool.
    #[error(
        "Unsupported schema version {found}; supported range is {min_supported}..={max_supported}"
    )]
    UnsupportedSchemaVersion { found: i32, min_supported: i32, max_supported: i32 },
}

pub type DbResult<T> = Result<T, DbError>;

/// SQLite-backed index of persisted analysis records.
#[derive(Debug)]
pub struct RunIndex {
    conn: Connection,
}

impl RunIndex {
    /// Open (or create) the index at `path` and bring the schema up to date.
    pub fn open(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        apply_migrations(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        apply_migrations(&conn)?;
        Ok(Self { conn })
    }

    pub fn insert_run(&self, record: &RunRecord) -> DbResult<i64> {
        self.conn.execute(
            r#"
            INSERT INTO analysis_runs (component, bundle_path, payload_path, payload_hash,
                class_count, used_by_count, is_swift, load_status, report_path, analyzed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                record.component,
                record.bundle_path,
                record.payload_path,
                record.payload_hash,
                record.class_count,
                record.used_by_count,
                if record.is_swift { 1 } else { 0 },
                record.load_status,
                record.report_path,
                record.analyzed_at
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// List runs oldest first, optionally for a single component.
    pub fn list_runs(&self, component: Option<&str>) -> DbResult<Vec<RunRecord>> {
        fn map_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRecord> {
            Ok(RunRecord {
                component: row.get(0)?,
                bundle_path: row.get(1)?,
                payload_path: row.get(2)?,
                payload_hash: row.get(3)?,
                class_count: row.get(4)?,
                used_by_count: row.get(5)?,
                is_swift: row.get::<_, i64>(6)? != 0,
                load_status: row.get(7)?,
                report_path: row.get(8)?,
                analyzed_at: row.get(9)?,
            })
        }

        let sql = r#"
            SELECT component, bundle_path, payload_path, payload_hash, class_count,
                   used_by_count, is_swift, load_status, report_path, analyzed_at
            FROM analysis_runs
            WHERE ?1 IS NULL OR component = ?1
            ORDER BY id
            "#;
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params![component], map_run)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Most recent run for `component`, if any.
    pub fn latest_run(&self, component: &str) -> DbResult<Option<RunRecord>> {
        Ok(self.list_runs(Some(component))?.pop())
    }
}

fn apply_migrations(conn: &Connection) -> DbResult<()> {
    let mut current_version = current_schema_version(conn)?;

    if current_version > CURRENT_SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            found: current_version,
            min_supported: MIN_SUPPORTED_SCHEMA_VERSION,
            max_supported: CURRENT_SCHEMA_VERSION,
        });
    }

    if current_version == 0 {
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE TABLE IF NOT EXISTS analysis_runs (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                component     TEXT NOT NULL,
                bundle_path   TEXT NOT NULL,
                payload_path  TEXT NOT NULL,
                class_count   INTEGER NOT NULL,
                used_by_count INTEGER NOT NULL,
                is_swift      INTEGER NOT NULL,
                load_status   TEXT NOT NULL,
                report_path   TEXT NOT NULL,
                analyzed_at   TEXT NOT NULL
            );

            PRAGMA user_version = 1;
            COMMIT;
            "#,
        )?;
        current_version = 1;
    }

    if current_version < 2 {
        conn.execute_batch(
            r#"
            BEGIN;
            ALTER TABLE analysis_runs ADD COLUMN payload_hash TEXT;
            CREATE INDEX IF NOT EXISTS idx_analysis_runs_component ON analysis_runs (component);
            PRAGMA user_version = 2;
            COMMIT;
            "#,
        )?;
    }

    Ok(())
}

fn current_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    Ok(version)
}
