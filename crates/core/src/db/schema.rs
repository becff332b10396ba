//! Database schema definitions and migration runner.
//!
//! Migrations are simple SQL strings applied in order. The current schema
//! version is tracked in the SQLite `user_version` pragma.

use rusqlite::Connection;
use tracing::{debug, info};

use crate::errors::DatabaseError;

/// All migrations, in order. Each entry is `(version, description, sql)`.
static MIGRATIONS: &[(u32, &str, &str)] = &[(
    1,
    "initial schema",
    r#"
    CREATE TABLE IF NOT EXISTS uploads (
        id                  TEXT PRIMARY KEY,
        filename            TEXT NOT NULL,
        content             TEXT NOT NULL,
        project             TEXT NOT NULL DEFAULT '',
        validation_status   TEXT NOT NULL CHECK (validation_status IN ('valid', 'invalid')),
        validation_error    TEXT,
        created_at          TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_uploads_created_at ON uploads (created_at);

    CREATE TABLE IF NOT EXISTS submissions (
        id                  TEXT PRIMARY KEY,
        upload_id           TEXT NOT NULL REFERENCES uploads (id),
        project             TEXT NOT NULL DEFAULT '',
        subject             TEXT NOT NULL,
        description         TEXT NOT NULL DEFAULT '',
        branch              TEXT NOT NULL,
        status              TEXT NOT NULL DEFAULT 'pending'
                            CHECK (status IN ('pending', 'processing', 'completed', 'failed')),
        change_id           TEXT,
        change_url          TEXT,
        error               TEXT,
        notification_emails TEXT NOT NULL DEFAULT '[]',
        remote_node_id      TEXT,
        git_repository      TEXT,
        created_at          TEXT NOT NULL,
        updated_at          TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_submissions_status ON submissions (status);
    CREATE INDEX IF NOT EXISTS idx_submissions_upload_id ON submissions (upload_id);

    -- Append-only: rows are only ever inserted, never updated or deleted.
    CREATE TABLE IF NOT EXISTS submission_logs (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        submission_id   TEXT NOT NULL REFERENCES submissions (id),
        timestamp       TEXT NOT NULL,
        message         TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_submission_logs_submission
        ON submission_logs (submission_id, id);

    CREATE TABLE IF NOT EXISTS kv_state (
        key         TEXT PRIMARY KEY,
        value       TEXT NOT NULL,
        updated_at  TEXT NOT NULL
    );
    "#,
)];

/// Run all pending migrations against `conn`.
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current_version = get_schema_version(conn)?;
    info!(
        current_version,
        target_version = MIGRATIONS.last().map(|m| m.0).unwrap_or(0),
        "checking database migrations"
    );

    for &(version, description, sql) in MIGRATIONS {
        if version > current_version {
            info!(version, description, "applying migration");
            conn.execute_batch(sql)
                .map_err(|e| DatabaseError::MigrationFailed {
                    version,
                    detail: e.to_string(),
                })?;
            set_schema_version(conn, version)?;
            debug!(version, "migration applied successfully");
        }
    }

    Ok(())
}

/// Read the current schema version from the SQLite `user_version` pragma.
fn get_schema_version(conn: &Connection) -> Result<u32, DatabaseError> {
    let version: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

/// Set the schema version via the SQLite `user_version` pragma.
fn set_schema_version(conn: &Connection, version: u32) -> Result<(), DatabaseError> {
    conn.pragma_update(None, "user_version", version)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_run_idempotently() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), 1);
    }

    #[test]
    fn test_tables_created() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let tables: Vec<String> = {
            let mut stmt = conn
                .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
                .unwrap();
            stmt.query_map([], |row| row.get(0))
                .unwrap()
                .filter_map(|r| r.ok())
                .collect()
        };

        assert!(tables.contains(&"uploads".to_string()));
        assert!(tables.contains(&"submissions".to_string()));
        assert!(tables.contains(&"submission_logs".to_string()));
        assert!(tables.contains(&"kv_state".to_string()));
    }
}
