//! Database migrations
//!
//! Versioned schema changes tracked in `schema_migrations`.

use crate::core::error::{Result, StockroomError};
use rusqlite::Connection;
use tracing::{debug, info};

/// Migration version tracking table
const MIGRATION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    applied_at DATETIME DEFAULT CURRENT_TIMESTAMP
)
"#;

/// Initial schema: accounts and inventory items
const MIGRATION_V1: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT UNIQUE NOT NULL CHECK (length(username) > 0),
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL CHECK (length(name) <= 144),
    stock INTEGER NOT NULL,
    price INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// Server-side sessions keyed by the opaque cookie id
const MIGRATION_V2: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    data TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

const MIGRATIONS: &[(i64, &str)] = &[(1, MIGRATION_V1), (2, MIGRATION_V2)];

/// Apply every migration newer than the recorded schema version
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(MIGRATION_TABLE)
        .map_err(StockroomError::DatabaseError)?;

    let current = current_version(conn)?;
    debug!(current_version = current, "Checking schema migrations");

    for (version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
        let tx = conn.transaction().map_err(StockroomError::DatabaseError)?;
        tx.execute_batch(sql).map_err(StockroomError::DatabaseError)?;
        tx.execute("INSERT INTO schema_migrations (version) VALUES (?)", [version])
            .map_err(StockroomError::DatabaseError)?;
        tx.commit().map_err(StockroomError::DatabaseError)?;
        info!(version = version, "Applied schema migration");
    }

    Ok(())
}

/// Highest applied migration version, 0 for a fresh database
pub fn current_version(conn: &Connection) -> Result<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )
    .map_err(StockroomError::DatabaseError)
}
