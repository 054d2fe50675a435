//! Session persistence backends

use crate::core::error::{Result, StockroomError};
use crate::db::manager::DatabaseManager;
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::OptionalExtension;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Values held for one client
pub type SessionData = HashMap<String, String>;

/// Seconds a record lives without being written to
pub const DEFAULT_SESSION_TTL_SECS: i64 = 3600;

/// Storage for session records keyed by the opaque session id
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the values stored under `id`, if any
    async fn load(&self, id: &str) -> Result<Option<SessionData>>;

    /// Create or overwrite the record for `id`
    async fn store(&self, id: &str, data: &SessionData) -> Result<()>;

    /// Drop the record for `id`
    async fn remove(&self, id: &str) -> Result<()>;
}

/// In-process store, lost on restart
#[derive(Debug, Clone)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, (SessionData, DateTime<Utc>)>>>,
    ttl: Duration,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::with_ttl(Duration::seconds(DEFAULT_SESSION_TTL_SECS))
    }

    /// Records not written to within `ttl` are treated as absent
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Number of records held, stale ones included until the next prune
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &str) -> Result<Option<SessionData>> {
        let cutoff = Utc::now() - self.ttl;
        Ok(self
            .sessions
            .read()
            .await
            .get(id)
            .filter(|(_, updated_at)| *updated_at >= cutoff)
            .map(|(data, _)| data.clone()))
    }

    async fn store(&self, id: &str, data: &SessionData) -> Result<()> {
        let now = Utc::now();
        let cutoff = now - self.ttl;

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, (_, updated_at)| *updated_at >= cutoff);
        sessions.insert(id.to_string(), (data.clone(), now));
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<()> {
        self.sessions.write().await.remove(id);
        Ok(())
    }
}

/// SQLite-backed store using the `sessions` table
pub struct SqliteSessionStore {
    db: Arc<DatabaseManager>,
    ttl: Duration,
}

impl SqliteSessionStore {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self::with_ttl(db, Duration::seconds(DEFAULT_SESSION_TTL_SECS))
    }

    /// Rows not written to within `ttl` are treated as absent
    pub fn with_ttl(db: Arc<DatabaseManager>, ttl: Duration) -> Self {
        Self { db, ttl }
    }

    /// Oldest `updated_at` still considered live
    fn cutoff(&self) -> String {
        timestamp(Utc::now() - self.ttl)
    }
}

/// Fixed-width UTC timestamps compare correctly as text
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn load(&self, id: &str) -> Result<Option<SessionData>> {
        let id = id.to_string();
        let cutoff = self.cutoff();
        let raw: Option<String> = self
            .db
            .execute(move |conn| {
                conn.query_row(
                    "SELECT data FROM sessions WHERE id = ?1 AND updated_at >= ?2",
                    [&id, &cutoff],
                    |row| row.get(0),
                )
                .optional()
                .map_err(StockroomError::DatabaseError)
            })
            .await?;

        raw.map(|data| {
            serde_json::from_str(&data)
                .map_err(|e| StockroomError::SerializationError(format!("Corrupt session data: {}", e)))
        })
        .transpose()
    }

    async fn store(&self, id: &str, data: &SessionData) -> Result<()> {
        let id = id.to_string();
        let data = serde_json::to_string(data)
            .map_err(|e| StockroomError::SerializationError(e.to_string()))?;
        let now = timestamp(Utc::now());
        let cutoff = self.cutoff();

        self.db
            .transaction(move |tx| {
                let pruned = tx
                    .execute("DELETE FROM sessions WHERE updated_at < ?", [&cutoff])
                    .map_err(StockroomError::DatabaseError)?;
                if pruned > 0 {
                    tracing::debug!(pruned, "Pruned stale sessions");
                }

                tx.execute(
                    "INSERT INTO sessions (id, data, updated_at) VALUES (?1, ?2, ?3) \
                     ON CONFLICT(id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
                    rusqlite::params![&id, &data, &now],
                )
                .map_err(StockroomError::DatabaseError)?;
                Ok(())
            })
            .await
    }

    async fn remove(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.db
            .execute(move |conn| {
                conn.execute("DELETE FROM sessions WHERE id = ?", [&id])
                    .map_err(StockroomError::DatabaseError)?;
                Ok(())
            })
            .await
    }
}
