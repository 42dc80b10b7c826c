//! The `SentStore` implementation over rusqlite.

use async_trait::async_trait;
use rusqlite::Connection;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use trackwire_core::error::{Result, TrackWireError};
use trackwire_core::traits::SentStore;

/// Persisted set of delivered notification ids.
pub struct SqliteSentStore {
    conn: Mutex<Connection>,
}

impl SqliteSentStore {
    /// Open (or create) the store at the given path.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)
            .map_err(|e| TrackWireError::Storage(e.to_string()))?;
        Self::with_connection(conn)
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| TrackWireError::Storage(e.to_string()))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sent_notifications (
                notification_id TEXT PRIMARY KEY,
                sent_at TEXT NOT NULL
            );",
        )
        .map_err(|e| TrackWireError::Storage(e.to_string()))?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| TrackWireError::Storage(e.to_string()))
    }
}

#[async_trait]
impl SentStore for SqliteSentStore {
    async fn all_sent_ids(&self) -> Result<HashSet<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT notification_id FROM sent_notifications")
            .map_err(|e| TrackWireError::Storage(e.to_string()))?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| TrackWireError::Storage(e.to_string()))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(ids)
    }

    async fn mark_sent(&self, ids: &HashSet<String>) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let now = chrono::Utc::now().to_rfc3339();
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| TrackWireError::Storage(e.to_string()))?;
        for id in ids {
            // OR IGNORE keeps the operation idempotent for already-present ids.
            tx.execute(
                "INSERT OR IGNORE INTO sent_notifications (notification_id, sent_at) VALUES (?1, ?2)",
                rusqlite::params![id, now],
            )
            .map_err(|e| TrackWireError::Storage(e.to_string()))?;
        }
        tx.commit()
            .map_err(|e| TrackWireError::Storage(e.to_string()))?;
        tracing::debug!("💾 Marked {} notification(s) as sent", ids.len());
        Ok(())
    }

    async fn sent_count(&self) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM sent_notifications", [], |r| r.get(0))
            .map_err(|e| TrackWireError::Storage(e.to_string()))?;
        Ok(count as u64)
    }
}
