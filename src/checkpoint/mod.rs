//! Crash-durable record of which listing URLs have been ingested
//!
//! The store is a single SQLite table of visited URLs. Every write commits
//! before returning, so a crawl killed mid-run resumes without re-emitting
//! listings it already delivered. Marking a URL twice is a no-op.

use rusqlite::{params, Connection};
use std::path::Path;
use thiserror::Error;

/// Errors from checkpoint store operations
#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("checkpoint database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type CheckpointResult<T> = Result<T, CheckpointError>;

/// SQLite-backed visited-URL store
pub struct CheckpointStore {
    conn: Connection,
}

impl CheckpointStore {
    /// Opens or creates the checkpoint database at `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(CheckpointStore)` - Successfully opened/created database
    /// * `Err(CheckpointError)` - Failed to open database
    pub fn open(path: &Path) -> CheckpointResult<Self> {
        let conn = Connection::open(path)?;

        // WAL keeps single-row commits cheap without giving up durability
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;

        Self::initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Creates a store backed by an in-memory database, useful in tests.
    pub fn in_memory() -> CheckpointResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn initialize_schema(conn: &Connection) -> CheckpointResult<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS visited (
                url TEXT PRIMARY KEY
            )",
            [],
        )?;
        Ok(())
    }

    /// Returns whether `url` has already been marked.
    pub fn has_seen(&self, url: &str) -> CheckpointResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM visited WHERE url = ?1",
            params![url],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Marks `url` as visited. Idempotent: marking an already-seen URL
    /// succeeds without error and leaves the store unchanged.
    pub fn mark_seen(&self, url: &str) -> CheckpointResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO visited (url) VALUES (?1)",
            params![url],
        )?;
        Ok(())
    }

    /// Number of distinct URLs marked so far.
    pub fn len(&self) -> CheckpointResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM visited", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn is_empty(&self) -> CheckpointResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Forgets every visited URL. Used by fresh crawls that want to
    /// re-ingest the whole site.
    pub fn clear(&self) -> CheckpointResult<()> {
        self.conn.execute("DELETE FROM visited", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mark_and_lookup() {
        let store = CheckpointStore::in_memory().unwrap();

        assert!(!store.has_seen("https://listings.example/p/1").unwrap());
        store.mark_seen("https://listings.example/p/1").unwrap();
        assert!(store.has_seen("https://listings.example/p/1").unwrap());
        assert!(!store.has_seen("https://listings.example/p/2").unwrap());
    }

    #[test]
    fn test_mark_seen_is_idempotent() {
        let store = CheckpointStore::in_memory().unwrap();

        store.mark_seen("https://listings.example/p/1").unwrap();
        store.mark_seen("https://listings.example/p/1").unwrap();
        store.mark_seen("https://listings.example/p/1").unwrap();

        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_clear_forgets_everything() {
        let store = CheckpointStore::in_memory().unwrap();

        store.mark_seen("https://listings.example/p/1").unwrap();
        store.mark_seen("https://listings.example/p/2").unwrap();
        assert_eq!(store.len().unwrap(), 2);

        store.clear().unwrap();
        assert!(store.is_empty().unwrap());
        assert!(!store.has_seen("https://listings.example/p/1").unwrap());
    }

    #[test]
    fn test_marks_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("visited.db");

        {
            let store = CheckpointStore::open(&db_path).unwrap();
            store.mark_seen("https://listings.example/p/9").unwrap();
        }

        let reopened = CheckpointStore::open(&db_path).unwrap();
        assert!(reopened.has_seen("https://listings.example/p/9").unwrap());
        assert_eq!(reopened.len().unwrap(), 1);
    }
}
