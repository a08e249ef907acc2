use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use rusqlite::Connection;
use thiserror::Error;
use tracing::info;

use super::schema;

/// Thread-safe handle wrapping a single SQLite connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

/// Errors raised by the SQLite repositories.
#[derive(Debug, Error)]
pub enum DbError {
    /// Query or connection failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A thread panicked while holding the connection.
    #[error("database lock poisoned")]
    LockPoisoned,
    /// The parent directory of the file could not be created.
    #[error("failed to create database directory")]
    CreateDir(#[source] std::io::Error),
    /// The blocking task was cancelled or panicked.
    #[error("sqlite task join failed")]
    Join(#[from] tokio::task::JoinError),
}

impl Database {
    /// Open (or create) the database file and run the schema bootstrap.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(DbError::CreateDir)?;
        }
        let db = Self::from_connection(Connection::open(path)?)?;
        info!(path = %path.display(), "sqlite database ready");
        Ok(db)
    }

    /// Create an in-memory database, mostly useful for tests.
    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, DbError> {
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.with_conn(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA busy_timeout=5000;
                 PRAGMA foreign_keys=ON;",
            )?;
            schema::create_tables(conn)
        })?;
        Ok(db)
    }

    /// Access the underlying connection with a closure.
    pub fn with_conn<F, R>(&self, f: F) -> Result<R, DbError>
    where
        F: FnOnce(&Connection) -> Result<R, DbError>,
    {
        let conn = self.conn.lock().map_err(|_| DbError::LockPoisoned)?;
        f(&conn)
    }

    /// Access the underlying connection mutably (for transactions).
    pub fn with_conn_mut<F, R>(&self, f: F) -> Result<R, DbError>
    where
        F: FnOnce(&mut Connection) -> Result<R, DbError>,
    {
        let mut conn = self.conn.lock().map_err(|_| DbError::LockPoisoned)?;
        f(&mut conn)
    }

    /// Run repository work on the blocking pool so async callers never hold
    /// the connection mutex on a runtime worker.
    pub async fn call<F, R>(&self, f: F) -> Result<R, DbError>
    where
        F: FnOnce(&Database) -> Result<R, DbError> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || f(&db)).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_in_memory_and_creates_tables() {
        let db = Database::open_in_memory().unwrap();
        let tables: Vec<String> = db
            .with_conn(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                )?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .unwrap();

        for expected in [
            "admin_tokens",
            "broadcast_logs",
            "broadcast_media",
            "broadcasts",
            "settings",
            "tracks",
            "users",
        ] {
            assert!(
                tables.iter().any(|t| t == expected),
                "missing table {expected}"
            );
        }
    }

    #[test]
    fn opens_file_database_in_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("db.sqlite3");
        let db = Database::open(&path).unwrap();
        assert!(path.exists());
        assert!(db.list_tracks().unwrap().is_empty());
    }

    #[tokio::test]
    async fn call_runs_on_blocking_pool() {
        let db = Database::open_in_memory().unwrap();
        let id = db
            .call(|db| db.create_track("Song", "", "uploads/audio/a.mp3"))
            .await
            .unwrap();
        assert!(id > 0);
    }
}
