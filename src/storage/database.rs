//! Connection handling for the stock database

use crate::repository::{RepoError, RepoResult};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Handle over the backing SQLite database.
///
/// Thread-safe via an internal mutex on the connection; each repository
/// operation takes the lock for the duration of its statement(s). There is
/// no other shared mutable in-process state; the database is the sole
/// shared resource.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database file at the given path
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).map_err(|e| RepoError::Bootstrap {
            step: "open".to_string(),
            source: e,
        })?;
        Self::configure(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory database (useful for testing)
    pub fn open_in_memory() -> RepoResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| RepoError::Bootstrap {
            step: "open".to_string(),
            source: e,
        })?;
        Self::configure(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn configure(conn: &Connection) -> RepoResult<()> {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;",
        )
        .map_err(|e| RepoError::Bootstrap {
            step: "pragma".to_string(),
            source: e,
        })
    }

    /// Lock the connection for a sequence of statements.
    ///
    /// The mutex is not poisoned in practice: statement errors are returned,
    /// not panicked. A poisoned lock would indicate a bug elsewhere.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("stock database mutex poisoned")
    }
}
