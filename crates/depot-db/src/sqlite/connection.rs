use std::{fs, path::Path};

use diesel::{sql_query, Connection, RunQueryDsl, SqliteConnection};
use tracing::debug;

use crate::error::{DbError, Result};

/// An open SQLite connection.
pub struct DbConnection {
    conn: SqliteConnection,
}

impl DbConnection {
    /// Opens (creating if needed) the database file at `path`.
    ///
    /// Migrations are not applied; see
    /// [`apply_migrations`](super::migration::apply_migrations).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut conn = SqliteConnection::establish(&path.to_string_lossy())?;

        // WAL mode for concurrent readers across scopes
        sql_query("PRAGMA journal_mode = WAL;")
            .execute(&mut conn)
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        sql_query("PRAGMA busy_timeout = 5000;")
            .execute(&mut conn)
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;

        debug!(path = %path.display(), "opened sqlite database");
        Ok(Self { conn })
    }

    /// A private in-memory database, mainly for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = SqliteConnection::establish(":memory:")?;
        Ok(Self { conn })
    }

    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }
}
