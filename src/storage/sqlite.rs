// SQLite storage backend implementation
// Embedded file-backed store; this is the default backend. Uniqueness and
// referential integrity are enforced by SQLite constraints so that
// concurrent callers cannot race a check-then-act in application code.

use super::{StorageBackend, StorageError};
use crate::models::{Session, User};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Mutex, MutexGuard};
use tracing::info;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS sessions (
        token TEXT PRIMARY KEY,
        user_id INTEGER NOT NULL REFERENCES users(id),
        created_at TEXT NOT NULL,
        expires_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open (or create) the database at the given path and apply the schema.
    /// `:memory:` gives an ephemeral store.
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path)
            .map_err(|e| StorageError::ConnectionError(e.to_string()))?;

        // WAL mode for concurrent reads + crash safety
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )
        .map_err(map_sqlite_err)?;

        conn.execute_batch(SCHEMA).map_err(map_sqlite_err)?;

        info!("Opened sqlite session store at '{}'", path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|e| StorageError::ConnectionError(format!("Lock poisoned: {}", e)))
    }
}

/// Map rusqlite failures onto the storage error taxonomy. Constraint
/// violations are distinguished via SQLite extended result codes.
fn map_sqlite_err(e: rusqlite::Error) -> StorageError {
    match e {
        rusqlite::Error::SqliteFailure(err, msg) => match err.extended_code {
            rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
            | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => StorageError::AlreadyExists,
            rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => StorageError::ForeignKeyViolation,
            _ => StorageError::ConnectionError(msg.unwrap_or_else(|| err.to_string())),
        },
        rusqlite::Error::FromSqlConversionFailure(_, _, e) => {
            StorageError::InvalidData(e.to_string())
        }
        other => StorageError::ConnectionError(other.to_string()),
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        token: row.get(0)?,
        user_id: row.get(1)?,
        created_at: row.get(2)?,
        expires_at: row.get(3)?,
    })
}

#[async_trait]
impl StorageBackend for SqliteStorage {
    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<User, StorageError> {
        let conn = self.conn()?;
        let created_at = Utc::now();

        conn.execute(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?1, ?2, ?3)",
            params![username, password_hash, created_at],
        )
        .map_err(map_sqlite_err)?;

        Ok(User {
            id: conn.last_insert_rowid(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at,
        })
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = ?1",
            params![username],
            row_to_user,
        )
        .optional()
        .map_err(map_sqlite_err)
    }

    async fn get_user_by_id(&self, user_id: i64) -> Result<Option<User>, StorageError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, username, password_hash, created_at FROM users WHERE id = ?1",
            params![user_id],
            row_to_user,
        )
        .optional()
        .map_err(map_sqlite_err)
    }

    async fn insert_session(&self, session: Session) -> Result<(), StorageError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sessions (token, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                session.token,
                session.user_id,
                session.created_at,
                session.expires_at
            ],
        )
        .map_err(map_sqlite_err)?;
        Ok(())
    }

    async fn get_session(&self, token: &str) -> Result<Option<Session>, StorageError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT token, user_id, created_at, expires_at FROM sessions WHERE token = ?1",
            params![token],
            row_to_session,
        )
        .optional()
        .map_err(map_sqlite_err)
    }

    async fn delete_session(&self, token: &str) -> Result<bool, StorageError> {
        let conn = self.conn()?;
        let deleted = conn
            .execute("DELETE FROM sessions WHERE token = ?1", params![token])
            .map_err(map_sqlite_err)?;
        Ok(deleted > 0)
    }

    async fn delete_user_sessions(&self, user_id: i64) -> Result<usize, StorageError> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM sessions WHERE user_id = ?1", params![user_id])
            .map_err(map_sqlite_err)
    }

    async fn delete_expired_sessions(&self) -> Result<usize, StorageError> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            params![Utc::now()],
        )
        .map_err(map_sqlite_err)
    }
}
