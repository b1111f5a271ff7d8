// Storage backend abstraction
// Provides pluggable persistence for users and sessions.

pub mod memory;
pub mod sqlite;

use crate::config::StorageConfig;
use crate::models::{Session, User};
use async_trait::async_trait;

/// Storage backend trait for persisting users and sessions.
///
/// Read-then-write operations (uniqueness on user insert, referential
/// integrity on session insert) must be atomic per call; backends enforce
/// them with their own constraints, not with check-then-act in the caller.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    // User operations

    /// Insert a new user, assigning its id.
    /// Fails with `StorageError::AlreadyExists` if the username is taken.
    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<User, StorageError>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError>;

    async fn get_user_by_id(&self, user_id: i64) -> Result<Option<User>, StorageError>;

    // Session operations

    /// Insert a new session row.
    /// Fails with `StorageError::ForeignKeyViolation` if `session.user_id`
    /// does not reference an existing user.
    async fn insert_session(&self, session: Session) -> Result<(), StorageError>;

    /// Get a session by token. Expired rows are returned as-is; expiration
    /// is a read-time predicate applied by the caller.
    async fn get_session(&self, token: &str) -> Result<Option<Session>, StorageError>;

    /// Delete a session by token. Returns whether a row was deleted.
    async fn delete_session(&self, token: &str) -> Result<bool, StorageError>;

    /// Delete all sessions for a user. Returns the number deleted.
    async fn delete_user_sessions(&self, user_id: i64) -> Result<usize, StorageError>;

    /// Delete all sessions whose expiry has passed. Returns the number
    /// deleted. Maintenance only; validation never depends on this running.
    async fn delete_expired_sessions(&self) -> Result<usize, StorageError>;
}

/// Storage errors
#[derive(Debug, Clone)]
pub enum StorageError {
    AlreadyExists,
    ForeignKeyViolation,
    ConnectionError(String),
    InvalidData(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::AlreadyExists => write!(f, "Row already exists"),
            StorageError::ForeignKeyViolation => write!(f, "Referenced row does not exist"),
            StorageError::ConnectionError(msg) => write!(f, "Connection error: {}", msg),
            StorageError::InvalidData(msg) => write!(f, "Invalid data: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

/// Factory function to create a storage backend based on configuration
pub fn create_storage_backend(
    config: &StorageConfig,
) -> Result<Box<dyn StorageBackend>, StorageError> {
    match config {
        StorageConfig::Memory => Ok(Box::new(memory::MemoryStorage::new())),
        StorageConfig::Sqlite { path } => Ok(Box::new(sqlite::SqliteStorage::open(path)?)),
    }
}
