// In-memory storage backend implementation
// A single RwLock over the whole state keeps check-then-insert atomic.

use super::{StorageBackend, StorageError};
use crate::models::{Session, User};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct MemoryState {
    next_user_id: i64,
    users: HashMap<i64, User>,
    username_index: HashMap<String, i64>,
    sessions: HashMap<String, Session>,
}

/// In-memory storage backend, for tests and ephemeral deployments.
pub struct MemoryStorage {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStorage {
    /// Create a new empty in-memory storage backend
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState::default())),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<User, StorageError> {
        let mut state = self.state.write().await;

        if state.username_index.contains_key(username) {
            return Err(StorageError::AlreadyExists);
        }

        state.next_user_id += 1;
        let user = User {
            id: state.next_user_id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };

        state.username_index.insert(username.to_string(), user.id);
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        let state = self.state.read().await;
        let user = state
            .username_index
            .get(username)
            .and_then(|id| state.users.get(id))
            .cloned();
        Ok(user)
    }

    async fn get_user_by_id(&self, user_id: i64) -> Result<Option<User>, StorageError> {
        let state = self.state.read().await;
        Ok(state.users.get(&user_id).cloned())
    }

    async fn insert_session(&self, session: Session) -> Result<(), StorageError> {
        let mut state = self.state.write().await;

        if !state.users.contains_key(&session.user_id) {
            return Err(StorageError::ForeignKeyViolation);
        }
        if state.sessions.contains_key(&session.token) {
            return Err(StorageError::AlreadyExists);
        }

        state.sessions.insert(session.token.clone(), session);
        Ok(())
    }

    async fn get_session(&self, token: &str) -> Result<Option<Session>, StorageError> {
        let state = self.state.read().await;
        Ok(state.sessions.get(token).cloned())
    }

    async fn delete_session(&self, token: &str) -> Result<bool, StorageError> {
        let mut state = self.state.write().await;
        Ok(state.sessions.remove(token).is_some())
    }

    async fn delete_user_sessions(&self, user_id: i64) -> Result<usize, StorageError> {
        let mut state = self.state.write().await;

        let before = state.sessions.len();
        state.sessions.retain(|_, s| s.user_id != user_id);
        Ok(before - state.sessions.len())
    }

    async fn delete_expired_sessions(&self) -> Result<usize, StorageError> {
        let mut state = self.state.write().await;

        let now = Utc::now();
        let before = state.sessions.len();
        state.sessions.retain(|_, s| !s.is_expired(now));
        Ok(before - state.sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_insert_and_get_user() {
        let storage = MemoryStorage::new();

        let user = storage.insert_user("alice", "hash1").await.unwrap();
        assert_eq!(user.username, "alice");

        let by_name = storage.get_user_by_username("alice").await.unwrap();
        assert_eq!(by_name.unwrap().id, user.id);

        let by_id = storage.get_user_by_id(user.id).await.unwrap();
        assert_eq!(by_id.unwrap().username, "alice");

        let missing = storage.get_user_by_username("bob").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let storage = MemoryStorage::new();

        storage.insert_user("alice", "hash1").await.unwrap();
        let err = storage.insert_user("alice", "hash2").await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists));
    }

    #[tokio::test]
    async fn test_user_ids_are_distinct() {
        let storage = MemoryStorage::new();

        let alice = storage.insert_user("alice", "h").await.unwrap();
        let bob = storage.insert_user("bob", "h").await.unwrap();
        assert_ne!(alice.id, bob.id);
    }

    #[tokio::test]
    async fn test_session_requires_existing_user() {
        let storage = MemoryStorage::new();

        let session = Session::new(9999, "tok".to_string(), Duration::days(1));
        let err = storage.insert_session(session).await.unwrap_err();
        assert!(matches!(err, StorageError::ForeignKeyViolation));
    }

    #[tokio::test]
    async fn test_session_roundtrip_and_delete() {
        let storage = MemoryStorage::new();
        let user = storage.insert_user("alice", "h").await.unwrap();

        let session = Session::new(user.id, "tok".to_string(), Duration::days(1));
        storage.insert_session(session).await.unwrap();

        let fetched = storage.get_session("tok").await.unwrap();
        assert_eq!(fetched.unwrap().user_id, user.id);

        assert!(storage.delete_session("tok").await.unwrap());
        assert!(!storage.delete_session("tok").await.unwrap());
        assert!(storage.get_session("tok").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_user_sessions_counts() {
        let storage = MemoryStorage::new();
        let alice = storage.insert_user("alice", "h").await.unwrap();
        let bob = storage.insert_user("bob", "h").await.unwrap();

        for i in 0..3 {
            let session = Session::new(alice.id, format!("a{}", i), Duration::days(1));
            storage.insert_session(session).await.unwrap();
        }
        let session = Session::new(bob.id, "b0".to_string(), Duration::days(1));
        storage.insert_session(session).await.unwrap();

        assert_eq!(storage.delete_user_sessions(alice.id).await.unwrap(), 3);
        assert_eq!(storage.delete_user_sessions(alice.id).await.unwrap(), 0);

        // Bob's session is untouched
        assert!(storage.get_session("b0").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_expired_sessions() {
        let storage = MemoryStorage::new();
        let user = storage.insert_user("alice", "h").await.unwrap();

        let live = Session::new(user.id, "live".to_string(), Duration::days(1));
        let dead = Session::new(user.id, "dead".to_string(), Duration::days(0));
        storage.insert_session(live).await.unwrap();
        storage.insert_session(dead).await.unwrap();

        assert_eq!(storage.delete_expired_sessions().await.unwrap(), 1);
        assert!(storage.get_session("live").await.unwrap().is_some());
        assert!(storage.get_session("dead").await.unwrap().is_none());
    }
}
