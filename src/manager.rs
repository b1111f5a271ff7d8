// Session manager for user accounts and bearer-token sessions
// Orchestrates the credential hasher and the storage backend; every public
// operation is one or a few storage round trips, no background work.

use crate::config::ManagerConfig;
use crate::hasher::{BcryptHasher, CredentialHasher};
use crate::models::{Session, User};
use crate::storage::{create_storage_backend, StorageBackend, StorageError};
use chrono::{Duration, Utc};
use rand::RngCore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Token byte length before hex encoding (32 bytes = 64 hex chars).
const TOKEN_BYTES: usize = 32;

/// Errors surfaced by session manager operations.
///
/// Lookups that simply find nothing are not errors; those return `Ok(None)`.
#[derive(Debug)]
pub enum SessionError {
    /// The username is already taken (caller-correctable conflict)
    DuplicateUser(String),
    /// A session was requested for a user id that does not exist
    UserNotFound(i64),
    /// A live session references a user row that no longer exists;
    /// indicates a storage-integrity violation, not a revocation
    Integrity(String),
    /// The credential hasher failed
    Hash(String),
    /// The configuration was rejected
    Config(String),
    /// The storage layer failed; propagated untranslated
    Storage(StorageError),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::DuplicateUser(username) => {
                write!(f, "User '{}' already exists", username)
            }
            SessionError::UserNotFound(id) => write!(f, "User with id {} not found", id),
            SessionError::Integrity(msg) => write!(f, "Storage integrity violation: {}", msg),
            SessionError::Hash(msg) => write!(f, "Credential hashing failed: {}", msg),
            SessionError::Config(msg) => write!(f, "Invalid configuration: {}", msg),
            SessionError::Storage(e) => write!(f, "Storage error: {}", e),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<StorageError> for SessionError {
    fn from(e: StorageError) -> Self {
        SessionError::Storage(e)
    }
}

/// Manages user accounts and bearer-token sessions on top of a storage
/// backend. Stateless per call; safe to share behind an `Arc` and invoke
/// concurrently, with atomicity supplied by the backend.
pub struct SessionManager {
    storage: Arc<dyn StorageBackend>,
    hasher: Arc<dyn CredentialHasher>,
    session_duration: Duration,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("session_duration", &self.session_duration)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Create a manager over explicit collaborators. The hasher is injected
    /// so tests can substitute a deterministic stub.
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        hasher: Arc<dyn CredentialHasher>,
        config: &ManagerConfig,
    ) -> Self {
        Self {
            storage,
            hasher,
            session_duration: Duration::days(config.session_duration_days),
        }
    }

    /// Create a manager from configuration: validates it, opens the
    /// configured storage backend and uses bcrypt for credentials.
    pub fn from_config(config: ManagerConfig) -> Result<Self, SessionError> {
        config.validate().map_err(SessionError::Config)?;
        let storage: Arc<dyn StorageBackend> = Arc::from(create_storage_backend(&config.storage)?);
        Ok(Self::new(storage, Arc::new(BcryptHasher::new()), &config))
    }

    // ── User Management ─────────────────────────────────────────────

    /// Create a new user with a hashed password.
    ///
    /// Fails with `SessionError::DuplicateUser` if the username is taken;
    /// uniqueness is enforced by the storage backend, not checked here.
    pub async fn create_user(&self, username: &str, password: &str) -> Result<User, SessionError> {
        let password_hash = self.hasher.hash(password).map_err(SessionError::Hash)?;

        match self.storage.insert_user(username, &password_hash).await {
            Ok(user) => {
                info!("Created user '{}' (id {})", user.username, user.id);
                Ok(user)
            }
            Err(StorageError::AlreadyExists) => {
                Err(SessionError::DuplicateUser(username.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get a user by username. Absent is a normal result, not an error.
    pub async fn get_user(&self, username: &str) -> Result<Option<User>, SessionError> {
        Ok(self.storage.get_user_by_username(username).await?)
    }

    /// Authenticate a user with username and password.
    ///
    /// Returns `None` for an unknown username and for a wrong password
    /// alike, so callers cannot distinguish the two. No session is created.
    pub async fn authenticate_user(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, SessionError> {
        let Some(user) = self.storage.get_user_by_username(username).await? else {
            return Ok(None);
        };

        if self
            .hasher
            .verify(password, &user.password_hash)
            .map_err(SessionError::Hash)?
        {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    // ── Session Management ──────────────────────────────────────────

    /// Create a new session token for a user.
    ///
    /// Fails with `SessionError::UserNotFound` if `user_id` does not
    /// reference an existing user. The returned string is the only time the
    /// token is handed out.
    pub async fn create_session(&self, user_id: i64) -> Result<String, SessionError> {
        let token = generate_token();
        let session = Session::new(user_id, token.clone(), self.session_duration);

        match self.storage.insert_session(session).await {
            Ok(()) => {
                info!("Created session for user {}", user_id);
                Ok(token)
            }
            Err(StorageError::ForeignKeyViolation) => Err(SessionError::UserNotFound(user_id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Validate a session token and return the owning user.
    ///
    /// Unknown and expired tokens both yield `None`; expiration is checked
    /// at read time and nothing is mutated. A live session whose user row
    /// is gone is reported as an integrity error, not as "not logged in".
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, SessionError> {
        let Some(session) = self.storage.get_session(token).await? else {
            return Ok(None);
        };

        if session.is_expired(Utc::now()) {
            debug!("Rejected expired session for user {}", session.user_id);
            return Ok(None);
        }

        match self.storage.get_user_by_id(session.user_id).await? {
            Some(user) => Ok(Some(user)),
            None => {
                warn!(
                    "Unexpired session references missing user {}",
                    session.user_id
                );
                Err(SessionError::Integrity(format!(
                    "session references missing user {}",
                    session.user_id
                )))
            }
        }
    }

    /// Revoke a specific session token.
    ///
    /// Returns whether a session was actually removed; revoking an unknown
    /// or already-revoked token returns `false`, never an error.
    pub async fn revoke_session(&self, token: &str) -> Result<bool, SessionError> {
        let revoked = self.storage.delete_session(token).await?;
        if revoked {
            info!("Revoked session");
        }
        Ok(revoked)
    }

    /// Revoke all sessions for a user. Returns the number revoked; 0 if the
    /// user has no sessions or does not exist.
    pub async fn revoke_sessions(&self, user_id: i64) -> Result<usize, SessionError> {
        let count = self.storage.delete_user_sessions(user_id).await?;
        info!("Revoked {} session(s) for user {}", count, user_id);
        Ok(count)
    }

    /// Delete expired session rows to reclaim storage. Purely maintenance:
    /// validation filters expired sessions regardless of this sweep.
    pub async fn purge_expired_sessions(&self) -> Result<usize, SessionError> {
        let count = self.storage.delete_expired_sessions().await?;
        if count > 0 {
            debug!("Purged {} expired session(s)", count);
        }
        Ok(count)
    }

    // ── Convenience Operations ──────────────────────────────────────

    /// Authenticate and create a session in one step.
    ///
    /// Returns `None` on authentication failure without creating anything.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<String>, SessionError> {
        match self.authenticate_user(username, password).await? {
            Some(user) => Ok(Some(self.create_session(user.id).await?)),
            None => Ok(None),
        }
    }

    /// Logout by revoking the session token.
    pub async fn logout(&self, token: &str) -> Result<bool, SessionError> {
        self.revoke_session(token).await
    }
}

/// Generate a fresh session token: 32 random bytes from the thread-local
/// CSPRNG, hex encoded.
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
