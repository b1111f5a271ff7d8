use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered user account.
///
/// The `id` is a surrogate key assigned by the storage backend on creation.
/// `username` is the caller-chosen unique handle, immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}
