use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A bearer-token session for a user.
///
/// The token is the sole external handle: possession of the token string is
/// the credential. `expires_at` is fixed at issuance and never extended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque high-entropy token, primary key in storage
    pub token: String,
    /// Owning user (back-reference only; revoking or expiring a session
    /// never affects the user row)
    pub user_id: i64,
    /// When the session was issued
    pub created_at: DateTime<Utc>,
    /// When the session stops being valid (`created_at + duration`)
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session expiring `duration` after now.
    pub fn new(user_id: i64, token: String, duration: Duration) -> Self {
        let now = Utc::now();
        Self {
            token,
            user_id,
            created_at: now,
            expires_at: now + duration,
        }
    }

    /// Check whether the session has expired as of `now`.
    ///
    /// A session is valid iff `now < expires_at`, so a zero-length duration
    /// produces a session that is already expired when first observed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_expiry_computed_from_duration() {
        let session = Session::new(42, "tok".to_string(), Duration::days(30));

        assert_eq!(session.user_id, 42);
        assert_eq!(session.expires_at - session.created_at, Duration::days(30));
        assert!(!session.is_expired(Utc::now()));
    }

    #[test]
    fn test_session_expired_in_the_past() {
        let session = Session::new(1, "tok".to_string(), Duration::days(1));

        assert!(session.is_expired(session.expires_at));
        assert!(session.is_expired(session.expires_at + Duration::seconds(1)));
        assert!(!session.is_expired(session.expires_at - Duration::seconds(1)));
    }

    #[test]
    fn test_zero_duration_session_is_born_expired() {
        let session = Session::new(1, "tok".to_string(), Duration::days(0));

        assert!(session.is_expired(Utc::now()));
    }
}
