// Credential hashing abstraction
// The hasher is an injected capability so tests can substitute a
// deterministic stub without paying bcrypt cost.

use bcrypt::DEFAULT_COST;

/// One-way password hashing and verification.
pub trait CredentialHasher: Send + Sync {
    /// Hash a plaintext password into an opaque digest.
    fn hash(&self, password: &str) -> Result<String, String>;

    /// Verify a plaintext password against a stored digest.
    fn verify(&self, password: &str, digest: &str) -> Result<bool, String>;
}

/// bcrypt-backed credential hasher.
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    /// Create a hasher with the default bcrypt cost.
    pub fn new() -> Self {
        Self { cost: DEFAULT_COST }
    }

    /// Create a hasher with an explicit cost. Lower costs are only
    /// appropriate for tests.
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialHasher for BcryptHasher {
    fn hash(&self, password: &str) -> Result<String, String> {
        bcrypt::hash(password, self.cost).map_err(|e| format!("Failed to hash password: {}", e))
    }

    fn verify(&self, password: &str, digest: &str) -> Result<bool, String> {
        bcrypt::verify(password, digest).map_err(|e| format!("Failed to verify password: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimum bcrypt cost, to keep tests fast
    const TEST_COST: u32 = 4;

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let hasher = BcryptHasher::with_cost(TEST_COST);

        let digest = hasher.hash("correct horse").unwrap();
        assert_ne!(digest, "correct horse");

        assert!(hasher.verify("correct horse", &digest).unwrap());
        assert!(!hasher.verify("battery staple", &digest).unwrap());
    }

    #[test]
    fn test_same_password_hashes_differently() {
        let hasher = BcryptHasher::with_cost(TEST_COST);

        let first = hasher.hash("pw1").unwrap();
        let second = hasher.hash("pw1").unwrap();

        // bcrypt salts per call
        assert_ne!(first, second);
        assert!(hasher.verify("pw1", &first).unwrap());
        assert!(hasher.verify("pw1", &second).unwrap());
    }

    #[test]
    fn test_verify_rejects_garbage_digest() {
        let hasher = BcryptHasher::with_cost(TEST_COST);

        assert!(hasher.verify("pw1", "not-a-bcrypt-digest").is_err());
    }
}
