/// Refresh token fingerprints
///
/// Refresh tokens are never stored. The server keeps a deterministic
/// fingerprint, `hex(SHA-256(token || secret))`, and looks records up by it.
///
/// The salt is the static refresh signing secret rather than a per-record
/// random salt. Lookups by fingerprint depend on this, so changing it
/// invalidates every stored record.

use sha2::{Digest, Sha256};

/// Length of a fingerprint in hex characters
pub const TOKEN_HASH_LENGTH: usize = 64;

/// Computes the stored fingerprint of a raw refresh token
///
/// # Example
///
/// ```
/// use projecthub_shared::auth::refresh::hash_refresh_token;
///
/// let a = hash_refresh_token("token", "secret");
/// assert_eq!(a, hash_refresh_token("token", "secret"));
/// assert_ne!(a, hash_refresh_token("token", "other-secret"));
/// assert_eq!(a.len(), 64);
/// ```
pub fn hash_refresh_token(raw_token: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_token.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_concatenation_digest() {
        let mut hasher = Sha256::new();
        hasher.update(b"abcsalt");
        let expected = hex::encode(hasher.finalize());

        assert_eq!(hash_refresh_token("abc", "salt"), expected);
    }

    #[test]
    fn test_hash_shape() {
        let hash = hash_refresh_token("eyJhbGciOiJIUzI1NiJ9.e30.sig", "secret");
        assert_eq!(hash.len(), TOKEN_HASH_LENGTH);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_distinct_tokens_distinct_hashes() {
        assert_ne!(
            hash_refresh_token("token-1", "secret"),
            hash_refresh_token("token-2", "secret")
        );
    }
}
