/// JWT token codec
///
/// This module signs and verifies the bearer tokens handed to clients. Access
/// and refresh tokens are two independently keyed classes: each class has its
/// own HS256 secret, so a leaked access secret cannot mint refresh tokens and a
/// token of one class never verifies as the other.
///
/// # Security
///
/// - **Algorithm**: HS256 (HMAC with SHA-256)
/// - **Validation**: Signature, expiration, not-before, issuer and token class
/// - **Uniqueness**: Every token carries a random `jti`, so two tokens issued
///   for the same user in the same second still differ
///
/// # Example
///
/// ```
/// use projecthub_shared::auth::jwt::{Claims, JwtCodec, TokenClass, TokenCodec};
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let codec = JwtCodec::new("access-secret-at-least-32-bytes-long", "refresh-secret-at-least-32-bytes-long")?;
///
/// let user_id = Uuid::new_v4();
/// let claims = Claims::with_expiration(user_id, "a@x.com", TokenClass::Access, Duration::minutes(15))?;
/// let token = codec.sign(&claims)?;
///
/// let verified = codec.verify(TokenClass::Access, &token)?;
/// assert_eq!(verified.sub, user_id);
/// assert!(codec.verify(TokenClass::Refresh, &token).is_err());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer claim stamped on every token
pub const ISSUER: &str = "projecthub";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Signing secret for a token class is not configured
    #[error("Signing secret for {0} tokens is missing")]
    MissingSecret(TokenClass),

    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token is of the other class
    #[error("Expected {expected} token, got {actual} token")]
    WrongClass {
        expected: TokenClass,
        actual: TokenClass,
    },
}

/// Token class identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenClass {
    /// Access token (short-lived, stateless)
    Access,

    /// Refresh token (long-lived, tracked server-side by hash)
    Refresh,
}

impl TokenClass {
    /// Gets default lifetime expression for the class
    pub fn default_expiry(&self) -> &'static str {
        match self {
            TokenClass::Access => "15m",
            TokenClass::Refresh => "30d",
        }
    }

    /// Gets token class as string
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenClass::Access => "access",
            TokenClass::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for TokenClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT claims structure
///
/// # Standard Claims
///
/// - `sub`: Subject (user ID)
/// - `iss`: Issuer (always "projecthub")
/// - `iat`: Issued at timestamp
/// - `exp`: Expiration timestamp
/// - `nbf`: Not before timestamp
/// - `jti`: Unique token ID
///
/// # Custom Claims
///
/// - `email`: User email at issuance
/// - `token_type`: Access or refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - User ID
    pub sub: Uuid,

    /// Email of the subject
    pub email: String,

    /// Issuer - Always "projecthub"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Unique token ID
    pub jti: Uuid,

    /// Token class (custom claim)
    pub token_type: TokenClass,
}

impl Claims {
    /// Creates claims expiring `expires_in` from now
    pub fn with_expiration(
        user_id: Uuid,
        email: impl Into<String>,
        token_type: TokenClass,
        expires_in: Duration,
    ) -> Result<Self, JwtError> {
        Self::issued_at(user_id, email, token_type, Utc::now(), expires_in)
    }

    /// Creates claims relative to a fixed issuance instant
    ///
    /// Used when several artifacts (token and stored record) must share one
    /// expiry instant.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::CreateError` if the expiry instant is not
    /// representable.
    pub fn issued_at(
        user_id: Uuid,
        email: impl Into<String>,
        token_type: TokenClass,
        now: DateTime<Utc>,
        expires_in: Duration,
    ) -> Result<Self, JwtError> {
        let expiration = now.checked_add_signed(expires_in).ok_or_else(|| {
            JwtError::CreateError(format!("{} token expiry is out of range", token_type))
        })?;

        Ok(Self {
            sub: user_id,
            email: email.into(),
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            nbf: now.timestamp(),
            jti: Uuid::new_v4(),
            token_type,
        })
    }

    /// Expiration as a timestamp
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_default()
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Signs and verifies bearer tokens
pub trait TokenCodec: Send + Sync {
    /// Signs claims with the secret of `claims.token_type`
    fn sign(&self, claims: &Claims) -> Result<String, JwtError>;

    /// Verifies a token of the expected class and returns its claims
    fn verify(&self, class: TokenClass, token: &str) -> Result<Claims, JwtError>;

    /// Like [`TokenCodec::verify`] but accepts tokens past their `exp`
    ///
    /// Signature, issuer, not-before and class are still checked.
    fn verify_signature(&self, class: TokenClass, token: &str) -> Result<Claims, JwtError>;
}

/// HS256 implementation of [`TokenCodec`] with one secret per class
#[derive(Clone)]
pub struct JwtCodec {
    access_secret: String,
    refresh_secret: String,
}

impl std::fmt::Debug for JwtCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtCodec").finish_non_exhaustive()
    }
}

impl JwtCodec {
    /// Creates a codec from the two class secrets
    ///
    /// # Errors
    ///
    /// Returns `JwtError::MissingSecret` if either secret is empty.
    pub fn new(
        access_secret: impl Into<String>,
        refresh_secret: impl Into<String>,
    ) -> Result<Self, JwtError> {
        let access_secret = access_secret.into();
        let refresh_secret = refresh_secret.into();

        if access_secret.trim().is_empty() {
            return Err(JwtError::MissingSecret(TokenClass::Access));
        }
        if refresh_secret.trim().is_empty() {
            return Err(JwtError::MissingSecret(TokenClass::Refresh));
        }

        Ok(Self {
            access_secret,
            refresh_secret,
        })
    }

    fn secret(&self, class: TokenClass) -> &str {
        match class {
            TokenClass::Access => &self.access_secret,
            TokenClass::Refresh => &self.refresh_secret,
        }
    }
}

impl TokenCodec for JwtCodec {
    fn sign(&self, claims: &Claims) -> Result<String, JwtError> {
        let header = Header::new(Algorithm::HS256);
        let key = EncodingKey::from_secret(self.secret(claims.token_type).as_bytes());

        encode(&header, claims, &key)
            .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
    }

    fn verify(&self, class: TokenClass, token: &str) -> Result<Claims, JwtError> {
        self.decode_claims(class, token, true)
    }

    fn verify_signature(&self, class: TokenClass, token: &str) -> Result<Claims, JwtError> {
        self.decode_claims(class, token, false)
    }
}

impl JwtCodec {
    fn decode_claims(&self, class: TokenClass, token: &str, check_exp: bool) -> Result<Claims, JwtError> {
        let key = DecodingKey::from_secret(self.secret(class).as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.validate_exp = check_exp;
        validation.validate_nbf = true;
        validation.leeway = 0;

        let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
            _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
        })?;

        if token_data.claims.token_type != class {
            return Err(JwtError::WrongClass {
                expected: class,
                actual: token_data.claims.token_type,
            });
        }

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCESS: &str = "test-access-secret-at-least-32-bytes";
    const REFRESH: &str = "test-refresh-secret-at-least-32-bytes";

    fn codec() -> JwtCodec {
        JwtCodec::new(ACCESS, REFRESH).unwrap()
    }

    #[test]
    fn test_default_expiry() {
        assert_eq!(TokenClass::Access.default_expiry(), "15m");
        assert_eq!(TokenClass::Refresh.default_expiry(), "30d");
    }

    #[test]
    fn test_missing_secrets_rejected() {
        assert!(matches!(
            JwtCodec::new("", REFRESH),
            Err(JwtError::MissingSecret(TokenClass::Access))
        ));
        assert!(matches!(
            JwtCodec::new(ACCESS, "  "),
            Err(JwtError::MissingSecret(TokenClass::Refresh))
        ));
    }

    #[test]
    fn test_sign_and_verify_each_class() {
        let codec = codec();
        let user_id = Uuid::new_v4();

        for class in [TokenClass::Access, TokenClass::Refresh] {
            let claims = Claims::with_expiration(user_id, "a@x.com", class, Duration::hours(1)).unwrap();
            let token = codec.sign(&claims).unwrap();
            let verified = codec.verify(class, &token).unwrap();

            assert_eq!(verified, claims);
            assert_eq!(verified.iss, ISSUER);
            assert_eq!(verified.email, "a@x.com");
        }
    }

    #[test]
    fn test_classes_do_not_cross_verify() {
        let codec = codec();
        let access = Claims::with_expiration(Uuid::new_v4(), "a@x.com", TokenClass::Access, Duration::hours(1)).unwrap();
        let token = codec.sign(&access).unwrap();

        // Refresh secret differs, so the signature check fails first
        assert!(codec.verify(TokenClass::Refresh, &token).is_err());
    }

    #[test]
    fn test_same_secret_still_checks_class() {
        let codec = JwtCodec::new(ACCESS, ACCESS).unwrap();
        let refresh = Claims::with_expiration(Uuid::new_v4(), "a@x.com", TokenClass::Refresh, Duration::hours(1)).unwrap();
        let token = codec.sign(&refresh).unwrap();

        assert!(matches!(
            codec.verify(TokenClass::Access, &token),
            Err(JwtError::WrongClass { .. })
        ));
    }

    #[test]
    fn test_expired_token() {
        let codec = codec();
        let claims = Claims::with_expiration(
            Uuid::new_v4(),
            "a@x.com",
            TokenClass::Access,
            Duration::seconds(-3600),
        )
        .unwrap();
        assert!(claims.is_expired());

        let token = codec.sign(&claims).unwrap();
        assert!(matches!(
            codec.verify(TokenClass::Access, &token),
            Err(JwtError::Expired)
        ));
    }

    #[test]
    fn test_wrong_secret() {
        let claims = Claims::with_expiration(Uuid::new_v4(), "a@x.com", TokenClass::Access, Duration::hours(1)).unwrap();
        let token = codec().sign(&claims).unwrap();

        let other = JwtCodec::new("another-access-secret-32-bytes-long", REFRESH).unwrap();
        assert!(other.verify(TokenClass::Access, &token).is_err());
    }

    #[test]
    fn test_tokens_issued_together_differ() {
        let codec = codec();
        let now = Utc::now();
        let user_id = Uuid::new_v4();

        let a = codec
            .sign(&Claims::issued_at(user_id, "a@x.com", TokenClass::Refresh, now, Duration::days(30)).unwrap())
            .unwrap();
        let b = codec
            .sign(&Claims::issued_at(user_id, "a@x.com", TokenClass::Refresh, now, Duration::days(30)).unwrap())
            .unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn test_expires_at_matches_exp() {
        let now = Utc::now();
        let claims = Claims::issued_at(Uuid::new_v4(), "a@x.com", TokenClass::Refresh, now, Duration::days(30)).unwrap();
        assert_eq!(claims.expires_at().timestamp(), (now + Duration::days(30)).timestamp());
    }

    #[test]
    fn test_verify_signature_accepts_expired_token() {
        let codec = codec();
        let user_id = Uuid::new_v4();
        let claims =
            Claims::with_expiration(user_id, "a@x.com", TokenClass::Refresh, Duration::seconds(-60)).unwrap();
        let token = codec.sign(&claims).unwrap();

        assert!(matches!(codec.verify(TokenClass::Refresh, &token), Err(JwtError::Expired)));
        assert_eq!(codec.verify_signature(TokenClass::Refresh, &token).unwrap().sub, user_id);

        // Class and secret are still enforced
        assert!(codec.verify_signature(TokenClass::Access, &token).is_err());
        let other = JwtCodec::new(ACCESS, "another-refresh-secret-32-bytes-long").unwrap();
        assert!(other.verify_signature(TokenClass::Refresh, &token).is_err());
    }

    #[test]
    fn test_unrepresentable_expiry_is_an_error() {
        let result = Claims::with_expiration(
            Uuid::new_v4(),
            "a@x.com",
            TokenClass::Refresh,
            Duration::days(1_000_000_000),
        );
        assert!(matches!(result, Err(JwtError::CreateError(_))));
    }
}
