/// Token lifecycle: registration, login, rotation and logout
///
/// Access tokens are stateless and short-lived. Refresh tokens are long-lived,
/// single-use and tracked server-side by fingerprint only (see
/// [`crate::auth::refresh`]). Every operation that touches refresh records runs
/// in one store transaction.
///
/// # Rotation
///
/// `refresh` consumes the presented token and issues a successor in the same
/// transaction. The consuming delete must remove exactly one row; if a
/// concurrent call already consumed the token, this call is rejected.
///
/// # Sessions
///
/// `login` revokes every refresh record of the user before issuing a new pair,
/// so a user holds at most one refresh lineage at a time.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use projecthub_shared::auth::password::Argon2Hasher;
/// use projecthub_shared::services::tokens::{TokenConfig, TokenService};
/// use projecthub_shared::store::memory::MemoryStore;
///
/// # async fn example() -> Result<(), projecthub_shared::services::ServiceError> {
/// let config = TokenConfig::new("access-secret", "refresh-secret");
/// let tokens = TokenService::from_config(
///     Arc::new(MemoryStore::new()),
///     Arc::new(Argon2Hasher::default()),
///     &config,
/// )?;
///
/// let session = tokens.register("a@x.com", "pw1", None).await?;
/// let pair = tokens.refresh(session.user.id, &session.refresh_token).await?;
/// assert_ne!(pair.refresh_token, session.refresh_token);
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::{ServiceError, ServiceResult};
use crate::auth::{
    expiry::{parse_expiry, resolve_refresh_ttl},
    jwt::{Claims, JwtCodec, JwtError, TokenClass, TokenCodec},
    middleware::AuthContext,
    password::CredentialHasher,
    refresh::hash_refresh_token,
};
use crate::models::{
    refresh_token::CreateRefreshToken,
    user::{CreateUser, User, UserProfile},
};
use crate::store::{CredentialStore, StoreTransaction};

const INVALID_CREDENTIALS: &str = "Invalid credentials";
const INVALID_REFRESH_TOKEN: &str = "Invalid or expired refresh token";
const INVALID_ACCESS_TOKEN: &str = "Invalid or expired token";

// Verified against when the email is unknown so both login failures cost the same
const TIMING_DUMMY_PASSWORD: &str = "projecthub-timing-equalizer";

/// Raw token configuration, as read from the environment
#[derive(Clone)]
pub struct TokenConfig {
    pub access_secret: String,
    pub refresh_secret: String,

    /// Lifetime expression, e.g. `15m`
    pub access_expires_in: String,

    /// Lifetime expression, e.g. `30d`
    pub refresh_expires_in: String,
}

impl TokenConfig {
    /// Creates a config with the default lifetimes
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_expires_in: TokenClass::Access.default_expiry().to_string(),
            refresh_expires_in: TokenClass::Refresh.default_expiry().to_string(),
        }
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("access_expires_in", &self.access_expires_in)
            .field("refresh_expires_in", &self.refresh_expires_in)
            .finish_non_exhaustive()
    }
}

/// Resolved token lifetimes and the refresh fingerprint salt
#[derive(Clone)]
pub struct TokenSettings {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    token_hash_secret: String,
}

impl std::fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSettings")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenSettings {
    pub fn new(access_ttl: Duration, refresh_ttl: Duration, token_hash_secret: impl Into<String>) -> Self {
        Self {
            access_ttl,
            refresh_ttl,
            token_hash_secret: token_hash_secret.into(),
        }
    }

    /// Validates secrets and resolves lifetimes
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Configuration` if a secret is empty or the
    /// access lifetime doesn't parse. An unparseable refresh lifetime falls
    /// back to 30 days.
    pub fn from_config(config: &TokenConfig) -> ServiceResult<Self> {
        if config.access_secret.trim().is_empty() {
            return Err(ServiceError::Configuration(
                "JWT_ACCESS_SECRET must be set".to_string(),
            ));
        }
        if config.refresh_secret.trim().is_empty() {
            return Err(ServiceError::Configuration(
                "JWT_REFRESH_SECRET must be set".to_string(),
            ));
        }

        let access_ttl = parse_expiry(&config.access_expires_in).map_err(|e| {
            ServiceError::Configuration(format!("JWT_ACCESS_EXPIRES_IN: {}", e))
        })?;
        let refresh_ttl = resolve_refresh_ttl(&config.refresh_expires_in);

        Ok(Self::new(access_ttl, refresh_ttl, config.refresh_secret.clone()))
    }
}

/// Result of register and login
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Result of a refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

struct IssuedPair {
    access_token: String,
    refresh_token: String,
    refresh_expires_at: DateTime<Utc>,
}

/// Issues, verifies and rotates tokens
pub struct TokenService {
    store: Arc<dyn CredentialStore>,
    hasher: Arc<dyn CredentialHasher>,
    codec: Arc<dyn TokenCodec>,
    settings: TokenSettings,
    dummy_hash: String,
}

impl TokenService {
    /// Creates the service from its collaborators
    ///
    /// Hashes a dummy password once so that unknown-email logins can be
    /// verified at the same cost as real ones.
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: Arc<dyn CredentialHasher>,
        codec: Arc<dyn TokenCodec>,
        settings: TokenSettings,
    ) -> ServiceResult<Self> {
        let dummy_hash = hasher.hash(TIMING_DUMMY_PASSWORD)?;

        Ok(Self {
            store,
            hasher,
            codec,
            settings,
            dummy_hash,
        })
    }

    /// Creates the service with an HS256 codec built from `config`
    pub fn from_config(
        store: Arc<dyn CredentialStore>,
        hasher: Arc<dyn CredentialHasher>,
        config: &TokenConfig,
    ) -> ServiceResult<Self> {
        let settings = TokenSettings::from_config(config)?;
        let codec = JwtCodec::new(config.access_secret.as_str(), config.refresh_secret.as_str())
            .map_err(|e| ServiceError::Configuration(e.to_string()))?;

        Self::new(store, hasher, Arc::new(codec), settings)
    }

    /// Registers a user and opens their first session
    ///
    /// # Errors
    ///
    /// - `Conflict` if the email is already registered
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<String>,
    ) -> ServiceResult<AuthSession> {
        let mut tx = self.store.begin().await?;

        if tx.find_user_by_email(email).await?.is_some() {
            debug!("Registration rejected, email taken");
            return Err(email_taken());
        }

        let password_hash = self.hasher.hash(password)?;

        let user = tx
            .create_user(CreateUser {
                email: email.to_string(),
                password_hash,
                name,
            })
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    email_taken()
                } else {
                    ServiceError::Store(e)
                }
            })?;

        let issued = self.issue_pair(&user)?;
        self.store_refresh_token(tx.as_mut(), user.id, &issued).await?;
        tx.commit().await?;

        info!(user_id = %user.id, "User registered");

        Ok(AuthSession {
            user: user.profile(),
            access_token: issued.access_token,
            refresh_token: issued.refresh_token,
            refresh_expires_at: issued.refresh_expires_at,
        })
    }

    /// Authenticates a user and replaces all their refresh tokens
    ///
    /// # Errors
    ///
    /// - `Unauthorized` with the same message for an unknown email and a
    ///   wrong password
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<AuthSession> {
        let mut tx = self.store.begin().await?;

        let user = tx.find_user_by_email(email).await?;
        let stored_hash = user
            .as_ref()
            .map(|u| u.password_hash.as_str())
            .unwrap_or(self.dummy_hash.as_str());
        let valid = self.hasher.verify(password, stored_hash)?;

        let user = match user {
            Some(user) if valid => user,
            _ => {
                warn!("Rejected login attempt");
                return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
            }
        };

        let revoked = tx.delete_refresh_tokens_for_user(user.id).await?;

        let issued = self.issue_pair(&user)?;
        self.store_refresh_token(tx.as_mut(), user.id, &issued).await?;
        tx.commit().await?;

        info!(user_id = %user.id, revoked, "User logged in");

        Ok(AuthSession {
            user: user.profile(),
            access_token: issued.access_token,
            refresh_token: issued.refresh_token,
            refresh_expires_at: issued.refresh_expires_at,
        })
    }

    /// Exchanges a refresh token for a new pair
    ///
    /// The presented token is consumed. Its signature is not checked here;
    /// callers verify it first with [`TokenService::verify_refresh`]. Expiry
    /// is decided by the stored record.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if the token is unknown, belongs to another user, has
    ///   expired, was consumed concurrently, or its user no longer exists
    pub async fn refresh(&self, user_id: Uuid, refresh_token: &str) -> ServiceResult<TokenPair> {
        let token_hash = hash_refresh_token(refresh_token, &self.settings.token_hash_secret);
        let mut tx = self.store.begin().await?;

        let record = tx
            .find_refresh_token(&token_hash)
            .await?
            .ok_or_else(invalid_refresh_token)?;

        if record.user_id != user_id {
            warn!(user_id = %user_id, "Refresh token presented for another user");
            return Err(invalid_refresh_token());
        }

        if record.is_expired_at(Utc::now()) {
            // The cleanup is kept even though the call fails
            tx.delete_refresh_token(&token_hash).await?;
            tx.commit().await?;
            debug!(user_id = %user_id, "Expired refresh token removed");
            return Err(invalid_refresh_token());
        }

        let user = tx
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(invalid_refresh_token)?;

        if !tx.delete_refresh_token(&token_hash).await? {
            warn!(user_id = %user_id, "Refresh token consumed concurrently");
            return Err(invalid_refresh_token());
        }

        let issued = self.issue_pair(&user)?;
        self.store_refresh_token(tx.as_mut(), user.id, &issued).await?;
        tx.commit().await?;

        debug!(user_id = %user.id, "Refresh token rotated");

        Ok(TokenPair {
            access_token: issued.access_token,
            refresh_token: issued.refresh_token,
        })
    }

    /// Revokes one refresh token of the user
    ///
    /// Succeeds when the token is already gone or was never issued to the
    /// user, so repeating a logout is harmless.
    pub async fn logout(&self, user_id: Uuid, refresh_token: &str) -> ServiceResult<()> {
        let token_hash = hash_refresh_token(refresh_token, &self.settings.token_hash_secret);
        let mut tx = self.store.begin().await?;

        let owned = tx
            .find_refresh_token(&token_hash)
            .await?
            .is_some_and(|record| record.user_id == user_id);

        if owned {
            tx.delete_refresh_token(&token_hash).await?;
            tx.commit().await?;
            info!(user_id = %user_id, "User logged out");
        }

        Ok(())
    }

    /// Verifies an access token and returns the caller's identity
    pub fn verify_access(&self, token: &str) -> ServiceResult<AuthContext> {
        self.verify(TokenClass::Access, token, INVALID_ACCESS_TOKEN)
    }

    /// Verifies a refresh token's signature and class
    ///
    /// A signed token past its `exp` is still accepted: its stored record has
    /// expired with it, and [`TokenService::refresh`] deletes that record
    /// before rejecting the call.
    pub fn verify_refresh(&self, token: &str) -> ServiceResult<AuthContext> {
        let class = TokenClass::Refresh;
        self.codec
            .verify_signature(class, token)
            .map(AuthContext::from)
            .map_err(|e| rejected(class, e, INVALID_REFRESH_TOKEN))
    }

    fn verify(&self, class: TokenClass, token: &str, message: &str) -> ServiceResult<AuthContext> {
        self.codec
            .verify(class, token)
            .map(AuthContext::from)
            .map_err(|e| rejected(class, e, message))
    }

    fn issue_pair(&self, user: &User) -> ServiceResult<IssuedPair> {
        let now = Utc::now();
        let access = Claims::issued_at(user.id, &user.email, TokenClass::Access, now, self.settings.access_ttl)?;
        let refresh = Claims::issued_at(user.id, &user.email, TokenClass::Refresh, now, self.settings.refresh_ttl)?;

        Ok(IssuedPair {
            access_token: self.codec.sign(&access)?,
            refresh_token: self.codec.sign(&refresh)?,
            refresh_expires_at: refresh.expires_at(),
        })
    }

    async fn store_refresh_token(
        &self,
        tx: &mut dyn StoreTransaction,
        user_id: Uuid,
        issued: &IssuedPair,
    ) -> ServiceResult<()> {
        tx.create_refresh_token(CreateRefreshToken {
            token_hash: hash_refresh_token(&issued.refresh_token, &self.settings.token_hash_secret),
            user_id,
            expires_at: issued.refresh_expires_at,
        })
        .await?;

        Ok(())
    }
}

fn email_taken() -> ServiceError {
    ServiceError::Conflict("Email already registered".to_string())
}

fn rejected(class: TokenClass, error: JwtError, message: &str) -> ServiceError {
    debug!(class = %class, error = %error, "Token rejected");
    ServiceError::Unauthorized(message.to_string())
}

fn invalid_refresh_token() -> ServiceError {
    ServiceError::Unauthorized(INVALID_REFRESH_TOKEN.to_string())
}
