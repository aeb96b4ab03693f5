/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing
/// - [`jwt`]: Access and refresh token signing and verification
/// - [`expiry`]: Token lifetime expressions (`15m`, `30d`)
/// - [`refresh`]: Refresh token fingerprints
/// - [`middleware`]: Authenticated identity for handlers
/// - [`authorization`]: Project role guards
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with 64 MB memory, 3 iterations
/// - **JWT Tokens**: HS256 with a separate secret per token class
/// - **Refresh Tokens**: Stored as SHA-256 fingerprints only
///
/// # Example
///
/// ```
/// use projecthub_shared::auth::password::{Argon2Hasher, CredentialHasher, PasswordParams};
/// use projecthub_shared::auth::jwt::{Claims, JwtCodec, TokenClass, TokenCodec};
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hasher = Argon2Hasher::new(PasswordParams::insecure_fast());
/// let hash = hasher.hash("user_password")?;
/// assert!(hasher.verify("user_password", &hash)?);
///
/// let codec = JwtCodec::new("access-secret", "refresh-secret")?;
/// let claims = Claims::with_expiration(Uuid::new_v4(), "a@x.com", TokenClass::Access, Duration::minutes(15))?;
/// let token = codec.sign(&claims)?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod expiry;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod refresh;
