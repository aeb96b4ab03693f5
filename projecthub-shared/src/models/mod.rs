/// Database models for ProjectHub
///
/// Each model owns its row type and the SQL that reads and writes it. Queries
/// take a `&mut PgConnection` so they can run inside a transaction opened by
/// [`crate::store::postgres::PgStore`].
///
/// # Models
///
/// - `user`: User accounts
/// - `refresh_token`: Fingerprints of issued refresh tokens
/// - `project`: Projects
/// - `membership`: User-project relationships with roles
/// - `audit_log`: Append-only audit trail
///
/// # Example
///
/// ```no_run
/// use projecthub_shared::models::user::{User, CreateUser};
/// use projecthub_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let mut tx = pool.begin().await?;
///
/// let new_user = CreateUser {
///     email: "user@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     name: Some("Jane Doe".to_string()),
/// };
///
/// let user = User::create(&mut tx, new_user).await?;
/// tx.commit().await?;
/// # Ok(())
/// # }
/// ```

pub mod audit_log;
pub mod membership;
pub mod project;
pub mod refresh_token;
pub mod user;
