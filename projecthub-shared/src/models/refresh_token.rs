/// Refresh token records
///
/// One row per issued, unconsumed refresh token. Only the fingerprint from
/// [`crate::auth::refresh::hash_refresh_token`] is stored.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE refresh_tokens (
///     token_hash CHAR(64) PRIMARY KEY,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     expires_at TIMESTAMPTZ NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;

/// Stored refresh token record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RefreshToken {
    /// Fingerprint of the raw token
    pub token_hash: String,

    /// Owner of the token
    pub user_id: Uuid,

    /// Instant after which the record is no longer accepted
    pub expires_at: DateTime<Utc>,

    /// When the record was written
    pub created_at: DateTime<Utc>,
}

/// Input for storing a refresh token
#[derive(Debug, Clone)]
pub struct CreateRefreshToken {
    pub token_hash: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl RefreshToken {
    /// Builds a record stamped with the current time
    pub fn new(data: CreateRefreshToken) -> Self {
        Self {
            token_hash: data.token_hash,
            user_id: data.user_id,
            expires_at: data.expires_at,
            created_at: Utc::now(),
        }
    }

    /// Whether the record has passed its expiry at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    /// Stores a refresh token record
    pub async fn create(
        conn: &mut PgConnection,
        data: CreateRefreshToken,
    ) -> Result<Self, sqlx::Error> {
        let record = sqlx::query_as::<_, RefreshToken>(
            r#"
            INSERT INTO refresh_tokens (token_hash, user_id, expires_at)
            VALUES ($1, $2, $3)
            RETURNING token_hash, user_id, expires_at, created_at
            "#,
        )
        .bind(data.token_hash)
        .bind(data.user_id)
        .bind(data.expires_at)
        .fetch_one(conn)
        .await?;

        Ok(record)
    }

    /// Finds a record by fingerprint
    pub async fn find_by_hash(
        conn: &mut PgConnection,
        token_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let record = sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT token_hash, user_id, expires_at, created_at
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(conn)
        .await?;

        Ok(record)
    }

    /// Deletes a record by fingerprint
    ///
    /// Returns false if no row was deleted, which under concurrent rotation
    /// means another transaction consumed the token first.
    pub async fn delete_by_hash(conn: &mut PgConnection, token_hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .execute(conn)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Deletes every record owned by a user
    pub async fn delete_all_for_user(conn: &mut PgConnection, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }
}
