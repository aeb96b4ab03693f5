/// Transactional credential and project store
///
/// The services never talk to a database directly. They open a
/// [`StoreTransaction`] from a [`CredentialStore`], run their reads and writes
/// through it and call [`StoreTransaction::commit`]. Dropping a transaction
/// without committing discards every write made through it.
///
/// # Implementations
///
/// - [`postgres::PgStore`]: PostgreSQL via sqlx transactions
/// - [`memory::MemoryStore`]: in-process store for tests and local runs
///
/// # Example
///
/// ```
/// use projecthub_shared::store::{memory::MemoryStore, CredentialStore};
/// use projecthub_shared::models::user::CreateUser;
///
/// # async fn example() -> Result<(), projecthub_shared::store::StoreError> {
/// let store = MemoryStore::new();
///
/// let mut tx = store.begin().await?;
/// tx.create_user(CreateUser {
///     email: "a@x.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     name: None,
/// })
/// .await?;
/// tx.commit().await?;
///
/// let mut tx = store.begin().await?;
/// assert!(tx.find_user_by_email("a@x.com").await?.is_some());
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    audit_log::{AuditEntry, NewAuditEntry},
    membership::{ProjectMember, UpsertMember},
    project::{CreateProject, Project, ProjectPatch, ProjectWithRole},
    refresh_token::{CreateRefreshToken, RefreshToken},
    user::{CreateUser, User},
};

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A write referenced a row that doesn't exist
    #[error("Referenced record does not exist: {0}")]
    ForeignKeyViolation(String),

    /// Any other database failure
    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            let constraint = db.constraint().unwrap_or_default().to_string();
            if db.is_unique_violation() {
                return StoreError::UniqueViolation(constraint);
            }
            if db.is_foreign_key_violation() {
                return StoreError::ForeignKeyViolation(constraint);
            }
        }
        StoreError::Database(err.to_string())
    }
}

/// Entry point to the store
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Opens a new transaction
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError>;

    /// Checks the store is reachable
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Unit of work against the store
///
/// Reads observe the writes made earlier in the same transaction.
#[async_trait]
pub trait StoreTransaction: Send {
    // Users

    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_id(&mut self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Fails with `UniqueViolation` if the email is taken
    async fn create_user(&mut self, data: CreateUser) -> Result<User, StoreError>;

    // Refresh tokens

    /// Fails with `UniqueViolation` if the fingerprint already exists
    async fn create_refresh_token(
        &mut self,
        data: CreateRefreshToken,
    ) -> Result<RefreshToken, StoreError>;

    async fn find_refresh_token(
        &mut self,
        token_hash: &str,
    ) -> Result<Option<RefreshToken>, StoreError>;

    /// Returns true only if exactly one record was removed
    async fn delete_refresh_token(&mut self, token_hash: &str) -> Result<bool, StoreError>;

    /// Returns the number of records removed
    async fn delete_refresh_tokens_for_user(&mut self, user_id: Uuid) -> Result<u64, StoreError>;

    // Projects

    async fn create_project(&mut self, data: CreateProject) -> Result<Project, StoreError>;

    /// Returns None if the project doesn't exist
    async fn update_project(
        &mut self,
        id: Uuid,
        patch: &ProjectPatch,
    ) -> Result<Option<Project>, StoreError>;

    // Memberships

    async fn find_membership(
        &mut self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ProjectMember>, StoreError>;

    async fn find_project_with_role(
        &mut self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ProjectWithRole>, StoreError>;

    /// Fails with `UniqueViolation` if the user is already a member
    async fn create_membership(&mut self, data: UpsertMember) -> Result<ProjectMember, StoreError>;

    /// Creates the membership or overwrites its role
    async fn upsert_membership(&mut self, data: UpsertMember) -> Result<ProjectMember, StoreError>;

    /// Newest membership first
    async fn list_projects_for_user(
        &mut self,
        user_id: Uuid,
    ) -> Result<Vec<ProjectWithRole>, StoreError>;

    // Audit

    async fn append_audit(&mut self, data: NewAuditEntry) -> Result<AuditEntry, StoreError>;

    /// Newest first, at most `limit` entries
    async fn list_audit(
        &mut self,
        project_id: Uuid,
        limit: usize,
    ) -> Result<Vec<AuditEntry>, StoreError>;

    /// Makes every write of this transaction durable
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
