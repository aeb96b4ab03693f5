/// PostgreSQL store
///
/// Every [`StoreTransaction`] wraps one `sqlx::Transaction`. Row locking on
/// `DELETE` gives refresh rotation its single-winner guarantee: a second
/// transaction deleting the same fingerprint blocks until the first commits
/// and then affects zero rows.

use async_trait::async_trait;
use sqlx::{postgres::PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use super::{CredentialStore, StoreError, StoreTransaction};
use crate::db::pool::health_check;
use crate::models::{
    audit_log::{AuditEntry, NewAuditEntry},
    membership::{ProjectMember, UpsertMember},
    project::{CreateProject, Project, ProjectPatch, ProjectWithRole},
    refresh_token::{CreateRefreshToken, RefreshToken},
    user::{CreateUser, User},
};

/// Store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction { tx }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        health_check(&self.pool).await?;
        Ok(())
    }
}

/// An open PostgreSQL transaction
///
/// Rolled back by sqlx when dropped uncommitted.
pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_email(&mut *self.tx, email).await?)
    }

    async fn find_user_by_id(&mut self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_id(&mut *self.tx, id).await?)
    }

    async fn create_user(&mut self, data: CreateUser) -> Result<User, StoreError> {
        Ok(User::create(&mut *self.tx, data).await?)
    }

    async fn create_refresh_token(
        &mut self,
        data: CreateRefreshToken,
    ) -> Result<RefreshToken, StoreError> {
        Ok(RefreshToken::create(&mut *self.tx, data).await?)
    }

    async fn find_refresh_token(
        &mut self,
        token_hash: &str,
    ) -> Result<Option<RefreshToken>, StoreError> {
        Ok(RefreshToken::find_by_hash(&mut *self.tx, token_hash).await?)
    }

    async fn delete_refresh_token(&mut self, token_hash: &str) -> Result<bool, StoreError> {
        Ok(RefreshToken::delete_by_hash(&mut *self.tx, token_hash).await?)
    }

    async fn delete_refresh_tokens_for_user(&mut self, user_id: Uuid) -> Result<u64, StoreError> {
        Ok(RefreshToken::delete_all_for_user(&mut *self.tx, user_id).await?)
    }

    async fn create_project(&mut self, data: CreateProject) -> Result<Project, StoreError> {
        Ok(Project::create(&mut *self.tx, data).await?)
    }

    async fn update_project(
        &mut self,
        id: Uuid,
        patch: &ProjectPatch,
    ) -> Result<Option<Project>, StoreError> {
        Ok(Project::update(&mut *self.tx, id, patch).await?)
    }

    async fn find_membership(
        &mut self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ProjectMember>, StoreError> {
        Ok(ProjectMember::find(&mut *self.tx, project_id, user_id).await?)
    }

    async fn find_project_with_role(
        &mut self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ProjectWithRole>, StoreError> {
        Ok(ProjectMember::find_with_project(&mut *self.tx, project_id, user_id).await?)
    }

    async fn create_membership(&mut self, data: UpsertMember) -> Result<ProjectMember, StoreError> {
        Ok(ProjectMember::create(&mut *self.tx, data).await?)
    }

    async fn upsert_membership(&mut self, data: UpsertMember) -> Result<ProjectMember, StoreError> {
        Ok(ProjectMember::upsert(&mut *self.tx, data).await?)
    }

    async fn list_projects_for_user(
        &mut self,
        user_id: Uuid,
    ) -> Result<Vec<ProjectWithRole>, StoreError> {
        Ok(ProjectMember::list_projects_for_user(&mut *self.tx, user_id).await?)
    }

    async fn append_audit(&mut self, data: NewAuditEntry) -> Result<AuditEntry, StoreError> {
        Ok(AuditEntry::append(&mut *self.tx, data).await?)
    }

    async fn list_audit(
        &mut self,
        project_id: Uuid,
        limit: usize,
    ) -> Result<Vec<AuditEntry>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        Ok(AuditEntry::list_for_project(&mut *self.tx, project_id, limit).await?)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        debug!("Transaction committed");
        Ok(())
    }
}
