/// In-process store
///
/// Keeps all rows in memory behind one async mutex. A transaction holds the
/// lock from `begin` until it is committed or dropped, works on a private copy
/// of the state and swaps it in on commit. Transactions are therefore fully
/// serialized, and an uncommitted transaction leaves no trace.
///
/// Enforces the same unique constraints as the PostgreSQL schema:
/// `users.email`, `refresh_tokens.token_hash` and
/// `project_members (project_id, user_id)`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{CredentialStore, StoreError, StoreTransaction};
use crate::models::{
    audit_log::{AuditEntry, NewAuditEntry},
    membership::{ProjectMember, UpsertMember},
    project::{CreateProject, Project, ProjectPatch, ProjectWithRole},
    refresh_token::{CreateRefreshToken, RefreshToken},
    user::{CreateUser, User},
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    refresh_tokens: HashMap<String, RefreshToken>,
    projects: HashMap<Uuid, Project>,

    // Insertion ordered; breaks ties between equal timestamps
    members: Vec<ProjectMember>,
    audit: Vec<AuditEntry>,
}

impl MemoryState {
    fn project_with_role(&self, member: &ProjectMember) -> Option<ProjectWithRole> {
        self.projects.get(&member.project_id).map(|project| ProjectWithRole {
            role: member.role,
            project: project.clone(),
        })
    }
}

/// In-memory [`CredentialStore`]
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    fail_audit_appends: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later `append_audit` fail until switched off
    ///
    /// Lets tests observe that a failed audit write rolls back the mutation
    /// it belongs to.
    pub fn fail_audit_appends(&self, fail: bool) {
        self.fail_audit_appends.store(fail, Ordering::SeqCst);
    }

    /// Number of committed refresh token records
    pub async fn refresh_token_count(&self) -> usize {
        self.state.lock().await.refresh_tokens.len()
    }

    /// Number of committed audit entries across all projects
    pub async fn audit_count(&self) -> usize {
        self.state.lock().await.audit.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();

        Ok(Box::new(MemoryTransaction {
            guard,
            staged,
            fail_audit_appends: self.fail_audit_appends.load(Ordering::SeqCst),
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Open in-memory transaction
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    fail_audit_appends: bool,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.staged.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&mut self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.staged.users.get(&id).cloned())
    }

    async fn create_user(&mut self, data: CreateUser) -> Result<User, StoreError> {
        if self.staged.users.values().any(|u| u.email == data.email) {
            return Err(StoreError::UniqueViolation("users_email_key".to_string()));
        }

        let user = User::new(data);
        self.staged.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn create_refresh_token(
        &mut self,
        data: CreateRefreshToken,
    ) -> Result<RefreshToken, StoreError> {
        if !self.staged.users.contains_key(&data.user_id) {
            return Err(StoreError::ForeignKeyViolation(
                "refresh_tokens_user_id_fkey".to_string(),
            ));
        }
        if self.staged.refresh_tokens.contains_key(&data.token_hash) {
            return Err(StoreError::UniqueViolation("refresh_tokens_pkey".to_string()));
        }

        let record = RefreshToken::new(data);
        self.staged
            .refresh_tokens
            .insert(record.token_hash.clone(), record.clone());
        Ok(record)
    }

    async fn find_refresh_token(
        &mut self,
        token_hash: &str,
    ) -> Result<Option<RefreshToken>, StoreError> {
        Ok(self.staged.refresh_tokens.get(token_hash).cloned())
    }

    async fn delete_refresh_token(&mut self, token_hash: &str) -> Result<bool, StoreError> {
        Ok(self.staged.refresh_tokens.remove(token_hash).is_some())
    }

    async fn delete_refresh_tokens_for_user(&mut self, user_id: Uuid) -> Result<u64, StoreError> {
        let before = self.staged.refresh_tokens.len();
        self.staged.refresh_tokens.retain(|_, r| r.user_id != user_id);
        Ok((before - self.staged.refresh_tokens.len()) as u64)
    }

    async fn create_project(&mut self, data: CreateProject) -> Result<Project, StoreError> {
        let project = Project::new(data);
        self.staged.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn update_project(
        &mut self,
        id: Uuid,
        patch: &ProjectPatch,
    ) -> Result<Option<Project>, StoreError> {
        Ok(self.staged.projects.get_mut(&id).map(|project| {
            project.apply(patch);
            project.clone()
        }))
    }

    async fn find_membership(
        &mut self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ProjectMember>, StoreError> {
        Ok(self
            .staged
            .members
            .iter()
            .find(|m| m.project_id == project_id && m.user_id == user_id)
            .cloned())
    }

    async fn find_project_with_role(
        &mut self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ProjectWithRole>, StoreError> {
        let state = &self.staged;
        Ok(state
            .members
            .iter()
            .find(|m| m.project_id == project_id && m.user_id == user_id)
            .and_then(|m| state.project_with_role(m)))
    }

    async fn create_membership(&mut self, data: UpsertMember) -> Result<ProjectMember, StoreError> {
        if !self.staged.projects.contains_key(&data.project_id) {
            return Err(StoreError::ForeignKeyViolation(
                "project_members_project_id_fkey".to_string(),
            ));
        }
        if !self.staged.users.contains_key(&data.user_id) {
            return Err(StoreError::ForeignKeyViolation(
                "project_members_user_id_fkey".to_string(),
            ));
        }
        if self
            .staged
            .members
            .iter()
            .any(|m| m.project_id == data.project_id && m.user_id == data.user_id)
        {
            return Err(StoreError::UniqueViolation(
                "project_members_project_id_user_id_key".to_string(),
            ));
        }

        let member = ProjectMember::new(data);
        self.staged.members.push(member.clone());
        Ok(member)
    }

    async fn upsert_membership(&mut self, data: UpsertMember) -> Result<ProjectMember, StoreError> {
        if let Some(existing) = self
            .staged
            .members
            .iter_mut()
            .find(|m| m.project_id == data.project_id && m.user_id == data.user_id)
        {
            existing.role = data.role;
            return Ok(existing.clone());
        }

        self.create_membership(data).await
    }

    async fn list_projects_for_user(
        &mut self,
        user_id: Uuid,
    ) -> Result<Vec<ProjectWithRole>, StoreError> {
        let state = &self.staged;
        let mut members: Vec<&ProjectMember> =
            state.members.iter().filter(|m| m.user_id == user_id).collect();
        members.reverse();
        members.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(members
            .into_iter()
            .filter_map(|m| state.project_with_role(m))
            .collect())
    }

    async fn append_audit(&mut self, data: NewAuditEntry) -> Result<AuditEntry, StoreError> {
        if self.fail_audit_appends {
            return Err(StoreError::Database("audit log unavailable".to_string()));
        }

        let entry = AuditEntry::new(data);
        self.staged.audit.push(entry.clone());
        Ok(entry)
    }

    async fn list_audit(
        &mut self,
        project_id: Uuid,
        limit: usize,
    ) -> Result<Vec<AuditEntry>, StoreError> {
        let mut entries: Vec<&AuditEntry> = self
            .staged
            .audit
            .iter()
            .filter(|e| e.project_id == Some(project_id))
            .collect();
        entries.reverse();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(entries.into_iter().take(limit).cloned().collect())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTransaction {
            mut guard, staged, ..
        } = *self;
        *guard = staged;
        Ok(())
    }
}
