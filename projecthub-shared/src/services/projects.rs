/// Project operations with role checks and audit trail
///
/// Every mutation writes its audit entry in the same store transaction as the
/// change itself; either both are committed or neither is.
///
/// | Operation | Required role | Audit action |
/// |---|---|---|
/// | `create_project` | any user | `PROJECT_CREATED` |
/// | `list_my_projects` | none | |
/// | `get_project_if_member` | any member | |
/// | `update_project` | EDITOR, ADMIN | `PROJECT_UPDATED` |
/// | `add_member` | ADMIN | `MEMBER_ADDED` |
/// | `list_audit` | any member | |

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use super::error::{ServiceError, ServiceResult};
use crate::auth::authorization::{require_member, require_project_admin, require_project_editor};
use crate::models::{
    audit_log::{AuditDetails, AuditEntry, MemberAddedDetails, NewAuditEntry, ProjectCreatedDetails},
    membership::{ProjectMember, ProjectRole, UpsertMember},
    project::{CreateProject, Project, ProjectPatch, ProjectWithRole},
};
use crate::store::CredentialStore;

/// Maximum number of entries returned by [`ProjectService::list_audit`]
pub const AUDIT_PAGE_SIZE: usize = 100;

/// Result of [`ProjectService::add_member`]
#[derive(Debug, Clone)]
pub struct AddedMember {
    pub member: ProjectMember,

    /// False when an existing membership only had its role changed
    pub created: bool,
}

/// Authorization and audit engine for projects
pub struct ProjectService {
    store: Arc<dyn CredentialStore>,
}

impl ProjectService {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Creates a project owned by `actor_id`
    ///
    /// The actor becomes its only ADMIN.
    pub async fn create_project(
        &self,
        actor_id: Uuid,
        name: &str,
        description: Option<String>,
    ) -> ServiceResult<Project> {
        let mut tx = self.store.begin().await?;

        let project = tx
            .create_project(CreateProject {
                name: name.to_string(),
                description: description.clone(),
            })
            .await?;

        tx.create_membership(UpsertMember {
            project_id: project.id,
            user_id: actor_id,
            role: ProjectRole::Admin,
        })
        .await?;

        tx.append_audit(NewAuditEntry {
            project_id: Some(project.id),
            actor_id,
            entity_id: Some(project.id),
            details: AuditDetails::ProjectCreated(ProjectCreatedDetails {
                name: project.name.clone(),
                description,
            }),
        })
        .await?;

        tx.commit().await?;

        info!(project_id = %project.id, user_id = %actor_id, "Project created");
        Ok(project)
    }

    /// Lists the user's projects, most recently joined first
    pub async fn list_my_projects(&self, user_id: Uuid) -> ServiceResult<Vec<ProjectWithRole>> {
        let mut tx = self.store.begin().await?;
        Ok(tx.list_projects_for_user(user_id).await?)
    }

    /// Gets a project with the caller's role
    ///
    /// # Errors
    ///
    /// - `Forbidden` if the user is not a member
    pub async fn get_project_if_member(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> ServiceResult<ProjectWithRole> {
        let mut tx = self.store.begin().await?;

        tx.find_project_with_role(project_id, user_id)
            .await?
            .ok_or_else(not_a_member)
    }

    /// Applies a partial update
    ///
    /// # Errors
    ///
    /// - `Forbidden` unless the user is EDITOR or ADMIN; nothing is written
    pub async fn update_project(
        &self,
        project_id: Uuid,
        user_id: Uuid,
        patch: ProjectPatch,
    ) -> ServiceResult<Project> {
        {
            let mut check = self.store.begin().await?;
            require_project_editor(check.as_mut(), project_id, user_id).await?;
        }

        let mut tx = self.store.begin().await?;

        let project = tx
            .update_project(project_id, &patch)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Project not found".to_string()))?;

        tx.append_audit(NewAuditEntry {
            project_id: Some(project.id),
            actor_id: user_id,
            entity_id: Some(project.id),
            details: AuditDetails::ProjectUpdated(patch),
        })
        .await?;

        tx.commit().await?;

        info!(project_id = %project.id, user_id = %user_id, "Project updated");
        Ok(project)
    }

    /// Adds a user to the project or changes their role
    ///
    /// # Errors
    ///
    /// - `Forbidden` unless the actor is ADMIN
    /// - `NotFound` if no user has `email`
    pub async fn add_member(
        &self,
        project_id: Uuid,
        actor_id: Uuid,
        email: &str,
        role: ProjectRole,
    ) -> ServiceResult<AddedMember> {
        let target = {
            let mut check = self.store.begin().await?;
            require_project_admin(check.as_mut(), project_id, actor_id).await?;

            check
                .find_user_by_email(email)
                .await?
                .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?
        };

        let mut tx = self.store.begin().await?;

        let created = tx.find_membership(project_id, target.id).await?.is_none();
        let member = tx
            .upsert_membership(UpsertMember {
                project_id,
                user_id: target.id,
                role,
            })
            .await?;

        tx.append_audit(NewAuditEntry {
            project_id: Some(project_id),
            actor_id,
            entity_id: Some(member.id),
            details: AuditDetails::MemberAdded(MemberAddedDetails {
                added_user_id: target.id,
                email: target.email.clone(),
                role,
            }),
        })
        .await?;

        tx.commit().await?;

        info!(
            project_id = %project_id,
            user_id = %actor_id,
            added_user_id = %target.id,
            role = %role,
            created,
            "Member added"
        );
        Ok(AddedMember { member, created })
    }

    /// Lists the most recent audit entries of a project, newest first
    ///
    /// # Errors
    ///
    /// - `Forbidden` if the user is not a member
    pub async fn list_audit(&self, project_id: Uuid, user_id: Uuid) -> ServiceResult<Vec<AuditEntry>> {
        let mut tx = self.store.begin().await?;
        require_member(tx.as_mut(), project_id, user_id).await?;

        let entries = tx.list_audit(project_id, AUDIT_PAGE_SIZE).await?;
        debug!(project_id = %project_id, count = entries.len(), "Audit entries listed");
        Ok(entries)
    }

    /// Looks up the user's role in a project
    ///
    /// # Errors
    ///
    /// - `Forbidden` if the user is not a member
    pub async fn get_role(&self, project_id: Uuid, user_id: Uuid) -> ServiceResult<ProjectRole> {
        let mut tx = self.store.begin().await?;
        Ok(require_member(tx.as_mut(), project_id, user_id).await?)
    }
}

fn not_a_member() -> ServiceError {
    ServiceError::Forbidden("You are not a member of this project".to_string())
}
