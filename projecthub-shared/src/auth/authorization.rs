/// Authorization guards for project operations
///
/// Access to a project is decided solely by the caller's membership row. Each
/// guard loads that row through the open store transaction and checks the
/// capability its operation needs.
///
/// # Permission Model
///
/// | Operation | Guard | Roles |
/// |---|---|---|
/// | read project, list audit | [`require_member`] | READER, EDITOR, ADMIN |
/// | update project | [`require_project_editor`] | EDITOR, ADMIN |
/// | add member | [`require_project_admin`] | ADMIN |
///
/// A missing membership and an insufficient role both surface as `Forbidden`,
/// so non-members cannot tell which projects exist.
///
/// # Example
///
/// ```no_run
/// use projecthub_shared::auth::authorization::require_project_editor;
/// use projecthub_shared::store::CredentialStore;
/// use uuid::Uuid;
///
/// # async fn example(store: &dyn CredentialStore, project_id: Uuid, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let mut tx = store.begin().await?;
/// let role = require_project_editor(tx.as_mut(), project_id, user_id).await?;
/// println!("Caller may edit as {}", role);
/// # Ok(())
/// # }
/// ```

use uuid::Uuid;

use crate::models::membership::ProjectRole;
use crate::store::{StoreError, StoreTransaction};

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// User is not a member of the project
    #[error("Not a member of project {0}")]
    NotMember(Uuid),

    /// User's role lacks the capability
    #[error("Role {role} may not {action}")]
    InsufficientRole {
        role: ProjectRole,
        action: &'static str,
    },

    /// Store error while loading the membership
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Loads the caller's role in a project
///
/// # Errors
///
/// Returns `AuthzError::NotMember` if there is no membership row.
pub async fn require_member(
    tx: &mut dyn StoreTransaction,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<ProjectRole, AuthzError> {
    let member = tx
        .find_membership(project_id, user_id)
        .await?
        .ok_or(AuthzError::NotMember(project_id))?;

    check(member.role, member.role.can_read(), "read this project")
}

/// Requires a role that may edit project metadata
pub async fn require_project_editor(
    tx: &mut dyn StoreTransaction,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<ProjectRole, AuthzError> {
    let role = require_member(tx, project_id, user_id).await?;
    check(role, role.can_edit_project(), "update this project")
}

/// Requires a role that may manage members
pub async fn require_project_admin(
    tx: &mut dyn StoreTransaction,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<ProjectRole, AuthzError> {
    let role = require_member(tx, project_id, user_id).await?;
    check(role, role.can_manage_members(), "manage members")
}

fn check(role: ProjectRole, allowed: bool, action: &'static str) -> Result<ProjectRole, AuthzError> {
    if allowed {
        Ok(role)
    } else {
        Err(AuthzError::InsufficientRole { role, action })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        membership::UpsertMember,
        project::CreateProject,
        user::CreateUser,
    };
    use crate::store::{memory::MemoryStore, CredentialStore};

    async fn setup(role: ProjectRole) -> (MemoryStore, Uuid, Uuid) {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let user = tx
            .create_user(CreateUser {
                email: "a@x.com".to_string(),
                password_hash: "hash".to_string(),
                name: None,
            })
            .await
            .unwrap();
        let project = tx
            .create_project(CreateProject {
                name: "Apollo".to_string(),
                description: None,
            })
            .await
            .unwrap();
        tx.create_membership(UpsertMember {
            project_id: project.id,
            user_id: user.id,
            role,
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();

        (store, project.id, user.id)
    }

    #[tokio::test]
    async fn test_non_member_rejected() {
        let (store, project_id, _) = setup(ProjectRole::Admin).await;
        let mut tx = store.begin().await.unwrap();

        let err = require_member(tx.as_mut(), project_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::NotMember(id) if id == project_id));
    }

    #[tokio::test]
    async fn test_reader_guards() {
        let (store, project_id, user_id) = setup(ProjectRole::Reader).await;
        let mut tx = store.begin().await.unwrap();

        assert_eq!(
            require_member(tx.as_mut(), project_id, user_id).await.unwrap(),
            ProjectRole::Reader
        );
        assert!(matches!(
            require_project_editor(tx.as_mut(), project_id, user_id).await,
            Err(AuthzError::InsufficientRole { role: ProjectRole::Reader, .. })
        ));
        assert!(require_project_admin(tx.as_mut(), project_id, user_id).await.is_err());
    }

    #[tokio::test]
    async fn test_editor_guards() {
        let (store, project_id, user_id) = setup(ProjectRole::Editor).await;
        let mut tx = store.begin().await.unwrap();

        assert!(require_project_editor(tx.as_mut(), project_id, user_id).await.is_ok());
        assert!(require_project_admin(tx.as_mut(), project_id, user_id).await.is_err());
    }

    #[tokio::test]
    async fn test_admin_guards() {
        let (store, project_id, user_id) = setup(ProjectRole::Admin).await;
        let mut tx = store.begin().await.unwrap();

        assert!(require_project_editor(tx.as_mut(), project_id, user_id).await.is_ok());
        assert_eq!(
            require_project_admin(tx.as_mut(), project_id, user_id).await.unwrap(),
            ProjectRole::Admin
        );
    }

    #[test]
    fn test_authz_error_display() {
        let err = AuthzError::InsufficientRole {
            role: ProjectRole::Reader,
            action: "update this project",
        };
        assert_eq!(err.to_string(), "Role READER may not update this project");
    }
}
