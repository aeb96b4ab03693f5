/// Project membership model and database operations
///
/// Memberships join users to projects with a role. They are the only source
/// of authorization for project operations.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE project_role AS ENUM ('READER', 'EDITOR', 'ADMIN');
///
/// CREATE TABLE project_members (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role project_role NOT NULL DEFAULT 'READER',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (project_id, user_id)
/// );
/// ```
///
/// # Roles
///
/// - **ADMIN**: edit project metadata, manage members, read everything
/// - **EDITOR**: edit project metadata, read everything
/// - **READER**: read-only access

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;

use super::project::{Project, ProjectWithRole};

/// Roles within a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ProjectRole {
    /// Read-only access
    Reader,

    /// Can update project metadata
    Editor,

    /// Full control including membership
    Admin,
}

impl ProjectRole {
    /// Converts role to its wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Reader => "READER",
            ProjectRole::Editor => "EDITOR",
            ProjectRole::Admin => "ADMIN",
        }
    }

    // Each capability is spelled out per operation; there is deliberately no
    // ordinal comparison between roles.

    /// Can read the project and its audit trail
    pub fn can_read(&self) -> bool {
        matches!(self, ProjectRole::Reader | ProjectRole::Editor | ProjectRole::Admin)
    }

    /// Can update project name and description
    pub fn can_edit_project(&self) -> bool {
        matches!(self, ProjectRole::Editor | ProjectRole::Admin)
    }

    /// Can add members and change their roles
    pub fn can_manage_members(&self) -> bool {
        matches!(self, ProjectRole::Admin)
    }
}

impl std::fmt::Display for ProjectRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProjectRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "READER" => Ok(ProjectRole::Reader),
            "EDITOR" => Ok(ProjectRole::Editor),
            "ADMIN" => Ok(ProjectRole::Admin),
            other => Err(format!("Unknown project role: {}", other)),
        }
    }
}

/// Membership of a user in a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMember {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: ProjectRole,

    /// When the user joined; role changes keep the original value
    pub created_at: DateTime<Utc>,
}

/// Input for creating or overwriting a membership
#[derive(Debug, Clone)]
pub struct UpsertMember {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: ProjectRole,
}

#[derive(sqlx::FromRow)]
struct MembershipProjectRow {
    role: ProjectRole,
    id: Uuid,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MembershipProjectRow> for ProjectWithRole {
    fn from(row: MembershipProjectRow) -> Self {
        ProjectWithRole {
            role: row.role,
            project: Project {
                id: row.id,
                name: row.name,
                description: row.description,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

impl ProjectMember {
    /// Builds a membership row with a fresh ID
    pub fn new(data: UpsertMember) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id: data.project_id,
            user_id: data.user_id,
            role: data.role,
            created_at: Utc::now(),
        }
    }

    /// Inserts a membership
    ///
    /// # Errors
    ///
    /// Fails with a unique violation if the user is already a member.
    pub async fn create(conn: &mut PgConnection, data: UpsertMember) -> Result<Self, sqlx::Error> {
        let member = sqlx::query_as::<_, ProjectMember>(
            r#"
            INSERT INTO project_members (project_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING id, project_id, user_id, role, created_at
            "#,
        )
        .bind(data.project_id)
        .bind(data.user_id)
        .bind(data.role)
        .fetch_one(conn)
        .await?;

        Ok(member)
    }

    /// Inserts a membership or overwrites the role of an existing one
    pub async fn upsert(conn: &mut PgConnection, data: UpsertMember) -> Result<Self, sqlx::Error> {
        let member = sqlx::query_as::<_, ProjectMember>(
            r#"
            INSERT INTO project_members (project_id, user_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (project_id, user_id) DO UPDATE SET role = EXCLUDED.role
            RETURNING id, project_id, user_id, role, created_at
            "#,
        )
        .bind(data.project_id)
        .bind(data.user_id)
        .bind(data.role)
        .fetch_one(conn)
        .await?;

        Ok(member)
    }

    /// Finds the membership of a user in a project
    pub async fn find(
        conn: &mut PgConnection,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let member = sqlx::query_as::<_, ProjectMember>(
            r#"
            SELECT id, project_id, user_id, role, created_at
            FROM project_members
            WHERE project_id = $1 AND user_id = $2
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;

        Ok(member)
    }

    /// Gets a user's project together with their role
    pub async fn find_with_project(
        conn: &mut PgConnection,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ProjectWithRole>, sqlx::Error> {
        let row = sqlx::query_as::<_, MembershipProjectRow>(
            r#"
            SELECT m.role, p.id, p.name, p.description, p.created_at, p.updated_at
            FROM project_members m
            JOIN projects p ON p.id = m.project_id
            WHERE m.project_id = $1 AND m.user_id = $2
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;

        Ok(row.map(ProjectWithRole::from))
    }

    /// Lists all projects a user belongs to, newest membership first
    pub async fn list_projects_for_user(
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<Vec<ProjectWithRole>, sqlx::Error> {
        let rows = sqlx::query_as::<_, MembershipProjectRow>(
            r#"
            SELECT m.role, p.id, p.name, p.description, p.created_at, p.updated_at
            FROM project_members m
            JOIN projects p ON p.id = m.project_id
            WHERE m.user_id = $1
            ORDER BY m.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(conn)
        .await?;

        Ok(rows.into_iter().map(ProjectWithRole::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_names() {
        assert_eq!(ProjectRole::Reader.as_str(), "READER");
        assert_eq!(ProjectRole::Editor.as_str(), "EDITOR");
        assert_eq!(ProjectRole::Admin.as_str(), "ADMIN");

        assert_eq!(serde_json::to_string(&ProjectRole::Admin).unwrap(), "\"ADMIN\"");
        assert_eq!(
            serde_json::from_str::<ProjectRole>("\"EDITOR\"").unwrap(),
            ProjectRole::Editor
        );
        assert!(serde_json::from_str::<ProjectRole>("\"editor\"").is_err());
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("READER".parse::<ProjectRole>().unwrap(), ProjectRole::Reader);
        assert!("OWNER".parse::<ProjectRole>().is_err());
    }

    #[test]
    fn test_role_capabilities() {
        assert!(ProjectRole::Reader.can_read());
        assert!(!ProjectRole::Reader.can_edit_project());
        assert!(!ProjectRole::Reader.can_manage_members());

        assert!(ProjectRole::Editor.can_read());
        assert!(ProjectRole::Editor.can_edit_project());
        assert!(!ProjectRole::Editor.can_manage_members());

        assert!(ProjectRole::Admin.can_read());
        assert!(ProjectRole::Admin.can_edit_project());
        assert!(ProjectRole::Admin.can_manage_members());
    }
}
