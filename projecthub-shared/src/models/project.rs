/// Project model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;

use super::membership::ProjectRole;

/// Project model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a project
#[derive(Debug, Clone)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
}

/// Partial update of a project
///
/// Only `Some` fields are applied. This is also the audit payload of
/// `PROJECT_UPDATED`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ProjectPatch {
    /// True if the patch changes nothing
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

/// A project annotated with the caller's role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectWithRole {
    pub role: ProjectRole,

    #[serde(flatten)]
    pub project: Project,
}

impl Project {
    /// Builds a project row with a fresh ID and timestamps
    pub fn new(data: CreateProject) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: data.name,
            description: data.description,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a patch in place, bumping `updated_at` when anything changed
    pub fn apply(&mut self, patch: &ProjectPatch) {
        if patch.is_empty() {
            return;
        }
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        self.updated_at = Utc::now();
    }

    /// Inserts a project
    pub async fn create(conn: &mut PgConnection, data: CreateProject) -> Result<Self, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(data.name)
        .bind(data.description)
        .fetch_one(conn)
        .await?;

        Ok(project)
    }

    /// Applies a partial update
    ///
    /// Returns None if the project doesn't exist.
    pub async fn update(
        conn: &mut PgConnection,
        id: Uuid,
        patch: &ProjectPatch,
    ) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                updated_at = CASE
                    WHEN $2::VARCHAR IS NULL AND $3::TEXT IS NULL THEN updated_at
                    ELSE NOW()
                END
            WHERE id = $1
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(patch.name.as_deref())
        .bind(patch.description.as_deref())
        .fetch_optional(conn)
        .await?;

        Ok(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Project {
        Project::new(CreateProject {
            name: "Apollo".to_string(),
            description: Some("Moonshot".to_string()),
        })
    }

    #[test]
    fn test_apply_only_provided_fields() {
        let mut project = sample();
        project.apply(&ProjectPatch {
            name: None,
            description: Some("Landed".to_string()),
        });

        assert_eq!(project.name, "Apollo");
        assert_eq!(project.description.as_deref(), Some("Landed"));
        assert!(project.updated_at >= project.created_at);
    }

    #[test]
    fn test_empty_patch_is_noop() {
        let mut project = sample();
        let before = project.clone();
        project.apply(&ProjectPatch::default());
        assert_eq!(project, before);
    }

    #[test]
    fn test_patch_serializes_only_present_fields() {
        let patch = ProjectPatch {
            name: Some("Gemini".to_string()),
            description: None,
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            serde_json::json!({ "name": "Gemini" })
        );
    }

    #[test]
    fn test_project_with_role_flattens() {
        let project = sample();
        let value = serde_json::to_value(ProjectWithRole {
            role: ProjectRole::Editor,
            project: project.clone(),
        })
        .unwrap();

        assert_eq!(value["role"], "EDITOR");
        assert_eq!(value["name"], "Apollo");
        assert_eq!(value["id"], project.id.to_string());
        assert!(value.get("createdAt").is_some());
    }
}
