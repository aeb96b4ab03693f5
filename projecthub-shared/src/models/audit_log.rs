/// Audit log model and database operations
///
/// Append-only record of every mutation of a project or its membership. Rows
/// are written in the same transaction as the change they describe.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE audit_action AS ENUM ('PROJECT_CREATED', 'PROJECT_UPDATED', 'MEMBER_ADDED');
///
/// CREATE TABLE audit_logs (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID REFERENCES projects(id) ON DELETE SET NULL,
///     actor_id UUID NOT NULL REFERENCES users(id),
///     action audit_action NOT NULL,
///     entity VARCHAR(64) NOT NULL,
///     entity_id UUID,
///     details JSONB NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Details
///
/// Each action carries one typed payload, see [`AuditDetails`]. In JSON an
/// entry reads:
///
/// ```json
/// {
///   "id": "...",
///   "action": "MEMBER_ADDED",
///   "entity": "ProjectMember",
///   "details": { "added_user_id": "...", "email": "b@x.com", "role": "EDITOR" }
/// }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgConnection};
use uuid::Uuid;

use super::membership::ProjectRole;
use super::project::ProjectPatch;

/// Audited action kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "audit_action", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    ProjectCreated,
    ProjectUpdated,
    MemberAdded,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::ProjectCreated => "PROJECT_CREATED",
            AuditAction::ProjectUpdated => "PROJECT_UPDATED",
            AuditAction::MemberAdded => "MEMBER_ADDED",
        }
    }
}

/// Payload of `PROJECT_CREATED`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectCreatedDetails {
    pub name: String,
    pub description: Option<String>,
}

/// Payload of `MEMBER_ADDED`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberAddedDetails {
    pub added_user_id: Uuid,
    pub email: String,
    pub role: ProjectRole,
}

/// Typed audit payload, one variant per [`AuditAction`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "details", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditDetails {
    ProjectCreated(ProjectCreatedDetails),
    ProjectUpdated(ProjectPatch),
    MemberAdded(MemberAddedDetails),
}

/// Borrowed view of the payload alone, as stored in the `details` column
#[derive(Serialize)]
#[serde(untagged)]
enum StoredPayload<'a> {
    ProjectCreated(&'a ProjectCreatedDetails),
    ProjectUpdated(&'a ProjectPatch),
    MemberAdded(&'a MemberAddedDetails),
}

impl AuditDetails {
    pub fn action(&self) -> AuditAction {
        match self {
            AuditDetails::ProjectCreated(_) => AuditAction::ProjectCreated,
            AuditDetails::ProjectUpdated(_) => AuditAction::ProjectUpdated,
            AuditDetails::MemberAdded(_) => AuditAction::MemberAdded,
        }
    }

    /// Name of the audited entity type
    pub fn entity(&self) -> &'static str {
        match self {
            AuditDetails::ProjectCreated(_) | AuditDetails::ProjectUpdated(_) => "Project",
            AuditDetails::MemberAdded(_) => "ProjectMember",
        }
    }

    fn stored_payload(&self) -> StoredPayload<'_> {
        match self {
            AuditDetails::ProjectCreated(d) => StoredPayload::ProjectCreated(d),
            AuditDetails::ProjectUpdated(d) => StoredPayload::ProjectUpdated(d),
            AuditDetails::MemberAdded(d) => StoredPayload::MemberAdded(d),
        }
    }

    /// Rebuilds typed details from the action column and the raw payload
    pub fn from_parts(
        action: AuditAction,
        payload: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        Ok(match action {
            AuditAction::ProjectCreated => {
                AuditDetails::ProjectCreated(serde_json::from_value(payload)?)
            }
            AuditAction::ProjectUpdated => {
                AuditDetails::ProjectUpdated(serde_json::from_value(payload)?)
            }
            AuditAction::MemberAdded => AuditDetails::MemberAdded(serde_json::from_value(payload)?),
        })
    }
}

/// A single audit log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: Uuid,
    pub project_id: Option<Uuid>,
    pub actor_id: Uuid,
    pub entity: String,
    pub entity_id: Option<Uuid>,

    /// Flattened into `action` and `details`
    #[serde(flatten)]
    pub details: AuditDetails,

    pub created_at: DateTime<Utc>,
}

/// Input for appending an audit entry
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub project_id: Option<Uuid>,
    pub actor_id: Uuid,
    pub entity_id: Option<Uuid>,
    pub details: AuditDetails,
}

#[derive(sqlx::FromRow)]
struct AuditLogRow {
    id: Uuid,
    project_id: Option<Uuid>,
    actor_id: Uuid,
    action: AuditAction,
    entity: String,
    entity_id: Option<Uuid>,
    details: Json<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AuditLogRow> for AuditEntry {
    type Error = sqlx::Error;

    fn try_from(row: AuditLogRow) -> Result<Self, Self::Error> {
        let details = AuditDetails::from_parts(row.action, row.details.0)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(AuditEntry {
            id: row.id,
            project_id: row.project_id,
            actor_id: row.actor_id,
            entity: row.entity,
            entity_id: row.entity_id,
            details,
            created_at: row.created_at,
        })
    }
}

impl AuditEntry {
    /// Builds an entry with a fresh ID, stamped now
    pub fn new(data: NewAuditEntry) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id: data.project_id,
            actor_id: data.actor_id,
            entity: data.details.entity().to_string(),
            entity_id: data.entity_id,
            details: data.details,
            created_at: Utc::now(),
        }
    }

    pub fn action(&self) -> AuditAction {
        self.details.action()
    }

    /// Appends an entry
    pub async fn append(conn: &mut PgConnection, data: NewAuditEntry) -> Result<Self, sqlx::Error> {
        let row = sqlx::query_as::<_, AuditLogRow>(
            r#"
            INSERT INTO audit_logs (project_id, actor_id, action, entity, entity_id, details)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, project_id, actor_id, action, entity, entity_id, details, created_at
            "#,
        )
        .bind(data.project_id)
        .bind(data.actor_id)
        .bind(data.details.action())
        .bind(data.details.entity())
        .bind(data.entity_id)
        .bind(Json(data.details.stored_payload()))
        .fetch_one(conn)
        .await?;

        AuditEntry::try_from(row)
    }

    /// Lists the most recent entries of a project, newest first
    pub async fn list_for_project(
        conn: &mut PgConnection,
        project_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query_as::<_, AuditLogRow>(
            r#"
            SELECT id, project_id, actor_id, action, entity, entity_id, details, created_at
            FROM audit_logs
            WHERE project_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(project_id)
        .bind(limit)
        .fetch_all(conn)
        .await?;

        rows.into_iter().map(AuditEntry::try_from).collect()
    }
}
