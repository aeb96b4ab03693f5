/// Project, membership and audit endpoints
///
/// All routes require a valid access token. Role checks happen in
/// `ProjectService`; handlers only validate input and pass the caller's
/// identity through.
///
/// # Endpoints
///
/// - `POST  /v1/projects` - Create a project (caller becomes ADMIN)
/// - `GET   /v1/projects` - List the caller's projects with their role
/// - `GET   /v1/projects/:id` - Get a project (members only)
/// - `PATCH /v1/projects/:id` - Update name/description (EDITOR or ADMIN)
/// - `POST  /v1/projects/:id/members` - Add or re-role a member (ADMIN)
/// - `GET   /v1/projects/:id/audit` - Latest 100 audit entries (members only)

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use projecthub_shared::{
    auth::middleware::AuthContext,
    models::{
        audit_log::AuditEntry,
        membership::{ProjectMember, ProjectRole},
        project::{Project, ProjectPatch, ProjectWithRole},
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Create project request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    pub description: Option<String>,
}

/// Update project request; omitted fields are left unchanged
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    pub description: Option<String>,
}

impl From<UpdateProjectRequest> for ProjectPatch {
    fn from(req: UpdateProjectRequest) -> Self {
        ProjectPatch {
            name: req.name,
            description: req.description,
        }
    }
}

/// Add member request
#[derive(Debug, Deserialize, Validate)]
pub struct AddMemberRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// `READER`, `EDITOR` or `ADMIN`
    pub role: ProjectRole,
}

pub async fn create_project(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    req.validate()?;

    let project = state
        .projects
        .create_project(auth.user_id, &req.name, req.description)
        .await?;

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn list_projects(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<ProjectWithRole>>> {
    let projects = state.projects.list_my_projects(auth.user_id).await?;
    Ok(Json(projects))
}

/// Get a project with the caller's role
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a member (also for unknown ids)
pub async fn get_project(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<ProjectWithRole>> {
    let project = state
        .projects
        .get_project_if_member(project_id, auth.user_id)
        .await?;

    Ok(Json(project))
}

/// Partially update a project
///
/// # Errors
///
/// - `403 Forbidden`: Caller is a READER or not a member
/// - `422 Unprocessable Entity`: Validation failed
pub async fn update_project(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(project_id): Path<Uuid>,
    Json(req): Json<UpdateProjectRequest>,
) -> ApiResult<Json<Project>> {
    req.validate()?;

    let project = state
        .projects
        .update_project(project_id, auth.user_id, req.into())
        .await?;

    Ok(Json(project))
}

/// Add a member by email, or change an existing member's role
///
/// Responds `201 Created` for a new membership and `200 OK` when only the
/// role of an existing one changed.
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an ADMIN of the project
/// - `404 Not Found`: No user has that email
pub async fn add_member(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(project_id): Path<Uuid>,
    Json(req): Json<AddMemberRequest>,
) -> ApiResult<(StatusCode, Json<ProjectMember>)> {
    req.validate()?;

    let added = state
        .projects
        .add_member(project_id, auth.user_id, &req.email, req.role)
        .await?;

    let status = if added.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(added.member)))
}

pub async fn list_audit(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<AuditEntry>>> {
    let entries = state.projects.list_audit(project_id, auth.user_id).await?;
    Ok(Json(entries))
}
