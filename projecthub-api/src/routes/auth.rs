/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Register new user
/// - `POST /v1/auth/login` - Login and get tokens
/// - `POST /v1/auth/refresh` - Rotate the refresh token
/// - `POST /v1/auth/logout` - Revoke a refresh token (authenticated)

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, http::StatusCode, Json};
use projecthub_shared::{
    auth::middleware::AuthContext,
    services::tokens::{AuthSession, TokenPair},
};
use serde::Deserialize;
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    /// Optional display name
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    /// One-time code; accepted for client compatibility, not checked
    #[serde(default)]
    pub otp: Option<String>,
}

/// Body of refresh and logout requests
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/register
/// Content-Type: application/json
///
/// {
///   "email": "user@example.com",
///   "password": "correct horse",
///   "name": "Jane Doe"
/// }
/// ```
///
/// # Response
///
/// `201 Created`
///
/// ```json
/// {
///   "user": { "id": "uuid", "email": "user@example.com", "name": "Jane Doe", "createdAt": "..." },
///   "accessToken": "eyJ...",
///   "refreshToken": "eyJ...",
///   "refreshExpiresAt": "..."
/// }
/// ```
///
/// # Errors
///
/// - `409 Conflict`: Email already registered
/// - `422 Unprocessable Entity`: Validation failed
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthSession>)> {
    req.validate()?;

    let session = state
        .tokens
        .register(&req.email, &req.password, req.name)
        .await?;

    Ok((StatusCode::CREATED, Json(session)))
}

/// Login endpoint
///
/// Any refresh tokens the user held before are revoked.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid credentials (same for unknown email and
///   wrong password)
/// - `422 Unprocessable Entity`: Validation failed
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthSession>> {
    req.validate()?;

    if req.otp.is_some() {
        tracing::debug!("Ignoring one-time code on login");
    }

    let session = state.tokens.login(&req.email, &req.password).await?;
    Ok(Json(session))
}

/// Token refresh endpoint
///
/// The presented refresh token is consumed and a new pair is returned.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid, expired or already used refresh token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> ApiResult<Json<TokenPair>> {
    req.validate()?;

    let caller = state.tokens.verify_refresh(&req.refresh_token)?;
    let pair = state
        .tokens
        .refresh(caller.user_id, &req.refresh_token)
        .await?;

    Ok(Json(pair))
}

/// Logout endpoint
///
/// Returns `204 No Content` whether or not the token was still live.
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<RefreshTokenRequest>,
) -> ApiResult<StatusCode> {
    req.validate()?;

    state.tokens.logout(auth.user_id, &req.refresh_token).await?;
    Ok(StatusCode::NO_CONTENT)
}
