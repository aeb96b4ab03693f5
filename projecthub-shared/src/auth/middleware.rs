/// Authenticated identity for Axum handlers
///
/// The JWT layer verifies the `Authorization: Bearer <token>` header and
/// inserts an [`AuthContext`] into the request extensions. Handlers take it as
/// an extractor and pass it explicitly into every core operation.
///
/// # Example
///
/// ```
/// use projecthub_shared::auth::middleware::AuthContext;
///
/// async fn handler(auth: AuthContext) -> String {
///     format!("Hello, {}!", auth.email)
/// }
/// ```

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::Claims;

/// Identity of the caller, taken from a verified access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
}

impl From<Claims> for AuthContext {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
        }
    }
}

/// Error type for credential extraction
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Missing authorization header
    #[error("Missing authorization header")]
    MissingCredentials,

    /// Header present but not a bearer token
    #[error("Expected Bearer token")]
    InvalidFormat,

    /// Handler mounted without the JWT layer
    #[error("Request is not authenticated")]
    Unauthenticated,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::InvalidFormat => StatusCode::BAD_REQUEST,
            AuthError::MissingCredentials | AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
        };
        (status, self.to_string()).into_response()
    }
}

/// Extracts the bearer token from request headers
///
/// ```
/// use axum::http::{header, HeaderMap, HeaderValue};
/// use projecthub_shared::auth::middleware::bearer_token;
///
/// let mut headers = HeaderMap::new();
/// headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
/// assert_eq!(bearer_token(&headers).unwrap(), "abc");
/// ```
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::InvalidFormat)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AuthError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::TokenClass;
    use axum::http::{HeaderValue, Request};
    use chrono::Duration;

    #[test]
    fn test_context_from_claims() {
        let user_id = Uuid::new_v4();
        let claims = Claims::with_expiration(user_id, "a@x.com", TokenClass::Access, Duration::minutes(5)).unwrap();

        let context = AuthContext::from(claims);
        assert_eq!(context.user_id, user_id);
        assert_eq!(context.email, "a@x.com");
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), Err(AuthError::MissingCredentials));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), Err(AuthError::InvalidFormat));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), Err(AuthError::InvalidFormat));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert_eq!(bearer_token(&headers), Ok("tok"));
    }

    #[tokio::test]
    async fn test_extractor_reads_extension() {
        let context = AuthContext {
            user_id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
        };

        let mut req = Request::new(());
        req.extensions_mut().insert(context.clone());
        let (mut parts, _) = req.into_parts();
        assert_eq!(AuthContext::from_request_parts(&mut parts, &()).await.unwrap(), context);

        let (mut parts, _) = Request::new(()).into_parts();
        assert_eq!(
            AuthContext::from_request_parts(&mut parts, &()).await.unwrap_err(),
            AuthError::Unauthenticated
        );
    }

    #[test]
    fn test_auth_error_into_response() {
        assert_eq!(
            AuthError::MissingCredentials.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::InvalidFormat.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
