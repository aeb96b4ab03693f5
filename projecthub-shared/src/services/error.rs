/// Error type shared by the core services
///
/// Business failures carry a caller-safe message. Infrastructure failures
/// keep their source for logging; the HTTP layer never echoes them.

use crate::auth::{authorization::AuthzError, jwt::JwtError, password::PasswordError};
use crate::store::StoreError;

/// Error type for service operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Resource already exists (e.g. email taken)
    #[error("{0}")]
    Conflict(String),

    /// Credentials or tokens were rejected
    #[error("{0}")]
    Unauthorized(String),

    /// Caller lacks the role for the operation
    #[error("{0}")]
    Forbidden(String),

    /// Referenced resource doesn't exist
    #[error("{0}")]
    NotFound(String),

    /// Startup configuration is unusable
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Store failure; the transaction was rolled back
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Password hashing failure
    #[error("Password error: {0}")]
    Password(#[from] PasswordError),

    /// Token signing failure
    #[error("Token error: {0}")]
    Token(#[from] JwtError),
}

impl From<AuthzError> for ServiceError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::NotMember(_) => {
                ServiceError::Forbidden("You are not a member of this project".to_string())
            }
            AuthzError::InsufficientRole { .. } => {
                ServiceError::Forbidden("Insufficient project role".to_string())
            }
            AuthzError::Store(e) => ServiceError::Store(e),
        }
    }
}

/// Convenience alias for service results
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::membership::ProjectRole;
    use uuid::Uuid;

    #[test]
    fn test_authz_errors_become_forbidden() {
        let err = ServiceError::from(AuthzError::NotMember(Uuid::new_v4()));
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let err = ServiceError::from(AuthzError::InsufficientRole {
            role: ProjectRole::Reader,
            action: "manage members",
        });
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let err = ServiceError::from(AuthzError::Store(StoreError::Database("down".to_string())));
        assert!(matches!(err, ServiceError::Store(_)));
    }

    #[test]
    fn test_business_messages_are_verbatim() {
        let err = ServiceError::Unauthorized("Invalid credentials".to_string());
        assert_eq!(err.to_string(), "Invalid credentials");
    }
}
