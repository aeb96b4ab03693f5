/// Core services
///
/// - [`tokens::TokenService`]: token lifecycle (register, login, refresh, logout)
/// - [`projects::ProjectService`]: project authorization and audit trail
///
/// Both take their collaborators through their constructors and reach
/// persistence only through [`crate::store::CredentialStore`].

pub mod error;
pub mod projects;
pub mod tokens;

pub use error::{ServiceError, ServiceResult};
