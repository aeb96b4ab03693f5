/// API route handlers
///
/// - `health`: Health check endpoint
/// - `auth`: Authentication endpoints (register, login, refresh, logout)
/// - `projects`: Projects, members and audit log

pub mod auth;
pub mod health;
pub mod projects;
