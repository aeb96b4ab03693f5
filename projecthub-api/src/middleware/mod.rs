/// Middleware modules for the API server
///
/// JWT authentication lives in `app::jwt_auth_layer` since it needs the
/// application state.

pub mod security;
