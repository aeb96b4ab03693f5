/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use projecthub_api::{app::AppState, config::Config};
/// use projecthub_shared::{db::pool::create_pool, store::postgres::PgStore};
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(config.pool_config()).await?;
/// let state = AppState::new(Arc::new(PgStore::new(pool)), config)?;
/// let app = projecthub_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use projecthub_shared::{
    auth::{middleware::bearer_token, password::Argon2Hasher},
    services::{projects::ProjectService, tokens::TokenService},
    store::CredentialStore,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Token lifecycle
    pub tokens: Arc<TokenService>,

    /// Projects, memberships and audit
    pub projects: Arc<ProjectService>,

    /// Backing store, used for health checks
    pub store: Arc<dyn CredentialStore>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the services over `store`
    ///
    /// # Errors
    ///
    /// Fails if the token settings are unusable (empty secret, malformed
    /// access lifetime).
    pub fn new(store: Arc<dyn CredentialStore>, config: Config) -> anyhow::Result<Self> {
        let hasher = Arc::new(Argon2Hasher::new(config.password));
        let tokens = TokenService::from_config(store.clone(), hasher, &config.token_config())?;
        let projects = ProjectService::new(store.clone());

        Ok(Self {
            tokens: Arc::new(tokens),
            projects: Arc::new(projects),
            store,
            config: Arc::new(config),
        })
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                        # Health check (public)
/// └── /v1/
///     ├── /auth/
///     │   ├── POST /register          # public
///     │   ├── POST /login             # public
///     │   ├── POST /refresh           # public, refresh token in body
///     │   └── POST /logout            # authenticated
///     └── /projects/                  # authenticated
///         ├── POST  /
///         ├── GET   /
///         ├── GET   /:id
///         ├── PATCH /:id
///         ├── POST  /:id/members
///         └── GET   /:id/audit
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Security headers
/// 4. Authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    let session_routes = Router::new()
        .route("/logout", post(routes::auth::logout))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let project_routes = Router::new()
        .route(
            "/",
            post(routes::projects::create_project).get(routes::projects::list_projects),
        )
        .route(
            "/:id",
            get(routes::projects::get_project).patch(routes::projects::update_project),
        )
        .route("/:id/members", post(routes::projects::add_member))
        .route("/:id/audit", get(routes::projects::list_audit))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let v1_routes = Router::new()
        .nest("/auth", public_auth_routes.merge(session_routes))
        .nest("/projects", project_routes);

    let cors = cors_layer(&state.config.api.cors_origins);

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(cors_origins: &[String]) -> CorsLayer {
    if cors_origins.iter().any(|origin| origin == "*") {
        // Development mode: permissive CORS
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// JWT authentication middleware layer
///
/// Verifies the access token from the Authorization header, then injects
/// the caller's `AuthContext` into request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let context = {
        let token = bearer_token(req.headers())?;
        state.tokens.verify_access(token)?
    };

    req.extensions_mut().insert(context);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http, http::StatusCode};
    use tower::ServiceExt;

    async fn preflight(cors_origins: &[&str], origin: &str) -> Response {
        let origins: Vec<String> = cors_origins.iter().map(|o| o.to_string()).collect();
        let app: Router = Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(cors_layer(&origins));

        let request = http::Request::builder()
            .method(Method::OPTIONS)
            .uri("/ping")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
            .body(Body::empty())
            .unwrap();

        app.oneshot(request).await.unwrap()
    }

    #[tokio::test]
    async fn test_cors_allows_listed_origin() {
        // The unparseable entry is skipped, the valid one still applies
        let response = preflight(&["https://app.example", "bad\norigin"], "https://app.example").await;

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://app.example"
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
        let methods = headers
            .get(header::ACCESS_CONTROL_ALLOW_METHODS)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(methods.contains("PATCH"));
    }

    #[tokio::test]
    async fn test_cors_ignores_unlisted_origin() {
        let response = preflight(&["https://app.example"], "https://evil.example").await;

        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[tokio::test]
    async fn test_cors_wildcard_is_permissive() {
        let response = preflight(&["*"], "https://anywhere.example").await;

        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
    }
}
