/// Common test utilities for router tests
///
/// Builds the full router over an in-memory store so tests exercise routing,
/// extraction, the JWT layer and error mapping without a database.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use projecthub_api::{
    app::{build_router, AppState},
    config::{ApiConfig, Config, DatabaseConfig, JwtConfig},
};
use projecthub_shared::{auth::password::PasswordParams, store::memory::MemoryStore};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Router plus a handle on its store
pub struct TestApp {
    pub app: Router,
    pub store: MemoryStore,
}

/// Configuration that never touches the environment
pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            production: false,
        },
        database: DatabaseConfig {
            url: "postgresql://unused".to_string(),
            max_connections: 1,
        },
        jwt: JwtConfig {
            access_secret: "test-access-secret-0123456789abcdef".to_string(),
            refresh_secret: "test-refresh-secret-0123456789abcdef".to_string(),
            access_expires_in: "15m".to_string(),
            refresh_expires_in: "30d".to_string(),
        },
        password: PasswordParams::insecure_fast(),
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let store = MemoryStore::new();
        let state = AppState::new(Arc::new(store.clone()), config).expect("test config is valid");

        Self {
            app: build_router(state),
            store,
        }
    }

    /// Sends one request and returns the status with the decoded JSON body
    ///
    /// An empty body decodes to `Value::Null`.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, json)
    }

    /// Registers a user and returns `(access_token, refresh_token, user_id)`
    pub async fn register(&self, email: &str, password: &str) -> (String, String, String) {
        let (status, body) = self
            .request(
                Method::POST,
                "/v1/auth/register",
                None,
                Some(serde_json::json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

        (
            body["accessToken"].as_str().unwrap().to_string(),
            body["refreshToken"].as_str().unwrap().to_string(),
            body["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    /// Creates a project and returns its id
    pub async fn create_project(&self, token: &str, name: &str) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/v1/projects",
                Some(token),
                Some(serde_json::json!({ "name": name })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create project failed: {}", body);

        body["id"].as_str().unwrap().to_string()
    }
}
