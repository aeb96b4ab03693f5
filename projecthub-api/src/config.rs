/// Configuration management for the API server
///
/// Configuration is read from environment variables, with a `.env` file
/// loaded first when present.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `API_CORS_ORIGINS`: Comma-separated allowed origins (default: `*`)
/// - `API_PRODUCTION`: Enables HSTS (default: false)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_ACCESS_SECRET`: Access token signing secret (required)
/// - `JWT_REFRESH_SECRET`: Refresh token signing secret (required)
/// - `JWT_ACCESS_EXPIRES_IN`: Access token lifetime (default: 15m)
/// - `JWT_REFRESH_EXPIRES_IN`: Refresh token lifetime (default: 30d)
/// - `ARGON2_MEMORY_KIB`, `ARGON2_ITERATIONS`, `ARGON2_PARALLELISM`:
///   Password hashing cost (defaults: 65536, 3, 4)
/// - `RUST_LOG`: Log filter
///
/// # Example
///
/// ```no_run
/// use projecthub_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use projecthub_shared::{
    auth::{jwt::TokenClass, password::PasswordParams},
    db::pool::DatabaseConfig as PoolConfig,
    services::tokens::TokenConfig,
};
use std::env;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Password hashing cost
    pub password: PasswordParams,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Production mode (enables HSTS)
    pub production: bool,
}

/// Database configuration
#[derive(Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
///
/// Both secrets should be independent random values of at least 32 bytes,
/// e.g. `openssl rand -hex 32`.
#[derive(Clone)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_expires_in: String,
    pub refresh_expires_in: String,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("max_connections", &self.max_connections)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_expires_in", &self.access_expires_in)
            .field("refresh_expires_in", &self.refresh_expires_in)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing or empty
    /// - Numeric variables don't parse
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("{} environment variable is required", key))
        };

        let port = var_or("API_PORT", "8080")
            .parse::<u16>()
            .context("API_PORT must be a port number")?;

        let cors_origins = var_or("API_CORS_ORIGINS", "*")
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let production = var_or("API_PRODUCTION", "false")
            .parse::<bool>()
            .context("API_PRODUCTION must be true or false")?;

        let max_connections = var_or("DATABASE_MAX_CONNECTIONS", "10")
            .parse::<u32>()
            .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?;

        let defaults = PasswordParams::default();
        let password = PasswordParams {
            memory_kib: parse_or(&lookup, "ARGON2_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parse_or(&lookup, "ARGON2_ITERATIONS", defaults.iterations)?,
            parallelism: parse_or(&lookup, "ARGON2_PARALLELISM", defaults.parallelism)?,
        };

        Ok(Self {
            api: ApiConfig {
                host: var_or("API_HOST", "0.0.0.0"),
                port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                max_connections,
            },
            jwt: JwtConfig {
                access_secret: required("JWT_ACCESS_SECRET")?,
                refresh_secret: required("JWT_REFRESH_SECRET")?,
                access_expires_in: var_or("JWT_ACCESS_EXPIRES_IN", TokenClass::Access.default_expiry()),
                refresh_expires_in: var_or(
                    "JWT_REFRESH_EXPIRES_IN",
                    TokenClass::Refresh.default_expiry(),
                ),
            },
            password,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Token settings for the token service
    pub fn token_config(&self) -> TokenConfig {
        TokenConfig {
            access_secret: self.jwt.access_secret.clone(),
            refresh_secret: self.jwt.refresh_secret.clone(),
            access_expires_in: self.jwt.access_expires_in.clone(),
            refresh_expires_in: self.jwt.refresh_expires_in.clone(),
        }
    }

    /// Pool settings for the shared database layer
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::from_url(self.database.url.clone())
            .with_max_connections(self.database.max_connections)
    }
}

fn parse_or<F>(lookup: &F, key: &str, default: u32) -> anyhow::Result<u32>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<u32>()
            .with_context(|| format!("{} must be a positive integer", key)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("DATABASE_URL", "postgresql://localhost/projecthub"),
        ("JWT_ACCESS_SECRET", "access-secret"),
        ("JWT_REFRESH_SECRET", "refresh-secret"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.api.cors_origins, vec!["*".to_string()]);
        assert!(!config.api.production);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.jwt.access_expires_in, "15m");
        assert_eq!(config.jwt.refresh_expires_in, "30d");
        assert_eq!(config.password, PasswordParams::default());
    }

    #[test]
    fn test_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("API_HOST", "127.0.0.1"),
            ("API_PORT", "3000"),
            ("API_CORS_ORIGINS", "https://a.example, https://b.example"),
            ("API_PRODUCTION", "true"),
            ("JWT_ACCESS_EXPIRES_IN", "5m"),
            ("ARGON2_MEMORY_KIB", "1024"),
        ]);
        let config = Config::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:3000");
        assert_eq!(config.api.cors_origins.len(), 2);
        assert!(config.api.production);
        assert_eq!(config.token_config().access_expires_in, "5m");
        assert_eq!(config.password.memory_kib, 1024);
        assert_eq!(config.password.iterations, 3);
    }

    #[test]
    fn test_missing_secret_is_an_error() {
        let vars = [
            ("DATABASE_URL", "postgresql://localhost/projecthub"),
            ("JWT_ACCESS_SECRET", "access-secret"),
            ("JWT_REFRESH_SECRET", "   "),
        ];
        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert!(err.to_string().contains("JWT_REFRESH_SECRET"));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("access-secret"));
        assert!(!debug.contains("postgresql://"));
    }
}
