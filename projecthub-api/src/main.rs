//! # ProjectHub API Server
//!
//! Serves authentication (register, login, refresh, logout) and
//! role-checked, audited project management over PostgreSQL.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p projecthub-api
//! ```

use projecthub_api::{
    app::{build_router, AppState},
    config::Config,
};
use projecthub_shared::{
    db::{migrations::run_migrations, pool},
    store::postgres::PgStore,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "projecthub_api=debug,projecthub_shared=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "ProjectHub API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;
    let bind_address = config.bind_address();

    let db = pool::create_pool(config.pool_config()).await?;
    run_migrations(&db).await?;

    let state = AppState::new(Arc::new(PgStore::new(db.clone())), config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool::close_pool(db).await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
