//! AINE - Institute management backend

use anyhow::Result;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aine::{
    api::{self, AppState},
    config::Config,
    db,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aine=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting AINE...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    let applied = db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed ({} applied)", applied);

    // Build application state
    let state = AppState::new(pool, &config);

    match state.user_service.purge_expired_sessions().await {
        Ok(0) => {}
        Ok(n) => tracing::info!("Removed {} expired sessions", n),
        Err(e) => tracing::warn!("Failed to purge expired sessions: {}", e),
    }
    if state.user_service.count_users().await? == 0 {
        tracing::info!("No accounts yet; create the first admin via POST /api/v1/auth/setup");
    }

    // Build router
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
