//! Plankjes - storefront and back office for the Zaanse Plankjes Maffia studio

use anyhow::Result;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use plankjes::{
    api::{self, AppState},
    config::Config,
    db::{self, DynDatabasePool},
};

/// Hourly removal of expired admin sessions
const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);
/// Rate limiter windows are pruned every 5 minutes
const LIMITER_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plankjes=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Plankjes server...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    if config.admin.uses_default_password() {
        tracing::warn!("Admin password is the default; set PLANKJES_ADMIN_PASSWORD");
    }

    let pool = connect_database(&config).await;
    let state = AppState::build(&config, pool)?;
    if !state.email_service.is_configured() {
        tracing::warn!("SMTP not configured, notification emails will not be sent");
    }

    // Start session cleanup task (runs every hour)
    {
        let auth = state.admin_auth.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                match auth.cleanup_expired_sessions().await {
                    Ok(0) => {}
                    Ok(n) => tracing::info!("Removed {} expired session(s)", n),
                    Err(e) => tracing::warn!("Session cleanup failed: {}", e),
                }
            }
        });
    }

    // Start rate limiter cleanup task (runs every 5 minutes)
    {
        let limiters = [state.api_limiter.clone(), state.form_limiter.clone()];
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(LIMITER_CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                for limiter in &limiters {
                    limiter.cleanup().await;
                }
            }
        });
    }

    // Build router
    let app = api::build_router(state, &config.server);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Open the database when enabled. Any failure leaves the server on JSON files.
async fn connect_database(config: &Config) -> Option<DynDatabasePool> {
    if !config.database.enabled {
        tracing::info!("Database disabled, using JSON files in {}", config.storage.data_dir.display());
        return None;
    }

    let pool = match db::create_pool(&config.database).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!("Database unavailable, falling back to JSON files: {:#}", e);
            return None;
        }
    };
    tracing::info!("Database connected: {:?}", config.database.driver);

    if let Err(e) = db::migrations::run_migrations(&pool).await {
        tracing::warn!("Database migrations failed, falling back to JSON files: {:#}", e);
        return None;
    }
    tracing::info!("Database migrations completed");

    Some(pool)
}
