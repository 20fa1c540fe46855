//! Import the JSON data files into the configured database
//!
//! Usage: `plankjes-migrate` (reads `config.yml` and `PLANKJES_*` overrides)

use anyhow::{Context, Result};
use std::path::Path;
use std::process::ExitCode;

use plankjes::{config::Config, db};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plankjes=info".into()),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Migration failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = Config::load_with_env(Path::new("config.yml"))?;

    let pool = db::create_pool(&config.database)
        .await
        .context("Failed to connect to database")?;
    db::migrations::run_migrations(&pool).await?;

    let report = db::import::import_json_data(&pool, &config.storage.data_dir).await?;
    tracing::info!(
        "Migration complete: {} artworks, {} orders, {} skipped",
        report.artworks,
        report.orders,
        report.skipped
    );
    Ok(())
}
