// Main entry point for the matching server
//
// Runs migrations, then fires a matching round on MATCH_SCHEDULE until Ctrl-C.

use std::sync::Arc;

use anyhow::{Context, Result};
use pairing_core::domains::matching::RoundRunner;
use pairing_core::kernel::{start_scheduler, ServerDeps};
use pairing_core::Config;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pairing_core=debug,sqlx=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting pairing server");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        "Configuration loaded (schedule '{}', window {} days, recency lookup {})",
        config.match_schedule,
        config.matching.recency_window_days,
        config.matching.recency_policy
    );

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    let runner = Arc::new(RoundRunner::new(
        ServerDeps::postgres(pool.clone()),
        config.matching.clone(),
    ));

    let mut scheduler = start_scheduler(runner, &config.match_schedule)
        .await
        .context("Failed to start scheduler")?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    tracing::info!("Shutting down");
    scheduler
        .shutdown()
        .await
        .context("Failed to stop scheduler")?;
    pool.close().await;

    Ok(())
}
