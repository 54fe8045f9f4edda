//! hitcount - hit log maintenance service
//!
//! Connects to the hit count database and purges expired hits on a schedule
//! until it receives SIGINT or SIGTERM.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hitcount::clock::SystemClock;
use hitcount::db;
use hitcount::hits::HitStore;
use hitcount::jobs::{JobScheduler, JobSchedulerConfig};
use hitcount::store::PgHitBackend;
use hitcount::Config;

/// Initialize tracing/logging
///
/// Production logs are emitted as JSON lines.
fn init_tracing() {
    let json = std::env::var("ENVIRONMENT").is_ok_and(|env| env == "production");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hitcount=debug".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    let config = Config::from_env()?;

    tracing::info!(environment = %config.environment, "Starting hitcount");
    tracing::info!("Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    db::verify_connection(&pool).await?;
    if !db::check_schema(&pool).await? {
        tracing::error!("Database schema is not complete. Please create the hitcount tables.");
        return Err(anyhow::anyhow!("Database schema incomplete"));
    }

    tracing::info!("Database connected successfully");

    if config.hit_retention.is_none() {
        tracing::info!("HITCOUNT_HIT_RETENTION is not set, nothing to purge");
        pool.close().await;
        return Ok(());
    }

    let hits = HitStore::new(
        Arc::new(PgHitBackend::new(pool.clone())),
        Arc::new(SystemClock::new()),
    );
    let scheduler = JobScheduler::with_config(hits, JobSchedulerConfig::from(&config)).start();

    shutdown_signal().await?;

    tracing::info!("Shutting down...");
    scheduler.abort();
    pool.close().await;
    tracing::info!("Database connections closed. Goodbye!");

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() -> std::io::Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

        tokio::select! {
            result = ctrl_c => {
                result?;
                tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
            },
            _ = terminate.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown...");
            },
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await?;
        tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
    }

    Ok(())
}
