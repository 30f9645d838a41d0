use anyhow::Context;
use clap::Parser;
use climate_core::config::{ClimateConfig, OBSERVER_QUEUE_CAPACITY};
use climate_core::{Settings, SettingsHandle};
use climate_scheduler::{IngestionScheduler, JobLedger, SchedulerError};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

mod app;
mod auth;
mod error;
mod http;
mod ingest;
mod ws;

#[derive(Parser)]
#[command(name = "climate-gateway", version, about = "Climate controller gateway")]
struct Cli {
    /// Path to climate.toml (overrides CLIMATE_CONFIG).
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "climate_gateway=info,climate_scheduler=info,tower_http=debug".into()
            }),
        )
        .init();

    // load config: --config > CLIMATE_CONFIG env > ~/.climate/climate.toml
    let cli = Cli::parse();
    let config_path = cli.config.or_else(|| std::env::var("CLIMATE_CONFIG").ok());
    let config = ClimateConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        ClimateConfig::default()
    });

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;

    // initialize SQLite database: single file for all subsystems
    let db_path = config.database.path.clone();
    ensure_parent_dir(&db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(&db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL;")?;

    // run all schema migrations (idempotent)
    climate_store::db::init_db(&db)?;
    climate_scheduler::db::init_db(&db)?;
    info!("database migrations complete");

    // settings singleton: anything other than exactly one record is fatal
    let settings_store = climate_store::SettingsStore::new(rusqlite::Connection::open(&db_path)?)?;
    let initial = settings_store
        .load_or_init(&Settings::default())
        .context("settings record integrity check failed")?;
    let settings = SettingsHandle::new(initial);

    // build subsystems: each gets its own connection for thread safety
    let readings = Arc::new(climate_store::ReadingStore::new(rusqlite::Connection::open(
        &db_path,
    )?)?);
    let fan_store = climate_store::FanStateStore::new(rusqlite::Connection::open(&db_path)?)?;
    let ledger = Arc::new(JobLedger::new(rusqlite::Connection::open(&db_path)?)?);

    let sensor = climate_sensors::build_sensor(&config.sensors, settings.clone())?;
    let fanout = Arc::new(ws::fanout::NotificationFanout::new(OBSERVER_QUEUE_CAPACITY));
    let fan = climate_fan::FanController::new(
        fan_store,
        climate_fan::actuator_from_config(&config.fan),
        settings.clone(),
    );

    let job = Arc::new(ingest::IngestionJob::new(
        sensor,
        Arc::clone(&readings),
        Arc::clone(&fanout),
    ));
    let scheduler = IngestionScheduler::new(job, Arc::clone(&ledger));
    start_scheduler(&scheduler, &settings).await?;

    let shutdown_timeout = Duration::from_secs(config.scheduler.shutdown_timeout_secs);
    let state = Arc::new(app::AppState::new(
        config,
        settings,
        settings_store,
        readings,
        fan,
        scheduler,
        ledger,
        fanout,
    ));
    let router = app::build_router(state.clone());

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("Climate gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // stop the trigger and let an in-flight ingestion finish
    if let Err(e) = state.scheduler.shutdown(shutdown_timeout).await {
        warn!(error = %e, "scheduler shutdown incomplete");
    }
    info!("Climate gateway stopped");
    Ok(())
}

/// Install the trigger from the stored poll expression. A stored expression
/// that no longer parses falls back to the default instead of blocking
/// startup.
async fn start_scheduler(
    scheduler: &IngestionScheduler,
    settings: &SettingsHandle,
) -> anyhow::Result<()> {
    let expression = settings.current().poll_interval_expression.clone();
    let next = match scheduler.schedule(&expression).await {
        Ok(next) => next,
        Err(SchedulerError::InvalidSchedule { reason, .. }) => {
            let fallback = climate_core::config::DEFAULT_POLL_INTERVAL;
            warn!(%expression, %reason, %fallback, "stored poll interval invalid, using default");
            scheduler.schedule(fallback).await?
        }
        Err(e) => return Err(e.into()),
    };
    info!(next_fire = ?next, "ingestion scheduled");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

/// Ensure the parent directory for a file path exists.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
