//! FleetOps daemon
//!
//! Long-running process that owns the database, the SSH executor, and the
//! sweep scheduler. Periodic sweeps keep server and service status in the
//! database aligned with what the hosts actually report.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use fleetops_core::{CommandExecutor, LogSink, Reconciler};
use fleetops_database::Database;
use fleetops_scheduler::{sweep_servers, sweep_services, Scheduler, SweepFuture};

mod config;

use config::Config;

/// FleetOps daemon
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fleetopsd=debug".into()),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Parse CLI args
    let args = Args::parse();

    // Load configuration
    let config = Config::load(args.config.as_deref())?;
    info!(database_url = %config.database_url, "Starting FleetOps daemon");

    // Open the database and run migrations
    let db = Arc::new(Database::new(&config.database_url).await?);

    // Build the SSH execution stack
    let executor = Arc::new(CommandExecutor::new(
        Duration::from_secs(config.connect_timeout_secs),
        Duration::from_secs(config.command_timeout_secs),
        Arc::new(LogSink),
    ));
    let reconciler = Arc::new(
        Reconciler::new(executor, config.concurrency)
            .with_liveness_command(config.liveness_command.clone()),
    );

    // Register sweeps
    let scheduler = Scheduler::new();

    let page_size = config.page_size;
    {
        let db = db.clone();
        let reconciler = reconciler.clone();
        scheduler
            .add_task("server-sweep", &config.server_sweep_cron, move |offset| {
                let db = db.clone();
                let reconciler = reconciler.clone();
                Box::pin(async move { sweep_servers(&db, &reconciler, page_size, offset).await })
                    as SweepFuture
            })
            .await?;
    }
    {
        let db = db.clone();
        let reconciler = reconciler.clone();
        scheduler
            .add_task("service-sweep", &config.service_sweep_cron, move |offset| {
                let db = db.clone();
                let reconciler = reconciler.clone();
                Box::pin(async move { sweep_services(&db, &reconciler, page_size, offset).await })
                    as SweepFuture
            })
            .await?;
    }

    info!("Starting scheduler");
    scheduler.start().await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    Ok(())
}
