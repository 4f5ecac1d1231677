// Sweeper worker process. Any number of these may run against the same
// database; claiming is coordinated entirely by the storage layer.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use automations_core::engine::{AutomationEngine, RunSweeper, SweeperConfig};
use automations_core::kernel::{EngineKernel, ServiceHost};
use automations_core::Config;

mod collaborators;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;

    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .context("failed to run migrations")?;

    let kernel = Arc::new(EngineKernel::new(
        db_pool,
        Arc::new(collaborators::CrmSnapshotProvider::new()),
        Arc::new(collaborators::PlanEntitlements::new()),
        Arc::new(collaborators::LoggingSmsSender::new()),
        Arc::new(collaborators::LoggingEmailSender::new()),
        Arc::new(collaborators::LoggingTaskService::new()),
    ));

    let worker_id = config
        .worker_id
        .clone()
        .unwrap_or_else(|| format!("worker-{}", Uuid::new_v4()));
    info!(worker_id = %worker_id, "automation worker starting");

    let engine = Arc::new(AutomationEngine::with_worker_id(kernel, worker_id));
    let sweeper = RunSweeper::with_config(
        engine,
        SweeperConfig {
            batch_size: config.sweep_batch_size,
            poll_interval: config.sweep_interval,
        },
    );

    ServiceHost::new()
        .with_service(sweeper)
        .run_until_shutdown()
        .await
}
