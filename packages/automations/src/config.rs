use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

/// Worker configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// How many due runs a single sweep claims at once
    pub sweep_batch_size: i64,
    /// How long the sweeper sleeps between passes when nothing is due
    pub sweep_interval: Duration,
    /// Worker instance identifier (defaults to a generated one)
    pub worker_id: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let sweep_batch_size = env::var("SWEEP_BATCH_SIZE")
            .unwrap_or_else(|_| "25".to_string())
            .parse()
            .context("SWEEP_BATCH_SIZE must be a valid number")?;

        let sweep_interval_secs: u64 = env::var("SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|_| "15".to_string())
            .parse()
            .context("SWEEP_INTERVAL_SECS must be a valid number")?;

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            sweep_batch_size,
            sweep_interval: Duration::from_secs(sweep_interval_secs),
            worker_id: env::var("WORKER_ID").ok(),
        })
    }
}
