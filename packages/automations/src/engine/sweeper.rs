//! Run sweeper service: the long-running worker loop.
//!
//! A pool of these (one per process, any number of processes) periodically
//! claims due runs and advances them. All coordination happens in the
//! database; the sweeper itself is stateless across iterations.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::engine::AutomationEngine;
use crate::kernel::Service;

#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Maximum runs claimed per pass
    pub batch_size: i64,
    /// Sleep between passes when nothing was due
    pub poll_interval: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            batch_size: 25,
            poll_interval: Duration::from_secs(15),
        }
    }
}

pub struct RunSweeper {
    engine: Arc<AutomationEngine>,
    config: SweeperConfig,
}

impl RunSweeper {
    pub fn new(engine: Arc<AutomationEngine>) -> Self {
        Self {
            engine,
            config: SweeperConfig::default(),
        }
    }

    pub fn with_config(engine: Arc<AutomationEngine>, config: SweeperConfig) -> Self {
        Self { engine, config }
    }
}

#[async_trait::async_trait]
impl Service for RunSweeper {
    fn name(&self) -> &'static str {
        "run-sweeper"
    }

    async fn run(self: Box<Self>, shutdown: CancellationToken) -> Result<()> {
        info!(
            batch_size = self.config.batch_size,
            "run sweeper starting"
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            match self.engine.sweep_due(self.config.batch_size).await {
                Ok(0) => {
                    // Nothing due; sleep until the next pass
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.config.poll_interval) => {}
                    }
                }
                Ok(advanced) => {
                    info!(advanced, "sweep pass finished");
                    // A full batch may mean more is due; loop immediately
                }
                Err(e) => {
                    // Batch aborted; leases expire and the next cycle resumes
                    error!(error = %e, "sweep pass failed");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                    }
                }
            }
        }

        info!("run sweeper stopped");
        Ok(())
    }
}
