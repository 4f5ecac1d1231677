//! Long-running service abstraction with cooperative shutdown.
//!
//! Services (like the run sweeper) implement [`Service`] and are driven by a
//! [`ServiceHost`], which owns the shared [`CancellationToken`] and waits for
//! all services to drain on shutdown.

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// A long-running background service.
#[async_trait::async_trait]
pub trait Service: Send + 'static {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    /// Run until completion or until `shutdown` is cancelled.
    async fn run(self: Box<Self>, shutdown: CancellationToken) -> Result<()>;
}

/// Hosts a set of services under one shutdown token.
pub struct ServiceHost {
    shutdown: CancellationToken,
    handles: Vec<(&'static str, JoinHandle<Result<()>>)>,
}

impl Default for ServiceHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceHost {
    pub fn new() -> Self {
        Self {
            shutdown: CancellationToken::new(),
            handles: Vec::new(),
        }
    }

    /// The token services observe for shutdown.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Spawn a service onto the runtime.
    pub fn with_service<S: Service>(mut self, service: S) -> Self {
        let name = service.name();
        let token = self.shutdown.clone();
        let handle = tokio::spawn(async move { Box::new(service).run(token).await });
        self.handles.push((name, handle));
        self
    }

    /// Run until ctrl-c, then cancel the token and wait for services to drain.
    pub async fn run_until_shutdown(self) -> Result<()> {
        tokio::signal::ctrl_c().await?;
        info!("shutdown signal received");
        self.stop().await
    }

    /// Cancel all services and wait for them to finish.
    pub async fn stop(self) -> Result<()> {
        self.shutdown.cancel();
        for (name, handle) in self.handles {
            match handle.await {
                Ok(Ok(())) => info!(service = name, "service stopped"),
                Ok(Err(e)) => error!(service = name, error = %e, "service exited with error"),
                Err(e) => error!(service = name, error = %e, "service task panicked"),
            }
        }
        Ok(())
    }
}
