//! # The dispatcher host.
//!
//! One [`Dispatcher`] owns a set of registered suppliers and runs each on its
//! own spawned activity:
//!
//! ```text
//! Dispatcher::run()
//!   ├─► spawn run_supplier(source₁, child token)
//!   ├─► spawn run_supplier(source₂, child token)
//!   ├─► …
//!   └─► wait for SIGINT/SIGTERM/SIGQUIT
//!         └─► cancel root token ──► join all, bounded by `grace`
//! ```
//!
//! ## Rules
//! - Every supplier gets a child of one root token; cancelling the root
//!   reaches all of them.
//! - Shutdown waits at most `Config::grace` for the suppliers to unwind;
//!   exceeding it is a Critical failure naming the stuck duration.

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::error::FlumeError;
use crate::policies::RetryPolicy;
use crate::suppliers::{run_supplier, TaskSource};

/// Hosts a set of suppliers and drives them until shutdown.
pub struct Dispatcher {
    cfg: Config,
    sources: Vec<Arc<dyn TaskSource>>,
}

impl Dispatcher {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            sources: Vec::new(),
        }
    }

    /// Registers a supplier; it starts when [`Dispatcher::run`] is called.
    pub fn register(&mut self, source: Arc<dyn TaskSource>) -> &mut Self {
        self.sources.push(source);
        self
    }

    /// Runs all registered suppliers until an OS termination signal arrives,
    /// then shuts down gracefully.
    pub async fn run(self) -> Result<(), FlumeError> {
        let token = CancellationToken::new();
        let signal_token = token.clone();
        tokio::spawn(async move {
            if wait_for_shutdown_signal().await.is_ok() {
                info!("shutdown signal received");
            }
            signal_token.cancel();
        });
        self.run_until(token).await
    }

    /// Runs all registered suppliers until `token` is cancelled.
    ///
    /// Exposed separately so embedders and tests control the lifetime without
    /// involving OS signals.
    pub async fn run_until(mut self, token: CancellationToken) -> Result<(), FlumeError> {
        let policy = RetryPolicy::from_config(&self.cfg);
        let mut set = JoinSet::new();

        for source in self.sources.drain(..) {
            let child = token.child_token();
            set.spawn(async move {
                run_supplier(source.as_ref(), policy, child).await;
            });
        }
        info!(suppliers = set.len(), "dispatcher started");

        tokio::select! {
            _ = token.cancelled() => {
                self.join_with_grace(&mut set).await
            }
            _ = async { while set.join_next().await.is_some() {} } => {
                info!("all suppliers finished");
                Ok(())
            }
        }
    }

    async fn join_with_grace(&self, set: &mut JoinSet<()>) -> Result<(), FlumeError> {
        let grace = self.cfg.grace;
        let done = async {
            while set.join_next().await.is_some() {}
        };
        match tokio::time::timeout(grace, done).await {
            Ok(()) => {
                info!("dispatcher stopped");
                Ok(())
            }
            Err(_) => Err(FlumeError::critical(format!(
                "suppliers still running after {grace:?} grace period"
            ))),
        }
    }
}

/// Completes when the process receives a termination signal.
///
/// On Unix: SIGINT, SIGTERM, or SIGQUIT (with `ctrl_c` as fallback).
/// Elsewhere: `ctrl_c` only.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
