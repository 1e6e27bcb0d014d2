//! Periodic expiry sweep.
//!
//! The sweeper runs one sweep per tick on its own task. A sweep that outlasts
//! the interval causes the missed ticks to be skipped, so two sweeps never
//! overlap.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info};

use crate::engine::LifecycleEngine;

/// Default time between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for the [`ExpirySweeper`].
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// How often to scan for expired records (default: 60 seconds).
    pub interval: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// Retires expired records on a fixed interval until told to stop.
pub struct ExpirySweeper {
    engine: Arc<LifecycleEngine>,
    config: SweeperConfig,
    shutdown_rx: mpsc::Receiver<()>,
}

impl ExpirySweeper {
    /// Run the sweep loop until a shutdown signal arrives or every sender is
    /// dropped.
    pub async fn run(&mut self) {
        info!(interval = ?self.config.interval, "expiry sweeper starting");

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    info!("expiry sweeper received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    self.sweep_once().await;
                }
            }
        }

        info!("expiry sweeper stopped");
    }

    async fn sweep_once(&self) {
        match self.engine.sweep_expired().await {
            Ok(report) if report.retired > 0 || report.failed > 0 => {
                info!(
                    retired = report.retired,
                    failed = report.failed,
                    "expiry sweep complete"
                );
            }
            Ok(_) => debug!("expiry sweep found nothing to retire"),
            Err(e) => error!(error = %e, "expiry sweep failed"),
        }
    }
}

/// Builder for [`ExpirySweeper`].
#[derive(Default)]
pub struct ExpirySweeperBuilder {
    engine: Option<Arc<LifecycleEngine>>,
    config: SweeperConfig,
}

impl ExpirySweeperBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn engine(mut self, engine: Arc<LifecycleEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    #[must_use]
    pub fn config(mut self, config: SweeperConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the sweeper and the sender used to stop it.
    ///
    /// # Errors
    ///
    /// Fails if no engine was supplied or the interval is zero.
    pub fn build(self) -> Result<(ExpirySweeper, mpsc::Sender<()>), &'static str> {
        let engine = self.engine.ok_or("engine is required")?;
        if self.config.interval.is_zero() {
            return Err("sweep interval must be greater than zero");
        }
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        Ok((
            ExpirySweeper {
                engine,
                config: self.config,
                shutdown_rx,
            },
            shutdown_tx,
        ))
    }
}
