// src/manager.rs

//! Top-level supervision of all configured pairs.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{error, info};

use crate::config::Config;
use crate::domain::ConnectorPtr;
use crate::pair::PairCoordinator;
use crate::Result;

/// Instantiates one [`PairCoordinator`] per configured pair and owns
/// their collective lifecycle.
///
/// `start` launches every pair and returns; it never blocks on a pair's
/// steady-state operation. `stop` broadcasts termination and returns only
/// after every pair's tasks have acknowledged exit — callers never
/// observe a partially stopped manager.
pub struct CalibrationManager {
    config: Arc<Config>,
    connector: ConnectorPtr,
    pairs: Vec<PairCoordinator>,
}

impl CalibrationManager {
    pub fn new(config: Config, connector: ConnectorPtr) -> Self {
        Self {
            config: Arc::new(config),
            connector,
            pairs: Vec::new(),
        }
    }

    /// Launches one coordinator per configured pair.
    ///
    /// Individual pair failures (connect, subscribe) surface in logs
    /// only; an error here would mean orchestration itself failed.
    pub fn start(&mut self) -> Result<()> {
        info!(
            pairs = self.config.paired_devices.len(),
            "starting calibration manager"
        );

        for pair in &self.config.paired_devices {
            self.pairs
                .push(PairCoordinator::start(self.connector.clone(), &self.config.mqtt, pair));
        }

        Ok(())
    }

    /// Stops every pair concurrently and waits for all of them.
    pub async fn stop(&mut self) -> Result<()> {
        info!("stopping calibration manager");

        let mut shutdowns = JoinSet::new();
        for pair in self.pairs.drain(..) {
            shutdowns.spawn(pair.shutdown());
        }

        while let Some(result) = shutdowns.join_next().await {
            if let Err(err) = result {
                error!(%err, "pair shutdown panicked");
            }
        }

        info!("calibration manager stopped");
        Ok(())
    }
}
