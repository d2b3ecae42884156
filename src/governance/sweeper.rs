//! Periodic deadline sweep.
//!
//! Resolves proposals whose deadline passed without further activity, so a
//! final status does not depend on a later vote or read.

use crate::governance::engine::GovernanceEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Handle to a running sweep task.
pub struct DeadlineSweeper {
    handle: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

impl DeadlineSweeper {
    /// Spawn the sweep loop on the current tokio runtime.
    pub fn spawn(engine: Arc<GovernanceEngine>, interval: Duration) -> Self {
        let (shutdown, mut stop) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            info!(interval_ms = interval.as_millis() as u64, "deadline sweeper started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match engine.evaluate_expired().await {
                            Ok(outcomes) => debug!(evaluated = outcomes.len(), "deadline sweep"),
                            Err(e) => warn!(error = %e, "deadline sweep failed"),
                        }
                    }
                    changed = stop.changed() => {
                        if changed.is_err() || *stop.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("deadline sweeper stopped");
        });

        Self { handle, shutdown }
    }

    /// Stop the loop and wait for the in-flight sweep to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "deadline sweeper task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
