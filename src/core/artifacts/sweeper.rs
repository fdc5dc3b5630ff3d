//! Periodic removal of expired artifacts.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::ArtifactStore;

/// Background task sweeping the artifact directory.
pub struct ArtifactSweeper;

impl ArtifactSweeper {
    /// Starts the sweep loop. The first pass runs immediately, then every
    /// `interval` until `shutdown` is cancelled.
    pub fn spawn(
        store: Arc<ArtifactStore>,
        ttl: Duration,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "Artifact sweeper started (ttl {:?}, interval {:?}) for {:?}",
                ttl,
                interval,
                store.dir()
            );
            let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("Artifact sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let report = store.sweep(ttl).await;
                        debug!("Artifact sweep: {}", report);
                    }
                }
            }
        })
    }
}
