//! Optional periodic reconciliation trigger.
//!
//! Runs as a background task calling [`Reconciler::reconcile`] on a fixed
//! interval. A failed run is logged and retried on the next tick.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::Reconciler;

/// Spawn the periodic sync task.
///
/// The first run happens one full `interval` after spawn, so startup is
/// never blocked on the warehouse.
#[must_use]
pub fn spawn_sync_task(
    reconciler: Reconciler,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("sync task shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    match reconciler.reconcile().await {
                        Ok(report) => info!(message = %report.message, "scheduled sync finished"),
                        Err(err) => error!(%err, "scheduled sync failed"),
                    }
                }
            }
        }
    })
}
