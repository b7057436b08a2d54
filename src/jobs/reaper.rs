//! Background job: reap expired notifications.
//!
//! One long-lived task, started once at process initialization. The first
//! tick fires immediately so a long downtime does not leave a backlog
//! unreaped for a full interval. A failed cycle is logged and skipped; the
//! loop continues to the next tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::service::NotificationService;

/// Spawn the reaper task. `shutdown` stops scheduling further ticks; an
/// in-flight sweep is allowed to finish.
pub fn spawn(
    service: Arc<NotificationService>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match service.cleanup_expired().await {
                        Ok(0) => debug!("reap cycle found nothing expired"),
                        Ok(deleted) => info!(deleted, "reaped expired notifications"),
                        Err(e) => error!(error = %e, "reap cycle failed, skipping tick"),
                    }
                }
                _ = shutdown.changed() => {
                    info!("expiry reaper stopping");
                    break;
                }
            }
        }
    })
}
