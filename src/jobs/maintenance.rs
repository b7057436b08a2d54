//! Background job: coarse-grained store maintenance.
//!
//! Each tick runs a sweep whose sub-steps are independent: expired
//! notifications (the same primitive the reaper uses), aged chat history,
//! aged usage logs, then a statistics snapshot. A failing sub-step is logged
//! and does not abort the remaining sub-steps.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::service::NotificationService;
use crate::store::RetentionStore;

/// Fixed retention windows for the collaborator stores.
pub const CHAT_HISTORY_RETENTION_DAYS: i64 = 180; // 6 months
pub const USAGE_LOG_RETENTION_DAYS: i64 = 90; // 3 months

const PRUNE_TIMEOUT: Duration = Duration::from_secs(30);

pub fn spawn(
    service: Arc<NotificationService>,
    retention: Arc<dyn RetentionStore>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => run_sweep(&service, retention.as_ref()).await,
                _ = shutdown.changed() => {
                    info!("maintenance scheduler stopping");
                    break;
                }
            }
        }
    })
}

/// One maintenance sweep. Public so on-demand administrative maintenance can
/// invoke exactly what the scheduler runs.
pub async fn run_sweep(service: &NotificationService, retention: &dyn RetentionStore) {
    match service.cleanup_expired().await {
        Ok(deleted) if deleted > 0 => info!(deleted, "maintenance: cleaned expired notifications"),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "maintenance: notification cleanup failed"),
    }

    let chat_cutoff = Utc::now() - chrono::Duration::days(CHAT_HISTORY_RETENTION_DAYS);
    match time::timeout(PRUNE_TIMEOUT, retention.prune_chat_history(chat_cutoff)).await {
        Ok(Ok(pruned)) if pruned > 0 => info!(pruned, "maintenance: pruned old chat messages"),
        Ok(Ok(_)) => {}
        Ok(Err(e)) => warn!(error = %e, "maintenance: chat history prune failed"),
        Err(_) => warn!("maintenance: chat history prune timed out"),
    }

    let usage_cutoff = Utc::now() - chrono::Duration::days(USAGE_LOG_RETENTION_DAYS);
    match time::timeout(PRUNE_TIMEOUT, retention.prune_usage_logs(usage_cutoff)).await {
        Ok(Ok(pruned)) if pruned > 0 => info!(pruned, "maintenance: pruned old usage logs"),
        Ok(Ok(_)) => {}
        Ok(Err(e)) => warn!(error = %e, "maintenance: usage log prune failed"),
        Err(_) => warn!("maintenance: usage log prune timed out"),
    }

    match service.stats().await {
        Ok(stats) => info!(
            total = stats.total,
            unread = stats.unread,
            active = stats.active,
            recent_24h = stats.recent_24h,
            "maintenance: statistics snapshot"
        ),
        Err(e) => error!(error = %e, "maintenance: statistics snapshot failed"),
    }
}
