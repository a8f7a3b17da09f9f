//! Background sync schedule.
//!
//! Runs one sync shortly after startup and then once an hour. Each
//! scheduled run retries transient failures with doubling delays; a
//! run already in flight (manual or scheduled) makes the tick a no-op.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use bondboard_core::ingest::{SyncOrchestrator, SyncReport};
use bondboard_core::OrchestrationError;

use crate::state::AppState;

const INITIAL_DELAY_SECS: u64 = 60;
const SYNC_INTERVAL_SECS: u64 = 3600;
const MAX_RETRIES: u32 = 3;

pub fn start_sync_scheduler(state: Arc<AppState>) {
    tokio::spawn(async move {
        info!(
            "sync scheduler started, first run in {}s, interval {}s",
            INITIAL_DELAY_SECS, SYNC_INTERVAL_SECS
        );
        tokio::time::sleep(Duration::from_secs(INITIAL_DELAY_SECS)).await;

        let mut ticker = tokio::time::interval(Duration::from_secs(SYNC_INTERVAL_SECS));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            run_scheduled_sync(&state).await;
        }
    });
}

async fn run_scheduled_sync(state: &AppState) {
    let Ok(_guard) = state.sync_lock.try_lock() else {
        warn!("scheduled sync skipped, another sync is already running");
        return;
    };

    match run_with_retry(&state.orchestrator).await {
        Ok(report) => info!("scheduled sync finished: {}", report.summary()),
        Err(e) => error!("scheduled sync gave up after {} retries: {e}", MAX_RETRIES),
    }
}

/// Retries a failed run up to `MAX_RETRIES` times, waiting 1, 2 and
/// then 4 minutes between attempts.
async fn run_with_retry(
    orchestrator: &SyncOrchestrator,
) -> Result<SyncReport, OrchestrationError> {
    let mut retries = 0u32;
    loop {
        match orchestrator.run_sync(None).await {
            Ok(report) => return Ok(report),
            Err(e) if retries < MAX_RETRIES => {
                let delay = Duration::from_secs(60 * 2u64.pow(retries));
                warn!(
                    "sync attempt {} failed ({e}), retrying in {}s",
                    retries + 1,
                    delay.as_secs()
                );
                tokio::time::sleep(delay).await;
                retries += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
