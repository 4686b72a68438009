use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::probes::{Prober, Target};
use crate::storage::HistoryStore;

/// Check loop for a single target.
///
/// The first tick fires immediately. Later ticks are `interval` apart measured
/// from the previous tick start; a check that overruns the interval is followed
/// straight away by the next one, and missed ticks are not replayed.
/// Cancellation is observed while waiting and right after each recorded check,
/// never in the middle of a probe.
pub async fn run_target_loop(
    target: Target,
    interval: Duration,
    prober: Arc<dyn Prober>,
    store: Arc<HistoryStore>,
    cancel: CancellationToken,
) {
    let url = target.url().to_string();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last_success: Option<bool> = None;
    let mut checks: u64 = 0;

    debug!(%url, ?interval, "check loop started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let result = prober.check(&target).await;
        checks += 1;

        debug!(
            %url,
            success = result.success,
            status = ?result.status_code,
            latency_ms = result.latency_ms,
            "check finished"
        );

        match (last_success, result.success) {
            (Some(was), now) if was != now => {
                warn!(%url, up = now, error = ?result.error, "target status changed");
            }
            (None, false) => {
                warn!(%url, status = ?result.status_code, error = ?result.error, "target down on first check");
            }
            _ => {}
        }
        last_success = Some(result.success);

        store.record(&url, result).await;
    }

    info!(%url, checks, "check loop stopped");
}
