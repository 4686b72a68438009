//! Per-target polling: one task per target, started together and stopped
//! together through a shared cancellation token.

pub mod engine;
pub mod history;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::probes::{Prober, Target};
use crate::query::StatusQuery;
use crate::storage::HistoryStore;

pub use self::history::TargetHistory;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("no targets configured")]
    NoTargets,

    #[error("check interval must be greater than zero")]
    ZeroInterval,

    #[error("history capacity must be at least 1")]
    ZeroCapacity,

    #[error("history capacity {capacity} exceeds the maximum of {max}")]
    CapacityTooLarge { capacity: usize, max: usize },

    #[error("target '{url}' is configured more than once")]
    DuplicateTarget { url: String },

    #[error("check loop for '{url}' terminated abnormally: {reason}")]
    LoopFailed { url: String, reason: String },
}

/// Timing and retention shared by every target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    pub interval: Duration,
    pub history_capacity: usize,
}

impl MonitorSettings {
    pub const DEFAULT_HISTORY_CAPACITY: usize = 20;
    pub const MAX_HISTORY_CAPACITY: usize = 10_000;

    pub fn new(interval: Duration, history_capacity: usize) -> Self {
        Self {
            interval,
            history_capacity,
        }
    }

    fn validate(&self) -> Result<(), SchedulerError> {
        if self.interval.is_zero() {
            return Err(SchedulerError::ZeroInterval);
        }
        if self.history_capacity == 0 {
            return Err(SchedulerError::ZeroCapacity);
        }
        if self.history_capacity > Self::MAX_HISTORY_CAPACITY {
            return Err(SchedulerError::CapacityTooLarge {
                capacity: self.history_capacity,
                max: Self::MAX_HISTORY_CAPACITY,
            });
        }
        Ok(())
    }
}

/// Validate, build the history store and spawn one check loop per target.
///
/// Must be called from within a tokio runtime. Nothing is spawned if
/// validation fails.
pub fn start(
    targets: Vec<Target>,
    settings: MonitorSettings,
    prober: Arc<dyn Prober>,
) -> Result<MonitorHandle, SchedulerError> {
    settings.validate()?;
    if targets.is_empty() {
        return Err(SchedulerError::NoTargets);
    }

    {
        let mut seen = HashSet::new();
        for t in &targets {
            if !seen.insert(t.url()) {
                return Err(SchedulerError::DuplicateTarget {
                    url: t.url().to_string(),
                });
            }
        }
    }

    let store = Arc::new(HistoryStore::new(&targets, settings.history_capacity));
    let cancel = CancellationToken::new();

    info!(
        targets = targets.len(),
        interval = ?settings.interval,
        history_capacity = settings.history_capacity,
        "starting monitor"
    );

    let loops = targets
        .into_iter()
        .map(|target| {
            let url = target.url().to_string();
            let task = tokio::spawn(engine::run_target_loop(
                target,
                settings.interval,
                Arc::clone(&prober),
                Arc::clone(&store),
                cancel.child_token(),
            ));
            (url, task)
        })
        .collect();

    Ok(MonitorHandle {
        store,
        cancel,
        loops,
        settings,
    })
}

/// Owner of the running check loops. Dropping the handle cancels them without
/// waiting; call [`MonitorHandle::shutdown`] to wait for in-flight checks.
pub struct MonitorHandle {
    store: Arc<HistoryStore>,
    cancel: CancellationToken,
    loops: Vec<(String, JoinHandle<()>)>,
    settings: MonitorSettings,
}

impl MonitorHandle {
    /// Read-only view over the shared history store.
    pub fn query(&self) -> StatusQuery {
        StatusQuery::new(Arc::clone(&self.store))
    }

    pub fn settings(&self) -> MonitorSettings {
        self.settings
    }

    /// Token cancelled by [`MonitorHandle::shutdown`].
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Signal every loop to stop and wait until all have finished their
    /// in-flight check. Reports the first loop that panicked.
    pub async fn shutdown(mut self) -> Result<(), SchedulerError> {
        info!(loops = self.loops.len(), "shutting down monitor");
        self.cancel.cancel();

        let loops = std::mem::take(&mut self.loops);
        let (urls, tasks): (Vec<_>, Vec<_>) = loops.into_iter().unzip();
        let outcomes = join_all(tasks).await;

        let mut first_failure = None;
        for (url, outcome) in urls.into_iter().zip(outcomes) {
            if let Err(e) = outcome {
                error!(%url, error = %e, "check loop failed");
                first_failure.get_or_insert(SchedulerError::LoopFailed {
                    url,
                    reason: e.to_string(),
                });
            }
        }

        match first_failure {
            Some(err) => Err(err),
            None => {
                info!("monitor stopped");
                Ok(())
            }
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
