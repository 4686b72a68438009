//! pingboard -- periodic URL health checks with bounded in-memory history.
//!
//! One check loop runs per configured URL. Results land in a fixed-capacity
//! ring per URL, and the latest status plus recent history is served over a
//! small JSON API.

pub mod api;
pub mod config;
pub mod probes;
pub mod query;
pub mod scheduler;
pub mod storage;

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::PingboardConfig;
use crate::probes::HttpProber;
use crate::scheduler::SchedulerError;

/// Run the monitor and the status API until `shutdown` resolves, then drain
/// the API server and stop every check loop.
pub async fn serve<F>(config: PingboardConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let targets = config.targets()?;
    let settings = config.settings()?;
    let timeout = config.probe_timeout()?;
    let addr = config.listen_address()?;

    // 1. Prober
    let prober = HttpProber::new(timeout).context("failed to build HTTP client")?;
    tracing::info!(?timeout, "HTTP prober ready");

    // 2. Check loops
    let monitor = scheduler::start(targets, settings, Arc::new(prober))?;

    // 3. API server
    let app = api::router(api::state::AppState::new(monitor.query()));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(%addr, "pingboard listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("API server failed");

    // Stop the loops even if the server errored.
    let stopped = monitor.shutdown().await;
    combine_outcomes(served, stopped)
}

/// Merge the API server and monitor shutdown outcomes so neither error is lost.
fn combine_outcomes(served: Result<()>, stopped: Result<(), SchedulerError>) -> Result<()> {
    match (served, stopped) {
        (Ok(()), Ok(())) => Ok(()),
        (Err(e), Ok(())) => Err(e),
        (Ok(()), Err(stop)) => Err(stop.into()),
        (Err(e), Err(stop)) => Err(e.context(format!("monitor shutdown also failed: {}", stop))),
    }
}
