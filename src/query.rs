//! Read-only status queries served to the HTTP layer.

use std::sync::Arc;

use crate::scheduler::TargetHistory;
use crate::storage::{HistoryStore, StatusSnapshot};

/// Cheap to clone; every clone reads the same store.
#[derive(Clone)]
pub struct StatusQuery {
    store: Arc<HistoryStore>,
}

impl StatusQuery {
    pub fn new(store: Arc<HistoryStore>) -> Self {
        Self { store }
    }

    /// Latest result plus recent history for every monitored url.
    pub async fn query_all(&self) -> StatusSnapshot {
        self.store.snapshot().await
    }

    /// History for one url; `None` when the url is not monitored.
    pub async fn query_one(&self, url: &str) -> Option<TargetHistory> {
        self.store.get(url).await
    }

    pub fn target_count(&self) -> usize {
        self.store.len()
    }

    pub fn history_capacity(&self) -> usize {
        self.store.capacity()
    }
}
