//! In-memory history store shared by the per-target loops and the query side.
//!
//! The key set is fixed when the store is built, so the map itself is never
//! mutated and needs no lock. Each target's history sits behind its own
//! `tokio::sync::RwLock`: writers for different targets never contend, and a
//! reader sees either the whole of a `record` or none of it.

use std::collections::{BTreeMap, HashMap};

use tokio::sync::RwLock;
use tracing::error;

use crate::probes::{CheckResult, Target};
use crate::scheduler::history::TargetHistory;

/// Point-in-time copy of every target's history, keyed by url.
pub type StatusSnapshot = BTreeMap<String, TargetHistory>;

pub struct HistoryStore {
    entries: HashMap<String, RwLock<TargetHistory>>,
    capacity: usize,
}

impl HistoryStore {
    /// One empty history per target. Duplicate urls collapse to one entry;
    /// the scheduler rejects them before getting here.
    pub fn new(targets: &[Target], capacity: usize) -> Self {
        let entries = targets
            .iter()
            .map(|t| {
                (
                    t.url().to_string(),
                    RwLock::new(TargetHistory::new(t.label().map(str::to_string), capacity)),
                )
            })
            .collect();

        Self { entries, capacity }
    }

    /// Append a result for `url`, evicting the oldest if the ring is full.
    pub async fn record(&self, url: &str, result: CheckResult) {
        match self.entries.get(url) {
            Some(entry) => entry.write().await.push(result),
            None => error!(%url, "dropping result for unregistered target"),
        }
    }

    /// Copy of one target's history, or `None` if the url is not monitored.
    pub async fn get(&self, url: &str) -> Option<TargetHistory> {
        match self.entries.get(url) {
            Some(entry) => Some(entry.read().await.clone()),
            None => None,
        }
    }

    /// Copy of all histories. Each entry is read under its own lock.
    pub async fn snapshot(&self) -> StatusSnapshot {
        let mut snapshot = BTreeMap::new();
        for (url, entry) in &self.entries {
            snapshot.insert(url.clone(), entry.read().await.clone());
        }
        snapshot
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;

    fn targets(urls: &[&str]) -> Vec<Target> {
        urls.iter().map(|u| Target::parse(u, None).unwrap()).collect()
    }

    fn ok(latency_ms: f64) -> CheckResult {
        CheckResult::from_status(Utc::now(), 200, latency_ms)
    }

    #[tokio::test]
    async fn test_every_target_has_an_entry() {
        let store = HistoryStore::new(&targets(&["http://a.test/", "http://b.test/"]), 5);
        assert_eq!(store.len(), 2);

        let snap = store.snapshot().await;
        assert_eq!(snap.len(), 2);
        assert!(snap.values().all(|h| h.is_empty() && h.latest().is_none()));
    }

    #[tokio::test]
    async fn test_unknown_url_is_absent() {
        let store = HistoryStore::new(&targets(&["http://a.test/"]), 5);
        assert!(store.get("http://nope.test/").await.is_none());
        assert!(!store.contains("http://nope.test/"));
    }

    #[tokio::test]
    async fn test_record_for_unknown_url_is_dropped() {
        let store = HistoryStore::new(&targets(&["http://a.test/"]), 5);
        store.record("http://nope.test/", ok(1.0)).await;

        let snap = store.snapshot().await;
        assert_eq!(snap.len(), 1);
        assert!(snap["http://a.test/"].is_empty());
    }

    #[tokio::test]
    async fn test_record_respects_capacity() {
        let store = HistoryStore::new(&targets(&["http://a.test/"]), 3);
        for i in 0..10 {
            store.record("http://a.test/", ok(i as f64)).await;
        }

        let h = store.get("http://a.test/").await.unwrap();
        assert_eq!(h.len(), 3);
        assert_eq!(h.latest().unwrap().latency_ms, 9.0);
        let latencies: Vec<_> = h.recent().map(|r| r.latency_ms).collect();
        assert_eq!(latencies, vec![7.0, 8.0, 9.0]);
    }

    #[tokio::test]
    async fn test_snapshot_is_a_copy() {
        let store = HistoryStore::new(&targets(&["http://a.test/"]), 3);
        store.record("http://a.test/", ok(1.0)).await;
        let before = store.snapshot().await;

        store.record("http://a.test/", ok(2.0)).await;
        assert_eq!(before["http://a.test/"].len(), 1);
        assert_eq!(store.get("http://a.test/").await.unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_record_and_snapshot_never_tear() {
        let urls = ["http://a.test/", "http://b.test/", "http://c.test/"];
        let store = Arc::new(HistoryStore::new(&targets(&urls), 4));

        let mut writers = Vec::new();
        for url in urls {
            let store = Arc::clone(&store);
            writers.push(tokio::spawn(async move {
                for i in 0..500 {
                    store.record(url, ok(i as f64)).await;
                    tokio::task::yield_now().await;
                }
            }));
        }

        let reader = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for _ in 0..500 {
                    for history in store.snapshot().await.values() {
                        assert!(history.len() <= 4);
                        assert_eq!(history.latest(), history.recent().next_back());
                        // Within a target, results only ever move forward.
                        let latencies: Vec<_> = history.recent().map(|r| r.latency_ms).collect();
                        assert!(latencies.windows(2).all(|w| w[0] < w[1]));
                    }
                    tokio::task::yield_now().await;
                }
            })
        };

        for w in writers {
            w.await.unwrap();
        }
        reader.await.unwrap();

        for url in urls {
            let h = store.get(url).await.unwrap();
            assert_eq!(h.latest().unwrap().latency_ms, 499.0);
        }
    }
}
