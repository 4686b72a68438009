//! Bounded per-target check history.

use std::collections::VecDeque;

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::probes::CheckResult;

/// Recent results for one target, oldest first. `latest` is always the back of
/// the ring, so the two can never disagree.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetHistory {
    label: Option<String>,
    capacity: usize,
    recent: VecDeque<CheckResult>,
}

impl TargetHistory {
    /// `capacity` must be non-zero; callers validate it before construction.
    pub fn new(label: Option<String>, capacity: usize) -> Self {
        debug_assert!(capacity > 0, "history capacity must be non-zero");
        Self {
            label,
            capacity,
            recent: VecDeque::new(),
        }
    }

    /// Append a result, evicting the oldest once full.
    pub fn push(&mut self, result: CheckResult) {
        while self.recent.len() >= self.capacity {
            self.recent.pop_front();
        }
        self.recent.push_back(result);
    }

    /// Most recent result, `None` until the first check completes.
    pub fn latest(&self) -> Option<&CheckResult> {
        self.recent.back()
    }

    pub fn recent(&self) -> impl ExactSizeIterator<Item = &CheckResult> + DoubleEndedIterator {
        self.recent.iter()
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl Serialize for TargetHistory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("TargetHistory", 4)?;
        s.serialize_field("label", &self.label)?;
        s.serialize_field("capacity", &self.capacity)?;
        s.serialize_field("latest", &self.latest())?;
        s.serialize_field("recent", &self.recent)?;
        s.end()
    }
}
