//! The batch: parent ids collected during one render pass.

use crate::types::ParentId;
use std::collections::HashSet;

/// Freshness of the cached results relative to the batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PreloadState {
    /// No keys registered.
    #[default]
    Empty,
    /// Keys registered since the last successful preload.
    Dirty,
    /// Results cached for every registered key.
    Fresh,
}

/// Ordered, de-duplicated set of parent ids.
///
/// Keys keep their first-seen order, which only affects the order of the
/// ids handed to the store, never the results.
#[derive(Clone, Debug, Default)]
pub struct Batch {
    order: Vec<ParentId>,
    seen: HashSet<ParentId>,
}

impl Batch {
    /// Create an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key. Returns `true` if it was not already present.
    pub fn insert(&mut self, key: ParentId) -> bool {
        if !self.seen.insert(key) {
            return false;
        }
        self.order.push(key);
        true
    }

    /// Whether `key` is in the batch.
    #[must_use]
    pub fn contains(&self, key: ParentId) -> bool {
        self.seen.contains(&key)
    }

    /// Keys in first-seen order.
    #[must_use]
    pub fn keys(&self) -> &[ParentId] {
        &self.order
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the batch holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Remove every key.
    pub fn clear(&mut self) {
        self.order.clear();
        self.seen.clear();
    }
}
