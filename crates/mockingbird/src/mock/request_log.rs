//! Bounded, most-recent-first request log.

use super::types::MockRequestLog;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Default number of retained entries
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// Fixed-capacity request log shared between request handlers.
///
/// Entries are inserted at the head; once the capacity is exceeded the oldest
/// entry (the tail) is evicted under the same lock.
pub struct RequestLog {
    entries: Mutex<VecDeque<Arc<MockRequestLog>>>,
    capacity: usize,
}

impl RequestLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity + 1)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert an entry at the head, evicting the oldest if over capacity
    pub fn push(&self, entry: Arc<MockRequestLog>) {
        let mut entries = self.entries.lock();
        entries.push_front(entry);
        if entries.len() > self.capacity {
            entries.pop_back();
        }
    }

    /// Snapshot of all entries, most recent first
    pub fn snapshot(&self) -> Vec<Arc<MockRequestLog>> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for RequestLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}
