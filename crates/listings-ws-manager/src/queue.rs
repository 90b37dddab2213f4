//! In-memory update queue (spec §3, §4.1, §4.2).
//!
//! Single-writer (the ingestor), single-reader (the dispatcher) FIFO of raw
//! inbound events awaiting transformation. Bounded only by memory; the
//! ingestor's adaptive sleep (spec §4.1) is the only backpressure mechanism —
//! this queue itself never drops or caps.

use std::collections::VecDeque;

use listings_core::types::RawEvent;
use tokio::sync::Mutex;

pub const BATCH_MAX: usize = 2000;

#[derive(Default)]
pub struct UpdateQueue {
    inner: Mutex<VecDeque<RawEvent>>,
}

impl UpdateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append events in order (spec §4.1 "all elements are appended ... in order").
    pub async fn push_all(&self, events: Vec<RawEvent>) {
        let mut guard = self.inner.lock().await;
        guard.extend(events);
    }

    /// Current queue length, used for the ingestor's adaptive sleep.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    /// Pop up to `BATCH_MAX` items, FIFO order. The queue is not drained
    /// fully if it holds more than a batch (spec §4.2).
    pub async fn pop_batch(&self) -> Vec<RawEvent> {
        let mut guard = self.inner.lock().await;
        let n = guard.len().min(BATCH_MAX);
        guard.drain(..n).collect()
    }

    /// Drop every queued event for an item name — used by the refresher
    /// after a fresh snapshot makes queued deltas for that item stale (spec
    /// §4.5). The wire payload only ever carries `item.name`, never the
    /// sku directly, so the caller resolves sku -> name before purging.
    pub async fn purge_by_name(&self, item_name: &str) {
        let mut guard = self.inner.lock().await;
        guard.retain(|event| {
            event
                .payload
                .get("item")
                .and_then(|item| item.get("name"))
                .and_then(|v| v.as_str())
                .map(|n| n != item_name)
                .unwrap_or(true)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(name: &str) -> RawEvent {
        RawEvent {
            event: "listing-update".to_string(),
            payload: json!({"item": {"name": name}}),
        }
    }

    #[tokio::test]
    async fn push_and_pop_preserve_fifo_order() {
        let queue = UpdateQueue::new();
        queue.push_all(vec![event("a"), event("b"), event("c")]).await;
        let batch = queue.pop_batch().await;
        let names: Vec<_> =
            batch.iter().map(|e| e.payload["item"]["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn pop_batch_caps_at_batch_max() {
        let queue = UpdateQueue::new();
        queue.push_all((0..BATCH_MAX + 50).map(|_| event("x")).collect()).await;
        let batch = queue.pop_batch().await;
        assert_eq!(batch.len(), BATCH_MAX);
        assert_eq!(queue.len().await, 50);
    }

    #[tokio::test]
    async fn purge_by_name_drops_only_matching_events() {
        let queue = UpdateQueue::new();
        queue.push_all(vec![event("a"), event("b"), event("a")]).await;
        queue.purge_by_name("a").await;
        let remaining = queue.pop_batch().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].payload["item"]["name"], "b");
    }
}
