//! Coalesced changed-item notifier (spec §3, §4.7).
//!
//! Single-writer (the dispatcher), drained by the `item-updates` HTTP
//! handler under exclusive access. Within any drain window each sku appears
//! at most once, regardless of how many raw events touched it.

use std::collections::HashSet;

use listings_core::types::ChangedItem;
use tokio::sync::Mutex;

#[derive(Default)]
pub struct UpdateNotifier {
    items: Mutex<HashSet<ChangedItem>>,
}

impl UpdateNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `sku` changed, coalescing within the current window
    /// (spec §4.2 step 6).
    pub async fn record(&self, item: ChangedItem) {
        self.items.lock().await.insert(item);
    }

    /// Drain and return everything accumulated since the last drain (spec
    /// §4.7 "returns and clears the list atomically").
    pub async fn drain(&self) -> Vec<ChangedItem> {
        let mut guard = self.items.lock().await;
        std::mem::take(&mut *guard).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drain_clears_and_coalesces() {
        let notifier = UpdateNotifier::new();
        let a = ChangedItem { sku: "5021;6".to_string(), name: "Key".to_string() };
        notifier.record(a.clone()).await;
        notifier.record(a.clone()).await;
        notifier.record(ChangedItem { sku: "378;6".to_string(), name: "Hat".to_string() }).await;

        let drained = notifier.drain().await;
        assert_eq!(drained.len(), 2);

        let second = notifier.drain().await;
        assert!(second.is_empty(), "item-updates drain must empty on second call");
    }
}
