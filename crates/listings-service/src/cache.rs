//! Edge-side item cache (spec §4.6, §4.8).
//!
//! Unlike WS-Manager's name-keyed cache, Listings-Service only ever deals in
//! skus directly — clients query by sku, so the cache is a plain
//! refreshing set of known skus.

use std::collections::HashSet;
use std::sync::Arc;

use listings_core::store::ListingsStore;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::info;

const STALE_AFTER_SECS: u64 = 1800;

struct Inner {
    last_update: Option<Instant>,
    items: HashSet<String>,
}

pub struct EdgeCache {
    inner: RwLock<Inner>,
    store: Arc<dyn ListingsStore>,
}

impl EdgeCache {
    pub fn new(store: Arc<dyn ListingsStore>) -> Self {
        Self { inner: RwLock::new(Inner { last_update: None, items: HashSet::new() }), store }
    }

    async fn refresh_if_stale(&self) {
        let stale = {
            let guard = self.inner.read().await;
            match guard.last_update {
                None => true,
                Some(last) => last.elapsed().as_secs() > STALE_AFTER_SECS,
            }
        };
        if stale {
            self.refresh().await;
        }
    }

    pub async fn refresh(&self) {
        let collections = match self.store.get_collections().await {
            Ok(c) => c,
            Err(err) => {
                tracing::warn!(%err, "edge cache refresh failed to list collections");
                return;
            }
        };
        let count = collections.len();
        let mut guard = self.inner.write().await;
        guard.items = collections.into_iter().collect();
        guard.last_update = Some(Instant::now());
        drop(guard);
        info!(count, "edge cache refreshed");
    }

    pub async fn add_item(&self, sku: &str) {
        let mut guard = self.inner.write().await;
        guard.items.insert(sku.to_string());
        guard.last_update.get_or_insert_with(Instant::now);
    }

    pub async fn remove_item(&self, sku: &str) {
        self.inner.write().await.items.remove(sku);
    }

    pub async fn check_item_exists(&self, sku: &str) -> bool {
        self.refresh_if_stale().await;
        self.inner.read().await.items.contains(sku)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use listings_core::store::InMemoryStore;
    use listings_core::types::{Currencies, Intent, Listing};

    fn listing() -> Listing {
        Listing {
            id: "L1".to_string(),
            sku: "5021;6".to_string(),
            name: "Key".to_string(),
            intent: Intent::Sell,
            steam_id: "1".to_string(),
            currencies: Currencies::default(),
            listed_at: 0,
            bump_at: 0,
            details: String::new(),
            user_agent: None,
            buyout_only: false,
            trade_offers_preferred: false,
            spells: None,
            paint: None,
            strange_parts: None,
            killstreaker: None,
            sheen: None,
        }
    }

    #[tokio::test]
    async fn refresh_reflects_store_collections() {
        let store = Arc::new(InMemoryStore::new());
        store.upsert("5021;6", &listing()).await.unwrap();
        let cache = EdgeCache::new(store);
        cache.refresh().await;
        assert!(cache.check_item_exists("5021;6").await);
        assert!(!cache.check_item_exists("9999;6").await);
    }

    #[tokio::test]
    async fn add_then_remove_item() {
        let store = Arc::new(InMemoryStore::new());
        let cache = EdgeCache::new(store);
        cache.add_item("378;6").await;
        assert!(cache.check_item_exists("378;6").await);
        cache.remove_item("378;6").await;
        assert!(!cache.check_item_exists("378;6").await);
    }
}
