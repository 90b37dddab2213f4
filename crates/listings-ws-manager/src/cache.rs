//! In-memory item cache (spec §4.6).
//!
//! Tracks which skus are "known" — a store collection exists for them, or
//! they were registered explicitly — so the dispatcher can skip events for
//! items nobody asked about. Read-mostly; refreshes rebuild the whole map
//! under exclusive access, last-writer-wins on concurrent rebuild (spec §5).

use std::collections::HashMap;
use std::sync::Arc;

use listings_core::schema::SchemaClient;
use listings_core::store::ListingsStore;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::info;

const STALE_AFTER_SECS: u64 = 1800;

struct Inner {
    last_update: Option<Instant>,
    items: HashMap<String, String>,
}

/// Known-item cache keyed by name -> sku.
pub struct ItemCache {
    inner: RwLock<Inner>,
    store: Arc<dyn ListingsStore>,
    schema: Arc<dyn SchemaClient>,
}

impl ItemCache {
    pub fn new(store: Arc<dyn ListingsStore>, schema: Arc<dyn SchemaClient>) -> Self {
        Self { inner: RwLock::new(Inner { last_update: None, items: HashMap::new() }), store, schema }
    }

    /// Refresh from the store's collection list if the cache is empty or
    /// stale (spec §4.6).
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

    /// Unconditional refresh: re-query the store for all known collections
    /// and rebuild the name->sku map.
    pub async fn refresh(&self) {
        let collections = match self.store.get_collections().await {
            Ok(c) => c,
            Err(err) => {
                tracing::warn!(%err, "item cache refresh failed to list collections");
                return;
            }
        };

        let mut items = HashMap::with_capacity(collections.len());
        for sku in collections {
            if let Some(name) = self.schema.name_from_sku(&sku) {
                items.insert(name, sku);
            }
        }

        let count = items.len();
        let mut guard = self.inner.write().await;
        guard.items = items;
        guard.last_update = Some(Instant::now());
        drop(guard);
        info!(count, "item cache refreshed");
    }

    /// Register a sku explicitly (spec §4.8 `POST /item`).
    pub async fn add_item(&self, sku: &str) {
        let mut guard = self.inner.write().await;
        guard.last_update.get_or_insert_with(Instant::now);
        if guard.items.values().any(|s| s == sku) {
            return;
        }
        if let Some(name) = self.schema.name_from_sku(sku) {
            guard.items.insert(name, sku.to_string());
        }
    }

    /// Resolve a display name to its cached sku, refreshing first if stale.
    pub async fn sku_from_name(&self, name: &str) -> Option<String> {
        self.refresh_if_stale().await;
        self.inner.read().await.items.get(name).cloned()
    }

    /// True if `name` is a known item, refreshing first if stale (spec §4.6
    /// `check_item_exists`).
    pub async fn check_item_exists(&self, name: &str) -> bool {
        self.sku_from_name(name).await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use listings_core::schema::StaticSchemaClient;
    use listings_core::store::InMemoryStore;
    use listings_core::types::{Currencies, Intent, Listing};

    fn listing(sku: &str) -> Listing {
        Listing {
            id: "L1".to_string(),
            sku: sku.to_string(),
            name: "Item".to_string(),
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
    async fn refresh_pulls_known_collections_through_schema() {
        let store = Arc::new(InMemoryStore::new());
        store.upsert("5021;6", &listing("5021;6")).await.unwrap();
        let schema = Arc::new(StaticSchemaClient::with_entries([(
            "Mann Co. Supply Crate Key".to_string(),
            "5021;6".to_string(),
        )]));

        let cache = ItemCache::new(store, schema);
        cache.refresh().await;
        assert!(cache.check_item_exists("Mann Co. Supply Crate Key").await);
        assert!(!cache.check_item_exists("Something Else").await);
    }

    #[tokio::test]
    async fn add_item_is_idempotent_for_known_sku() {
        let store = Arc::new(InMemoryStore::new());
        let schema = Arc::new(StaticSchemaClient::with_entries([(
            "Bill's Hat".to_string(),
            "378;6".to_string(),
        )]));
        let cache = ItemCache::new(store, schema);
        cache.add_item("378;6").await;
        cache.add_item("378;6").await;
        assert_eq!(cache.sku_from_name("Bill's Hat").await, Some("378;6".to_string()));
    }
}
