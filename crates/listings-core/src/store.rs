//! Document store contracts (spec §6).
//!
//! The document store driver itself is out of this pipeline's scope (spec
//! §1) — this module owns the *contract* the rest of the pipeline depends
//! on (one collection per sku in a `listings` database, a single `users`
//! collection), plus a production implementation on the `mongodb` driver
//! and an in-memory fake for tests.

use async_trait::async_trait;
use dashmap::DashMap;
use mongodb::bson::doc;
use mongodb::{Client, Collection};

use crate::error::ListingsError;
use crate::types::{Listing, UserDoc};

/// Per-sku listing storage: one collection per sku, `_id` = canonical
/// listing id (spec §6).
#[async_trait]
pub trait ListingsStore: Send + Sync {
    /// All sku collection names currently present — backs the item cache
    /// refresh (spec §4.6) and the refresher's item enumeration (spec §4.5).
    async fn get_collections(&self) -> Result<Vec<String>, ListingsError>;

    /// Fetch all listings stored for a sku.
    async fn get(&self, sku: &str) -> Result<Vec<Listing>, ListingsError>;

    /// Upsert one listing by id (spec §3 "re-insertion overwrites").
    async fn upsert(&self, sku: &str, listing: &Listing) -> Result<(), ListingsError>;

    /// Remove one listing by id.
    async fn delete(&self, sku: &str, id: &str) -> Result<(), ListingsError>;

    /// Remove every listing for a sku (used by the snapshot fetcher's
    /// delete-all-then-insert replacement, spec §4.3).
    async fn delete_all(&self, sku: &str) -> Result<(), ListingsError>;

    /// Bulk-insert a freshly fetched snapshot (spec §4.3).
    async fn insert_many(&self, sku: &str, listings: &[Listing]) -> Result<(), ListingsError>;
}

/// Single `users` collection, keyed by steam id (spec §6).
#[async_trait]
pub trait UsersStore: Send + Sync {
    async fn upsert(&self, user: &UserDoc) -> Result<(), ListingsError>;
    async fn get(&self, steam_id: &str) -> Result<Option<UserDoc>, ListingsError>;
    /// Drop the whole collection — called at startup when user-data saving
    /// is disabled (spec §6).
    async fn drop(&self) -> Result<(), ListingsError>;
}

// ---------------------------------------------------------------------------
// Mongo-backed production implementation
// ---------------------------------------------------------------------------

/// `ListingsStore` backed by the `mongodb` driver: database `listings`, one
/// collection per sku.
pub struct MongoStore {
    client: Client,
}

impl MongoStore {
    pub async fn connect(uri: &str) -> Result<Self, ListingsError> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| ListingsError::Store(format!("mongo connect failed: {e}")))?;
        Ok(Self { client })
    }

    fn collection(&self, sku: &str) -> Collection<Listing> {
        self.client.database("listings").collection(sku)
    }
}

#[async_trait]
impl ListingsStore for MongoStore {
    async fn get_collections(&self) -> Result<Vec<String>, ListingsError> {
        self.client
            .database("listings")
            .list_collection_names()
            .await
            .map_err(|e| ListingsError::Store(format!("list_collection_names failed: {e}")))
    }

    async fn get(&self, sku: &str) -> Result<Vec<Listing>, ListingsError> {
        use futures_util::TryStreamExt;
        let cursor = self
            .collection(sku)
            .find(doc! {})
            .await
            .map_err(|e| ListingsError::Store(format!("find failed: {e}")))?;
        cursor.try_collect().await.map_err(|e| ListingsError::Store(format!("cursor read failed: {e}")))
    }

    async fn upsert(&self, sku: &str, listing: &Listing) -> Result<(), ListingsError> {
        let options = mongodb::options::ReplaceOptions::builder().upsert(true).build();
        self.collection(sku)
            .replace_one(doc! {"_id": &listing.id}, listing)
            .with_options(options)
            .await
            .map_err(|e| ListingsError::Store(format!("upsert failed: {e}")))?;
        Ok(())
    }

    async fn delete(&self, sku: &str, id: &str) -> Result<(), ListingsError> {
        self.collection(sku)
            .delete_one(doc! {"_id": id})
            .await
            .map_err(|e| ListingsError::Store(format!("delete failed: {e}")))?;
        Ok(())
    }

    async fn delete_all(&self, sku: &str) -> Result<(), ListingsError> {
        self.collection(sku)
            .delete_many(doc! {})
            .await
            .map_err(|e| ListingsError::Store(format!("delete_all failed: {e}")))?;
        Ok(())
    }

    async fn insert_many(&self, sku: &str, listings: &[Listing]) -> Result<(), ListingsError> {
        if listings.is_empty() {
            return Ok(());
        }
        self.collection(sku)
            .insert_many(listings)
            .await
            .map_err(|e| ListingsError::Store(format!("insert_many failed: {e}")))?;
        Ok(())
    }
}

/// `UsersStore` backed by the `mongodb` driver: database `users`,
/// collection `users`.
pub struct MongoUsersStore {
    collection: Collection<UserDoc>,
}

impl MongoUsersStore {
    pub fn new(client: &Client) -> Self {
        Self { collection: client.database("users").collection("users") }
    }
}

#[async_trait]
impl UsersStore for MongoUsersStore {
    async fn upsert(&self, user: &UserDoc) -> Result<(), ListingsError> {
        let options = mongodb::options::ReplaceOptions::builder().upsert(true).build();
        self.collection
            .replace_one(doc! {"_id": &user.id}, user)
            .with_options(options)
            .await
            .map_err(|e| ListingsError::Store(format!("user upsert failed: {e}")))?;
        Ok(())
    }

    async fn get(&self, steam_id: &str) -> Result<Option<UserDoc>, ListingsError> {
        self.collection
            .find_one(doc! {"_id": steam_id})
            .await
            .map_err(|e| ListingsError::Store(format!("user get failed: {e}")))
    }

    async fn drop(&self) -> Result<(), ListingsError> {
        self.collection
            .drop()
            .await
            .map_err(|e| ListingsError::Store(format!("user collection drop failed: {e}")))
    }
}

// ---------------------------------------------------------------------------
// In-memory fake, for unit tests across all three service crates
// ---------------------------------------------------------------------------

/// In-memory `ListingsStore`, keyed `sku -> (listing id -> Listing)`.
#[derive(Default)]
pub struct InMemoryStore {
    collections: DashMap<String, DashMap<String, Listing>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ListingsStore for InMemoryStore {
    async fn get_collections(&self) -> Result<Vec<String>, ListingsError> {
        Ok(self.collections.iter().map(|e| e.key().clone()).collect())
    }

    async fn get(&self, sku: &str) -> Result<Vec<Listing>, ListingsError> {
        Ok(self
            .collections
            .get(sku)
            .map(|coll| coll.iter().map(|e| e.value().clone()).collect())
            .unwrap_or_default())
    }

    async fn upsert(&self, sku: &str, listing: &Listing) -> Result<(), ListingsError> {
        self.collections.entry(sku.to_string()).or_default().insert(listing.id.clone(), listing.clone());
        Ok(())
    }

    async fn delete(&self, sku: &str, id: &str) -> Result<(), ListingsError> {
        if let Some(coll) = self.collections.get(sku) {
            coll.remove(id);
        }
        Ok(())
    }

    async fn delete_all(&self, sku: &str) -> Result<(), ListingsError> {
        self.collections.remove(sku);
        Ok(())
    }

    async fn insert_many(&self, sku: &str, listings: &[Listing]) -> Result<(), ListingsError> {
        let coll = self.collections.entry(sku.to_string()).or_default();
        for listing in listings {
            coll.insert(listing.id.clone(), listing.clone());
        }
        Ok(())
    }
}

/// In-memory `UsersStore`.
#[derive(Default)]
pub struct InMemoryUsersStore {
    users: DashMap<String, UserDoc>,
}

impl InMemoryUsersStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsersStore for InMemoryUsersStore {
    async fn upsert(&self, user: &UserDoc) -> Result<(), ListingsError> {
        self.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get(&self, steam_id: &str) -> Result<Option<UserDoc>, ListingsError> {
        Ok(self.users.get(steam_id).map(|e| e.value().clone()))
    }

    async fn drop(&self) -> Result<(), ListingsError> {
        self.users.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Currencies, Intent};

    fn sample_listing(id: &str, sku: &str) -> Listing {
        Listing {
            id: id.to_string(),
            sku: sku.to_string(),
            name: "Test Item".to_string(),
            intent: Intent::Sell,
            steam_id: "76561198000000001".to_string(),
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
    async fn upsert_overwrites_by_id() {
        let store = InMemoryStore::new();
        let mut listing = sample_listing("L1", "5021;6");
        store.upsert("5021;6", &listing).await.unwrap();
        listing.details = "updated".to_string();
        store.upsert("5021;6", &listing).await.unwrap();

        let stored = store.get("5021;6").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].details, "updated");
    }

    #[tokio::test]
    async fn delete_all_then_insert_replaces_collection() {
        let store = InMemoryStore::new();
        store.upsert("5021;6", &sample_listing("L1", "5021;6")).await.unwrap();
        store.delete_all("5021;6").await.unwrap();
        store.insert_many("5021;6", &[sample_listing("L2", "5021;6")]).await.unwrap();

        let stored = store.get("5021;6").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, "L2");
    }

    #[tokio::test]
    async fn get_collections_reflects_known_skus() {
        let store = InMemoryStore::new();
        store.upsert("5021;6", &sample_listing("L1", "5021;6")).await.unwrap();
        store.upsert("30469;11", &sample_listing("L2", "30469;11")).await.unwrap();

        let mut collections = store.get_collections().await.unwrap();
        collections.sort();
        assert_eq!(collections, vec!["30469;11".to_string(), "5021;6".to_string()]);
    }
}
