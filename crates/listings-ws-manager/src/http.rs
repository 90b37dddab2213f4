//! HTTP surface (spec §4.8): item registration, queue purge, and the
//! polled `item-updates` drain that Listings-Service's broadcaster reads.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use listings_core::schema::SchemaClient;
use listings_core::types::ChangedItem;
use serde::{Deserialize, Serialize};

use crate::cache::ItemCache;
use crate::notifier::UpdateNotifier;
use crate::queue::UpdateQueue;

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<ItemCache>,
    pub queue: Arc<UpdateQueue>,
    pub notifier: Arc<UpdateNotifier>,
    pub schema: Arc<dyn SchemaClient>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/item", post(register_item))
        .route("/queue", delete(purge_queue))
        .route("/item-updates", get(item_updates))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

#[derive(Deserialize)]
struct ItemRequest {
    item_sku: String,
}

#[derive(Serialize)]
struct Ack {
    ack: bool,
}

async fn register_item(State(state): State<AppState>, Json(req): Json<ItemRequest>) -> Json<Ack> {
    state.cache.add_item(&req.item_sku).await;
    Json(Ack { ack: true })
}

async fn purge_queue(State(state): State<AppState>, Json(req): Json<ItemRequest>) -> Json<Ack> {
    if let Some(name) = state.schema.name_from_sku(&req.item_sku) {
        state.queue.purge_by_name(&name).await;
    }
    Json(Ack { ack: true })
}

async fn item_updates(State(state): State<AppState>) -> Json<Vec<ChangedItem>> {
    Json(state.notifier.drain().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use listings_core::schema::StaticSchemaClient;
    use listings_core::store::InMemoryStore;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let schema = Arc::new(StaticSchemaClient::with_entries([(
            "Mann Co. Supply Crate Key".to_string(),
            "5021;6".to_string(),
        )]));
        let store = Arc::new(InMemoryStore::new());
        AppState {
            cache: Arc::new(ItemCache::new(store, schema.clone())),
            queue: Arc::new(UpdateQueue::new()),
            notifier: Arc::new(UpdateNotifier::new()),
            schema,
        }
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn item_updates_drains_empty_when_nothing_changed() {
        let app = router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/item-updates").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let items: Vec<ChangedItem> = serde_json::from_slice(&bytes).unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn register_item_adds_to_cache() {
        let state = test_state();
        let app = router(state.clone());
        let body = serde_json::to_vec(&serde_json::json!({"item_sku": "5021;6"})).unwrap();
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/item")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.cache.check_item_exists("Mann Co. Supply Crate Key").await);
    }
}
