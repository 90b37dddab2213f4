//! HTTP surface (spec §4.8): on-demand snapshot fetch for Listings-Service.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use listings_core::error::ListingsError;
use listings_core::types::Listing;
use serde::Deserialize;

use crate::rest_client::RestClient;
use crate::ws_manager_client::WsManagerClient;

#[derive(Clone)]
pub struct AppState {
    pub rest: Arc<RestClient>,
    pub ws_manager: Arc<WsManagerClient>,
}

pub fn router(state: AppState) -> Router {
    Router::new().route("/health", get(health)).route("/listings", get(get_listings)).with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

#[derive(Deserialize)]
struct ListingsQuery {
    item_sku: String,
}

async fn get_listings(
    State(state): State<AppState>,
    Query(query): Query<ListingsQuery>,
) -> Result<Json<Vec<Listing>>, StatusCode> {
    match state.rest.get_listings(&query.item_sku).await {
        Ok(listings) if !listings.is_empty() => {
            state.ws_manager.add_item_to_cache(&query.item_sku).await;
            Ok(Json(listings))
        }
        Ok(_) => Err(StatusCode::NOT_FOUND),
        Err(err @ (ListingsError::SnapshotUnavailable { .. } | ListingsError::Validation(_))) => {
            tracing::warn!(%err, sku = %query.item_sku, "listings-manager: fetch failed, reporting not found");
            Err(StatusCode::NOT_FOUND)
        }
        Err(err) => {
            tracing::error!(%err, sku = %query.item_sku, "listings-manager: fetch failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
