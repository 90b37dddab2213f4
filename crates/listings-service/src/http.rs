//! Edge API (spec §4.8): the client-facing surface. Every route but
//! `/health` requires the configured bearer token.

use std::sync::Arc;

use axum::extract::{ws::WebSocketUpgrade, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::{Json, Router};
use listings_core::schema::SchemaClient;
use listings_core::store::{ListingsStore, UsersStore};
use listings_core::types::Listing;
use serde::Deserialize;

use crate::auth::AuthChecker;
use crate::broadcaster::{self, Broadcaster};
use crate::cache::EdgeCache;
use crate::listings_manager_client::ListingsManagerClient;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ListingsStore>,
    pub users_store: Arc<dyn UsersStore>,
    pub schema: Arc<dyn SchemaClient>,
    pub cache: Arc<EdgeCache>,
    pub listings_manager: Arc<ListingsManagerClient>,
    pub auth: Arc<AuthChecker>,
    pub broadcaster: Arc<Broadcaster>,
    pub save_user_data: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/listings", get(get_listings))
        .route("/listings/{sku}", delete(delete_listings))
        .route("/user", get(get_user))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

fn authorized(state: &AppState, headers: &HeaderMap) -> bool {
    let header = headers.get("Authorization").and_then(|v| v.to_str().ok()).unwrap_or("");
    state.auth.token_valid(header)
}

#[derive(Deserialize)]
struct SkuQuery {
    sku: String,
}

async fn get_listings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SkuQuery>,
) -> Response {
    if !authorized(&state, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if !state.schema.test_sku(&query.sku) {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let listings: anyhow::Result<Vec<Listing>> = if state.cache.check_item_exists(&query.sku).await {
        state.store.get(&query.sku).await.map_err(Into::into)
    } else {
        state.cache.add_item(&query.sku).await;
        state.listings_manager.get_listings(&query.sku).await
    };

    match listings {
        Ok(listings) if !listings.is_empty() => Json(listings).into_response(),
        Ok(_) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            // The listings-manager fetch chain collapses every failure (rate
            // limiting exhausted, upstream errors, unknown sku) into a single
            // "nothing to return" outcome at the edge, never a 500.
            tracing::warn!(%err, sku = %query.sku, "listings-service: upstream fetch failed, reporting not found");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

async fn delete_listings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(sku): Path<String>,
) -> Response {
    if !authorized(&state, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if !state.schema.test_sku(&sku) {
        return StatusCode::BAD_REQUEST.into_response();
    }

    state.cache.remove_item(&sku).await;
    match state.store.delete_all(&sku).await {
        Ok(()) => Json(serde_json::json!({"success": true})).into_response(),
        Err(err) => {
            tracing::error!(%err, sku, "listings-service: failed to delete listings");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Deserialize)]
struct SteamIdQuery {
    steamid: String,
}

async fn get_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SteamIdQuery>,
) -> Response {
    if !authorized(&state, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if !state.save_user_data {
        return Json(serde_json::json!({"success": false, "message": "User data saving is disabled."}))
            .into_response();
    }

    match state.users_store.get(&query.steamid).await {
        Ok(Some(user)) => Json(user).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            tracing::error!(%err, steamid = %query.steamid, "listings-service: failed to get user");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn ws_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    if !authorized(&state, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    ws.on_upgrade(move |socket| async move {
        let rx = state.broadcaster.subscribe().await;
        broadcaster::handle_socket(socket, rx).await;
    })
}
