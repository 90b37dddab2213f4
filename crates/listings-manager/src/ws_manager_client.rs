//! Outbound calls to WS-Manager (spec §4.8): registering a freshly fetched
//! item and purging now-stale queued updates for it.

use std::time::Duration;

use tracing::warn;

const TIMEOUT: Duration = Duration::from_secs(10);

pub struct WsManagerClient {
    http: reqwest::Client,
    base_url: String,
}

impl WsManagerClient {
    pub fn new(base_url: String) -> Self {
        let http = reqwest::Client::builder().timeout(TIMEOUT).build().unwrap_or_default();
        Self { http, base_url }
    }

    /// `POST /item` — register a sku so WS-Manager's dispatcher keeps
    /// persisting subsequent stream deltas for it.
    pub async fn add_item_to_cache(&self, sku: &str) {
        let url = format!("{}/item", self.base_url);
        if let Err(err) = self.http.post(&url).json(&ItemRequest { item_sku: sku }).send().await {
            warn!(%err, sku, "failed to add item to WS-Manager cache");
        }
    }

    /// `DELETE /queue` — drop queued deltas for a sku now superseded by a
    /// fresh snapshot (spec §4.5).
    pub async fn remove_updates_from_queue(&self, sku: &str) {
        let url = format!("{}/queue", self.base_url);
        if let Err(err) = self.http.delete(&url).json(&ItemRequest { item_sku: sku }).send().await {
            warn!(%err, sku, "failed to purge WS-Manager queue");
        }
    }
}

#[derive(serde::Serialize)]
struct ItemRequest<'a> {
    item_sku: &'a str,
}
