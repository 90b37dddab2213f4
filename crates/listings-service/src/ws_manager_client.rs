//! Outbound call to WS-Manager's `item-updates` poll endpoint (spec §4.7).

use std::time::Duration;

use listings_core::types::ChangedItem;

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

    pub async fn get_item_updates(&self) -> anyhow::Result<Vec<ChangedItem>> {
        let url = format!("{}/item-updates", self.base_url);
        let response = self.http.get(&url).send().await?;
        let response = response.error_for_status()?;
        Ok(response.json().await?)
    }
}
