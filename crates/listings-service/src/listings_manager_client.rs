//! Outbound call to Listings-Manager's on-demand snapshot endpoint (spec §4.8).

use std::time::Duration;

use listings_core::types::Listing;

const TIMEOUT: Duration = Duration::from_secs(10);

pub struct ListingsManagerClient {
    http: reqwest::Client,
    base_url: String,
}

impl ListingsManagerClient {
    pub fn new(base_url: String) -> Self {
        let http = reqwest::Client::builder().timeout(TIMEOUT).build().unwrap_or_default();
        Self { http, base_url }
    }

    pub async fn get_listings(&self, sku: &str) -> anyhow::Result<Vec<Listing>> {
        let url = format!("{}/listings", self.base_url);
        let response = self.http.get(&url).query(&[("item_sku", sku)]).send().await?;
        let response = response.error_for_status()?;
        Ok(response.json().await?)
    }
}
