//! Snapshot fetcher (spec §4.3): outbound REST client against the
//! marketplace's classifieds snapshot endpoint, with a per-credential
//! adaptive rate limiter and the defindex-based attribute transform.

use std::sync::Arc;
use std::time::Duration;

use listings_core::attributes::{classify, AttributeDictionary, Classified, RawAttribute};
use listings_core::error::ListingsError;
use listings_core::rate_limiter::RateLimiter;
use listings_core::schema::SchemaClient;
use listings_core::store::ListingsStore;
use listings_core::types::{Currencies, Intent, Listing};
use tracing::{error, info, warn};

const MAX_ATTEMPTS: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const SERVER_ERROR_BACKOFF: Duration = Duration::from_secs(60);
const APPID: u32 = 440;

pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Vec<String>,
    rate_limiter: Arc<RateLimiter>,
    schema: Arc<dyn SchemaClient>,
    attributes: Arc<dyn AttributeDictionary>,
    store: Arc<dyn ListingsStore>,
}

impl RestClient {
    pub fn new(
        base_url: String,
        tokens: Vec<String>,
        schema: Arc<dyn SchemaClient>,
        attributes: Arc<dyn AttributeDictionary>,
        store: Arc<dyn ListingsStore>,
    ) -> Self {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build().unwrap_or_default();
        Self {
            http,
            base_url,
            tokens,
            rate_limiter: Arc::new(RateLimiter::new()),
            schema,
            attributes,
            store,
        }
    }

    /// Fetch and persist the authoritative snapshot for `sku` (spec §4.3):
    /// resolve its display name, call the snapshot endpoint with up to
    /// [`MAX_ATTEMPTS`] retries, replace the store's collection, and return
    /// the new set.
    pub async fn get_listings(&self, sku: &str) -> Result<Vec<Listing>, ListingsError> {
        if sku.contains("None") {
            return Err(ListingsError::Validation(format!("invalid item sku: {sku}")));
        }
        let item_name = self
            .schema
            .name_from_sku(sku)
            .ok_or_else(|| ListingsError::Validation(format!("unknown item sku: {sku}")))?;

        let raw_listings = self.fetch_snapshot(&item_name).await?;

        let mut formatted = Vec::with_capacity(raw_listings.len());
        let mut seen_ids = std::collections::HashSet::new();
        for raw in raw_listings {
            match self.format_listing(&raw, sku, &item_name) {
                Some(listing) if seen_ids.insert(listing.id.clone()) => formatted.push(listing),
                _ => {}
            }
        }

        self.store.delete_all(sku).await?;
        self.store.insert_many(sku, &formatted).await?;

        Ok(formatted)
    }

    async fn fetch_snapshot(&self, item_name: &str) -> Result<Vec<serde_json::Value>, ListingsError> {
        for attempt in 0..MAX_ATTEMPTS {
            let token = match self.rate_limiter.select_token(&self.tokens) {
                Some(t) => t.to_string(),
                None => {
                    return Err(ListingsError::SnapshotUnavailable {
                        sku: item_name.to_string(),
                        reason: "no credentials configured".to_string(),
                    })
                }
            };

            match self.call_snapshot_endpoint(item_name, &token).await {
                Ok(listings) => return Ok(listings),
                Err(FetchError::RateLimited) => {
                    self.rate_limiter.penalize(&token);
                    warn!(attempt, "snapshot fetch: token rate limited, retrying");
                }
                Err(FetchError::ServerError(status)) => {
                    warn!(attempt, status, "snapshot fetch: server error, backing off 60s");
                    tokio::time::sleep(SERVER_ERROR_BACKOFF).await;
                }
                Err(FetchError::Other(reason)) => {
                    warn!(attempt, %reason, "snapshot fetch: transient failure, retrying");
                }
            }
        }

        Err(ListingsError::SnapshotUnavailable {
            sku: item_name.to_string(),
            reason: format!("exhausted {MAX_ATTEMPTS} attempts"),
        })
    }

    async fn call_snapshot_endpoint(
        &self,
        item_name: &str,
        token: &str,
    ) -> Result<Vec<serde_json::Value>, FetchError> {
        self.rate_limiter.wait_for_token(token).await;

        let url = format!("{}/classifieds/listings/snapshot", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("sku", item_name), ("appid", "440"), ("token", token)])
            .send()
            .await
            .map_err(|e| FetchError::Other(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(FetchError::RateLimited);
        }
        if status.is_server_error() {
            return Err(FetchError::ServerError(status.as_u16()));
        }
        if !status.is_success() {
            return Err(FetchError::Other(format!("unexpected status {status}")));
        }

        self.rate_limiter.reward(token);

        let body: serde_json::Value =
            response.json().await.map_err(|e| FetchError::Other(e.to_string()))?;
        let listings = body
            .get("listings")
            .and_then(|v| v.as_array())
            .cloned()
            .ok_or_else(|| FetchError::Other("no active listings found".to_string()))?;
        Ok(listings)
    }

    /// Transform one raw snapshot entry into a canonical `Listing` (spec §4.3).
    fn format_listing(&self, raw: &serde_json::Value, sku: &str, name: &str) -> Option<Listing> {
        let currencies: Currencies = serde_json::from_value(raw.get("currencies")?.clone()).ok()?;
        if currencies.contains_usd() {
            return None;
        }

        let intent = match raw.get("intent")?.as_str()? {
            "sell" => Intent::Sell,
            "buy" => Intent::Buy,
            _ => return None,
        };
        let steam_id = raw.get("steamid")?.as_str()?.to_string();
        let item = raw.get("item")?;
        let raw_id = item.get("id").and_then(|v| v.as_str()).unwrap_or_default();
        let id = Listing::canonical_id(APPID, intent, &steam_id, raw_id);

        let mut spells = Vec::new();
        let mut strange_parts = Vec::new();
        let mut paint = None;
        let mut killstreaker = None;
        let mut sheen = None;

        if let Some(attrs) = item.get("attributes").and_then(|v| v.as_array()) {
            for attr in attrs {
                let defindex = match attr.get("defindex").and_then(|v| v.as_i64()) {
                    Some(d) => d,
                    None => continue,
                };
                let float_value = attr.get("float_value").and_then(|v| v.as_f64());
                match classify(self.attributes.as_ref(), RawAttribute { defindex, float_value }) {
                    Classified::Spell(s) => spells.push(s),
                    Classified::Paint(p) => paint = Some(p),
                    Classified::StrangePart(p) => strange_parts.push(p),
                    Classified::Killstreaker(k) => killstreaker = Some(k),
                    Classified::Sheen(s) => sheen = Some(s),
                    Classified::Unrecognized => {}
                }
            }
        }

        Some(Listing {
            id,
            sku: sku.to_string(),
            name: name.to_string(),
            intent,
            steam_id,
            currencies,
            listed_at: raw.get("timestamp").and_then(|v| v.as_i64()).unwrap_or_default(),
            bump_at: raw.get("bump").and_then(|v| v.as_i64()).unwrap_or_default(),
            details: raw.get("details").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
            user_agent: raw.get("userAgent").and_then(|v| v.as_str()).map(str::to_string),
            buyout_only: raw.get("buyout").and_then(|v| v.as_bool()).unwrap_or(false),
            trade_offers_preferred: raw.get("offers").and_then(|v| v.as_bool()).unwrap_or(false),
            spells: if spells.is_empty() { None } else { Some(spells) },
            paint,
            strange_parts: if strange_parts.is_empty() { None } else { Some(strange_parts) },
            killstreaker,
            sheen,
        })
    }
}

enum FetchError {
    RateLimited,
    ServerError(u16),
    Other(String),
}
