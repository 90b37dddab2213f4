//! Update dispatcher (spec §4.2).
//!
//! Single cooperative worker: wakes every second, drains up to
//! [`crate::queue::BATCH_MAX`] raw events, transforms each into a canonical
//! `Listing` and upserts it, or deletes it, then records the touched
//! `{sku, name}` pair. One bad message never blocks the rest of the batch.

use std::sync::Arc;
use std::time::Duration;

use listings_core::attributes::AttributeDictionary;
use listings_core::config::CommonConfig;
use listings_core::schema::SchemaClient;
use listings_core::store::{ListingsStore, UsersStore};
use listings_core::types::{
    ChangedItem, Currencies, Intent, Killstreaker, Listing, Paint, RawEvent, Sheen, Spell,
    StrangePart, UserDoc,
};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::cache::ItemCache;
use crate::notifier::UpdateNotifier;
use crate::queue::UpdateQueue;

const POLL_INTERVAL: Duration = Duration::from_secs(1);
const APPID: u32 = 440;

pub struct DispatcherDeps {
    pub queue: Arc<UpdateQueue>,
    pub cache: Arc<ItemCache>,
    pub notifier: Arc<UpdateNotifier>,
    pub store: Arc<dyn ListingsStore>,
    pub users_store: Arc<dyn UsersStore>,
    pub schema: Arc<dyn SchemaClient>,
    pub attributes: Arc<dyn AttributeDictionary>,
    pub save_user_data: bool,
}

impl DispatcherDeps {
    pub fn from_config(
        config: &CommonConfig,
        cache: Arc<ItemCache>,
        queue: Arc<UpdateQueue>,
        notifier: Arc<UpdateNotifier>,
        store: Arc<dyn ListingsStore>,
        users_store: Arc<dyn UsersStore>,
        schema: Arc<dyn SchemaClient>,
        attributes: Arc<dyn AttributeDictionary>,
    ) -> Self {
        Self {
            queue,
            cache,
            notifier,
            store,
            users_store,
            schema,
            attributes,
            save_user_data: config.save_user_data,
        }
    }
}

pub async fn run(deps: DispatcherDeps, mut shutdown: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
            _ = shutdown.changed() => {
                info!("dispatcher: shutdown requested");
                return;
            }
        }

        if deps.queue.is_empty().await {
            continue;
        }

        let remaining_before = deps.queue.len().await;
        let batch = deps.queue.pop_batch().await;
        if batch.is_empty() {
            continue;
        }

        info!(
            batch_len = batch.len(),
            remaining = remaining_before - batch.len(),
            "dispatcher: processing batch"
        );

        for message in batch {
            if let Err(err) = process_one(&deps, message).await {
                error!(%err, "dispatcher: failed to process message, continuing");
            }
        }
    }
}

async fn process_one(deps: &DispatcherDeps, message: RawEvent) -> anyhow::Result<()> {
    let payload = message.payload;

    let item = match payload.get("item").and_then(|v| v.as_object()) {
        Some(item) => item,
        None => return Ok(()),
    };

    let item_name = match item.get("name").and_then(|v| v.as_str()) {
        Some(name) => name.to_string(),
        None => return Ok(()),
    };

    if !deps.cache.check_item_exists(&item_name).await {
        return Ok(());
    }

    let item_sku = match deps.cache.sku_from_name(&item_name).await {
        Some(sku) => sku,
        None => match deps.schema.sku_from_name(&item_name) {
            Some(sku) => sku,
            None => return Ok(()),
        },
    };

    let currencies: Currencies = payload
        .get("currencies")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();
    if currencies.contains_usd() {
        return Ok(());
    }

    let intent = match payload.get("intent").and_then(|v| v.as_str()) {
        Some("sell") => Intent::Sell,
        Some("buy") => Intent::Buy,
        _ => return Ok(()),
    };

    let steam_id = match payload.get("steamid").and_then(|v| v.as_str()) {
        Some(s) => s.to_string(),
        None => return Ok(()),
    };

    let raw_id = payload.get("id").and_then(|v| v.as_str()).unwrap_or_default();
    let listing_id = Listing::canonical_id(APPID, intent, &steam_id, raw_id);

    if message.event == "delete" {
        deps.store.delete(&item_sku, &listing_id).await?;
        info!(listing_id, item = %item_name, "dispatcher: deleted listing");
        return Ok(());
    }

    let listing = Listing {
        id: listing_id.clone(),
        sku: item_sku.clone(),
        name: item_name.clone(),
        intent,
        steam_id,
        currencies,
        listed_at: payload.get("listedAt").and_then(|v| v.as_i64()).unwrap_or_default(),
        bump_at: payload.get("bumpedAt").and_then(|v| v.as_i64()).unwrap_or_default(),
        details: payload.get("details").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
        user_agent: payload.get("userAgent").and_then(|v| v.as_str()).map(str::to_string),
        buyout_only: payload.get("buyoutOnly").and_then(|v| v.as_bool()).unwrap_or(false),
        trade_offers_preferred: payload
            .get("tradeOffersPreferred")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        spells: extract_spells(deps.attributes.as_ref(), item),
        paint: extract_paint(item),
        strange_parts: extract_strange_parts(item),
        killstreaker: extract_killstreaker(item),
        sheen: extract_sheen(item),
    };

    deps.store.upsert(&item_sku, &listing).await?;
    deps.notifier.record(ChangedItem { sku: item_sku.clone(), name: item_name.clone() }).await;
    info!(listing_id, item = %item_name, "dispatcher: upserted listing");

    if deps.save_user_data {
        if let Some(user) = payload.get("user").and_then(|v| v.as_object()) {
            if let Some(id) = user.get("id").and_then(|v| v.as_str()) {
                let mut fields = user.clone();
                fields.remove("id");
                deps.users_store
                    .upsert(&UserDoc { id: id.to_string(), fields })
                    .await?;
            }
        }
    }

    Ok(())
}

fn extract_spells(
    dict: &dyn AttributeDictionary,
    item: &serde_json::Map<String, serde_json::Value>,
) -> Option<Vec<Spell>> {
    let raw_spells = item.get("spells")?.as_array()?;
    if raw_spells.is_empty() {
        return None;
    }
    let spells = raw_spells
        .iter()
        .filter_map(|s| {
            let name = s.get("name")?.as_str()?.to_string();
            let (defindex, id) = dict.spell_id_from_name(&name)?;
            Some(Spell { defindex, id, name })
        })
        .collect::<Vec<_>>();
    if spells.is_empty() {
        None
    } else {
        Some(spells)
    }
}

fn extract_paint(item: &serde_json::Map<String, serde_json::Value>) -> Option<Paint> {
    let raw = item.get("paint")?;
    Some(Paint {
        id: listings_core::types::AttributeValue::from_raw(raw.get("id")?.as_f64()?),
        name: raw.get("name")?.as_str()?.to_string(),
    })
}

fn extract_strange_parts(
    item: &serde_json::Map<String, serde_json::Value>,
) -> Option<Vec<StrangePart>> {
    let raw_parts = item.get("strangeParts")?.as_array()?;
    if raw_parts.is_empty() {
        return None;
    }
    let parts = raw_parts
        .iter()
        .filter_map(|p| {
            let kill_eater = p.get("killEater")?;
            Some(StrangePart {
                id: listings_core::types::AttributeValue::from_raw(kill_eater.get("id")?.as_f64()?),
                name: kill_eater.get("name")?.as_str()?.to_string(),
            })
        })
        .collect::<Vec<_>>();
    if parts.is_empty() {
        None
    } else {
        Some(parts)
    }
}

fn extract_killstreaker(item: &serde_json::Map<String, serde_json::Value>) -> Option<Killstreaker> {
    let raw = item.get("killstreaker")?;
    Some(Killstreaker {
        id: listings_core::types::AttributeValue::from_raw(raw.get("id")?.as_f64()?),
        name: raw.get("name")?.as_str()?.to_string(),
    })
}

fn extract_sheen(item: &serde_json::Map<String, serde_json::Value>) -> Option<Sheen> {
    let raw = item.get("sheen")?;
    Some(Sheen {
        id: listings_core::types::AttributeValue::from_raw(raw.get("id")?.as_f64()?),
        name: raw.get("name")?.as_str()?.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use listings_core::attributes::StaticAttributeDictionary;
    use listings_core::schema::StaticSchemaClient;
    use listings_core::store::{InMemoryStore, InMemoryUsersStore};
    use serde_json::json;

    fn deps() -> DispatcherDeps {
        let store: Arc<dyn ListingsStore> = Arc::new(InMemoryStore::new());
        let schema = Arc::new(StaticSchemaClient::with_entries([(
            "Mann Co. Supply Crate Key".to_string(),
            "5021;6".to_string(),
        )]));
        let cache = Arc::new(ItemCache::new(store.clone(), schema.clone()));
        DispatcherDeps {
            queue: Arc::new(UpdateQueue::new()),
            cache,
            notifier: Arc::new(UpdateNotifier::new()),
            store,
            users_store: Arc::new(InMemoryUsersStore::new()),
            schema,
            attributes: Arc::new(StaticAttributeDictionary::new()),
            save_user_data: true,
        }
    }

    fn sell_event(steamid: &str, id: &str) -> RawEvent {
        RawEvent {
            event: "listing-update".to_string(),
            payload: json!({
                "item": {"name": "Mann Co. Supply Crate Key"},
                "currencies": {"metal": 1.0},
                "intent": "sell",
                "steamid": steamid,
                "id": id,
                "listedAt": 100,
                "bumpedAt": 100,
            }),
        }
    }

    #[tokio::test]
    async fn unknown_item_is_skipped() {
        let deps = deps();
        let event = RawEvent {
            event: "listing-update".to_string(),
            payload: json!({"item": {"name": "Unknown Item"}, "intent": "sell", "steamid": "1", "id": "L1", "currencies": {}}),
        };
        process_one(&deps, event).await.unwrap();
        assert!(deps.store.get("5021;6").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn usd_currency_listing_is_skipped() {
        let deps = deps();
        deps.cache.add_item("5021;6").await;
        let mut event = sell_event("1", "L1");
        event.payload["currencies"] = json!({"usd": 1.2});
        process_one(&deps, event).await.unwrap();
        assert!(deps.store.get("5021;6").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sell_listing_is_upserted_and_recorded() {
        let deps = deps();
        deps.cache.add_item("5021;6").await;
        process_one(&deps, sell_event("76561198000000001", "L1")).await.unwrap();

        let stored = deps.store.get("5021;6").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, "L1");

        let changed = deps.notifier.drain().await;
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].sku, "5021;6");
    }

    #[tokio::test]
    async fn buy_listings_from_same_user_collapse_to_one() {
        let deps = deps();
        deps.cache.add_item("5021;6").await;
        let mut e1 = sell_event("76561198000000001", "L1");
        e1.payload["intent"] = json!("buy");
        let mut e2 = sell_event("76561198000000001", "L2");
        e2.payload["intent"] = json!("buy");

        process_one(&deps, e1).await.unwrap();
        process_one(&deps, e2).await.unwrap();

        let stored = deps.store.get("5021;6").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, "buy_440_76561198000000001");
    }

    #[tokio::test]
    async fn delete_event_removes_listing() {
        let deps = deps();
        deps.cache.add_item("5021;6").await;
        process_one(&deps, sell_event("76561198000000001", "L1")).await.unwrap();
        assert_eq!(deps.store.get("5021;6").await.unwrap().len(), 1);

        let mut delete_event = sell_event("76561198000000001", "L1");
        delete_event.event = "delete".to_string();
        process_one(&deps, delete_event).await.unwrap();
        assert!(deps.store.get("5021;6").await.unwrap().is_empty());
    }
}
