//! Core data types for the marketplace listings pipeline.
//!
//! These mirror the canonical schema in spec §3: a `Listing` is one sell or
//! buy offer for a specific sku by a specific user, normalized from whatever
//! shape the upstream websocket or REST snapshot delivered it in.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Direction of a listing: sell (offering to sell) or buy (offering to buy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Sell,
    Buy,
}

/// A mapping currency-code -> amount.
///
/// Wraps a `BTreeMap` rather than exposing it directly so the "usd listings
/// are rejected" invariant (spec §3) lives in one place instead of being
/// re-checked at every call site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currencies(pub BTreeMap<String, f64>);

impl Currencies {
    pub fn contains_usd(&self) -> bool {
        self.0.contains_key("usd")
    }
}

/// A spell attribute on an item (defindex 1004-1009).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spell {
    pub defindex: i64,
    pub id: i64,
    pub name: String,
}

/// A paint attribute on an item (defindex 142).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paint {
    pub id: AttributeValue,
    pub name: String,
}

/// A strange part attribute on an item (defindex 380/382/384).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrangePart {
    pub id: AttributeValue,
    pub name: String,
}

/// A killstreak effect attribute (defindex 2013).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Killstreaker {
    pub id: AttributeValue,
    pub name: String,
}

/// A killstreak sheen attribute (defindex 2014).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheen {
    pub id: AttributeValue,
    pub name: String,
}

/// A defindex `float_value`, coerced per spec §4.3: integer when whole,
/// else float, else null.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Int(i64),
    Float(f64),
}

impl AttributeValue {
    /// Parse a raw `float_value` per spec §4.3's coercion rule.
    pub fn from_raw(raw: f64) -> Self {
        if raw.fract() == 0.0 {
            AttributeValue::Int(raw as i64)
        } else {
            AttributeValue::Float(raw)
        }
    }
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeValue::Int(i) => write!(f, "{i}"),
            AttributeValue::Float(v) => write!(f, "{v}"),
        }
    }
}

/// The canonical listing document (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    /// For sell-intent, the marketplace's listing id; for buy-intent, the
    /// synthetic `buy_<appid>_<steamid>` id.
    pub id: String,
    pub sku: String,
    pub name: String,
    pub intent: Intent,
    #[serde(rename = "steamID")]
    pub steam_id: String,
    pub currencies: Currencies,
    pub listed_at: i64,
    pub bump_at: i64,
    #[serde(default)]
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub buyout_only: bool,
    #[serde(default)]
    pub trade_offers_preferred: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub spells: Option<Vec<Spell>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paint: Option<Paint>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "strangeParts")]
    pub strange_parts: Option<Vec<StrangePart>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub killstreaker: Option<Killstreaker>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheen: Option<Sheen>,
}

impl Listing {
    /// The canonical listing id for a given intent per spec §3: the
    /// marketplace's own id for sells, a synthetic per-user id for buys.
    pub fn canonical_id(appid: u32, intent: Intent, steam_id: &str, raw_id: &str) -> String {
        match intent {
            Intent::Sell => raw_id.to_string(),
            Intent::Buy => format!("buy_{appid}_{steam_id}"),
        }
    }
}

/// One {sku, name} pair in the coalesced changed-item set (spec §3, §4.7).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangedItem {
    pub sku: String,
    pub name: String,
}

/// A raw inbound websocket event, as delivered by the upstream feed
/// (spec §4.1): `{event: "listing-update"|"delete"|..., payload: {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    pub event: String,
    pub payload: serde_json::Value,
}

/// A stored user document, keyed by steam id (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDoc {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usd_currencies_detected() {
        let mut c = Currencies::default();
        c.0.insert("usd".to_string(), 1.2);
        assert!(c.contains_usd());

        let keys = Currencies(BTreeMap::from([("metal".to_string(), 1.0)]));
        assert!(!keys.contains_usd());
    }

    #[test]
    fn buy_intent_id_is_synthetic_and_stable() {
        let id = Listing::canonical_id(440, Intent::Buy, "76561198000000001", "L1");
        assert_eq!(id, "buy_440_76561198000000001");

        let id2 = Listing::canonical_id(440, Intent::Buy, "76561198000000001", "L2");
        assert_eq!(id, id2, "buy ids must collapse regardless of raw listing id");
    }

    #[test]
    fn sell_intent_id_is_the_raw_listing_id() {
        let id = Listing::canonical_id(440, Intent::Sell, "76561198000000001", "L1");
        assert_eq!(id, "L1");
    }

    #[test]
    fn attribute_value_coerces_whole_floats_to_int() {
        assert_eq!(AttributeValue::from_raw(5.0), AttributeValue::Int(5));
        assert_eq!(AttributeValue::from_raw(5.5), AttributeValue::Float(5.5));
    }
}
