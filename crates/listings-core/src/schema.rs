//! SKU <-> name lookup contract.
//!
//! The real implementation lives outside this pipeline's scope (spec §1:
//! "the game-schema lookup library") — it is normally backed by the game's
//! item schema (what the Python original calls `tf2utilities`). This module
//! defines the contract the rest of the pipeline depends on, plus a simple
//! in-memory implementation for development and tests.

use dashmap::DashMap;

/// Bidirectional sku <-> display-name lookup, plus sku shape validation.
pub trait SchemaClient: Send + Sync {
    /// Resolve an item's display name to its canonical sku, if known.
    fn sku_from_name(&self, name: &str) -> Option<String>;

    /// Resolve a sku back to its display name, if known.
    fn name_from_sku(&self, sku: &str) -> Option<String>;

    /// Validate that a string has the shape of a sku
    /// (`defindex;quality[;attribute...]`), without requiring it be known.
    fn test_sku(&self, sku: &str) -> bool;
}

/// In-memory `SchemaClient` seeded with a known name<->sku table.
///
/// Stands in for the real schema lookup library; callers populate it with
/// whatever subset of the game's item schema they have available.
pub struct StaticSchemaClient {
    sku_by_name: DashMap<String, String>,
    name_by_sku: DashMap<String, String>,
}

impl StaticSchemaClient {
    pub fn new() -> Self {
        Self { sku_by_name: DashMap::new(), name_by_sku: DashMap::new() }
    }

    pub fn with_entries(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        let client = Self::new();
        for (name, sku) in entries {
            client.register(&name, &sku);
        }
        client
    }

    /// Register a name<->sku pair.
    pub fn register(&self, name: &str, sku: &str) {
        self.sku_by_name.insert(name.to_string(), sku.to_string());
        self.name_by_sku.insert(sku.to_string(), name.to_string());
    }
}

impl Default for StaticSchemaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaClient for StaticSchemaClient {
    fn sku_from_name(&self, name: &str) -> Option<String> {
        self.sku_by_name.get(name).map(|v| v.clone())
    }

    fn name_from_sku(&self, sku: &str) -> Option<String> {
        self.name_by_sku.get(sku).map(|v| v.clone())
    }

    fn test_sku(&self, sku: &str) -> bool {
        is_valid_sku_shape(sku)
    }
}

/// A sku has the shape `defindex;quality[;attribute...]` where `defindex`
/// and `quality` are integers (the leading two fields of a TF2-style sku).
pub fn is_valid_sku_shape(sku: &str) -> bool {
    if sku.contains("None") {
        return false;
    }
    let mut parts = sku.split(';');
    let defindex = parts.next();
    let quality = parts.next();
    matches!(
        (defindex, quality),
        (Some(d), Some(q)) if !d.is_empty() && d.parse::<i64>().is_ok() && q.parse::<i64>().is_ok()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sku_shape_validation() {
        assert!(is_valid_sku_shape("5021;6"));
        assert!(is_valid_sku_shape("30469;11;kt-3"));
        assert!(!is_valid_sku_shape("not-a-sku"));
        assert!(!is_valid_sku_shape("None;6"));
    }

    #[test]
    fn round_trips_name_and_sku() {
        let client = StaticSchemaClient::new();
        client.register("Mann Co. Supply Crate Key", "5021;6");
        assert_eq!(client.sku_from_name("Mann Co. Supply Crate Key"), Some("5021;6".to_string()));
        assert_eq!(client.name_from_sku("5021;6"), Some("Mann Co. Supply Crate Key".to_string()));
        assert_eq!(client.sku_from_name("unknown item"), None);
    }
}
