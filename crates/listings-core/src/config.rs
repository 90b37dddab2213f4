//! Environment-variable configuration loading.
//!
//! All three services read their settings from the process environment
//! (spec §6), optionally backed by a local `.env` file for development. A
//! missing required variable is the one fatal error class (spec §7) — it is
//! surfaced before the service starts serving.

use crate::error::ListingsError;

/// Settings shared by all three services.
#[derive(Debug, Clone)]
pub struct CommonConfig {
    /// Mongo-compatible connection string for the document store.
    pub database_url: String,
    /// Whether to persist `payload.user` documents alongside listings.
    pub save_user_data: bool,
    /// Bind address for this service's HTTP surface.
    pub bind_addr: String,
}

impl CommonConfig {
    pub fn from_env() -> Result<Self, ListingsError> {
        load_dotenv();
        Ok(Self {
            database_url: require_env("DATABASE_URL")?,
            save_user_data: bool_env("SAVE_USER_DATA", false),
            bind_addr: optional_env("BIND_ADDR", "0.0.0.0:8080"),
        })
    }
}

/// Load a `.env` file if present. Best-effort — absence is not an error,
/// the real environment always takes precedence over values it sets.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

/// Read a required environment variable, or a fatal `Config` error.
pub fn require_env(key: &str) -> Result<String, ListingsError> {
    std::env::var(key).map_err(|_| ListingsError::Config(format!("missing required env var {key}")))
}

/// Read an optional environment variable with a default.
pub fn optional_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read a comma-separated list from an environment variable.
pub fn list_env(key: &str) -> Vec<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

/// Read a boolean environment variable (`"true"`/`"1"` are truthy, case-insensitive).
pub fn bool_env(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

/// Read a numeric environment variable with a default.
pub fn num_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialize these tests so
    // they don't stomp on each other (same rationale as
    // `rugzct-cyber-RUST-TEST`'s `serial_test` usage for env-dependent tests).
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn missing_required_var_is_fatal_config_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe {
            std::env::remove_var("LISTINGS_CORE_TEST_REQUIRED");
        }
        let err = require_env("LISTINGS_CORE_TEST_REQUIRED").unwrap_err();
        assert!(matches!(err, ListingsError::Config(_)));
    }

    #[test]
    fn bool_env_parses_common_truthy_forms() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("LISTINGS_CORE_TEST_BOOL", "TRUE");
        }
        assert!(bool_env("LISTINGS_CORE_TEST_BOOL", false));
        unsafe {
            std::env::remove_var("LISTINGS_CORE_TEST_BOOL");
        }
        assert!(!bool_env("LISTINGS_CORE_TEST_BOOL", false));
    }
}
