//! # listings-core
//!
//! Shared core for the marketplace listings pipeline, providing:
//!
//! - **Types** (`types`) — the canonical `Listing` schema and related structs
//! - **Error types** (`error`) — domain-specific `ListingsError` via thiserror
//! - **Configuration** (`config`) — environment-variable config loading
//! - **Logging** (`logging`) — tracing-based structured logging
//! - **Rate limiter** (`rate_limiter`) — adaptive per-credential rate limiting
//! - **Schema** (`schema`) — SKU <-> name lookup contract
//! - **Attributes** (`attributes`) — spell/paint/strange-part/killstreak lookup contract
//! - **Store** (`store`) — document store contracts (listings, users)
//! - **Time** (`time_util`) — epoch-second helpers

pub mod attributes;
pub mod config;
pub mod error;
pub mod logging;
pub mod rate_limiter;
pub mod schema;
pub mod store;
pub mod time_util;
pub mod types;

pub use error::ListingsError;
pub use types::*;
