//! Typed error definitions for the listings pipeline.
//!
//! Provides [`ListingsError`] for domain-specific errors that are more
//! informative than plain `anyhow::Error` strings. All variants implement
//! `std::error::Error` via `thiserror`, so they integrate seamlessly with
//! `anyhow::Result`.

use thiserror::Error;

/// Domain-specific errors for the listings pipeline.
#[derive(Debug, Error)]
pub enum ListingsError {
    /// Configuration parsing or validation error. The only fatal class —
    /// surfaced to `main` and causes a non-zero exit before serving.
    #[error("config error: {0}")]
    Config(String),

    /// Websocket connection, handshake, or communication error.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// Outbound REST call failed after exhausting retries.
    #[error("snapshot unavailable for sku {sku}: {reason}")]
    SnapshotUnavailable { sku: String, reason: String },

    /// Schema / validation error: bad sku, unknown item name, missing
    /// required payload fields. Rejected per-item or per-request.
    #[error("validation error: {0}")]
    Validation(String),

    /// Document store error. Logged, never crashes the calling loop.
    #[error("store error: {0}")]
    Store(String),

    /// Authorization failed.
    #[error("unauthorized")]
    Unauthorized,
}
