//! Time helpers — the pipeline's timestamps are all epoch seconds.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current Unix timestamp as an `f64`, for sub-second rate-limiter math.
pub fn now_secs_f64() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64()
}
