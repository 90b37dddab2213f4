//! Adaptive per-credential rate limiter (spec §4.4).
//!
//! AIMD-style control isolated per bearer token: a 429 on one token backs
//! that token off and cools it down without penalizing the others; a run of
//! successes rewards the token back towards the minimum delay. Token
//! selection is uniform-random among tokens not currently cooling, which
//! avoids synchronized bursts across tokens recovering at the same time.

use dashmap::DashMap;
use rand::seq::SliceRandom;
use tracing::info;

use crate::time_util::now_secs_f64;

const MIN_DELAY: f64 = 0.5;
const MAX_DELAY: f64 = 60.0;
const BACKOFF_FACTOR: f64 = 2.0;
const COOLDOWN_ON_429: f64 = 30.0;
const SUCCESS_THRESHOLD: u32 = 10;
const REWARD_FACTOR: f64 = 0.9;

/// Per-token rate-limiter state (spec §3 "Token state").
#[derive(Debug, Clone, Copy)]
pub struct TokenState {
    pub delay: f64,
    pub cooldown_until: f64,
    pub success_count: u32,
}

impl Default for TokenState {
    fn default() -> Self {
        Self { delay: MIN_DELAY, cooldown_until: 0.0, success_count: 0 }
    }
}

/// Adaptive per-credential rate limiter over a fixed pool of bearer tokens.
///
/// Per-token state lives in a `DashMap` so mutation never requires holding a
/// lock across an `.await` (spec §5) — reads/writes are short, synchronous
/// map operations; the actual `sleep` happens after the map access returns.
pub struct RateLimiter {
    states: DashMap<String, TokenState>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self { states: DashMap::new() }
    }

    fn state_of(&self, token: &str) -> TokenState {
        *self.states.entry(token.to_string()).or_default()
    }

    /// Sleep until `token` is eligible to be used, per its current delay
    /// and cooldown (spec §4.4 `wait_for_token`).
    pub async fn wait_for_token(&self, token: &str) {
        let state = self.state_of(token);
        let now = now_secs_f64();
        let wait = (state.cooldown_until - now).max(state.delay);
        if wait > 0.0 {
            tokio::time::sleep(std::time::Duration::from_secs_f64(wait)).await;
        }
    }

    /// Record a 429: back off the delay (capped) and start a cooldown.
    pub fn penalize(&self, token: &str) {
        let mut entry = self.states.entry(token.to_string()).or_default();
        entry.delay = (entry.delay * BACKOFF_FACTOR).min(MAX_DELAY);
        entry.cooldown_until = now_secs_f64() + COOLDOWN_ON_429;
        entry.success_count = 0;
        info!(token = %redact(token), delay = entry.delay, "rate limiter: penalized token after 429");
    }

    /// Record a success: after `SUCCESS_THRESHOLD` consecutive successes,
    /// reward the token by shrinking its delay back towards the minimum.
    pub fn reward(&self, token: &str) {
        let mut entry = self.states.entry(token.to_string()).or_default();
        entry.success_count += 1;
        if entry.success_count >= SUCCESS_THRESHOLD {
            entry.delay = (entry.delay * REWARD_FACTOR).max(MIN_DELAY);
            entry.cooldown_until = 0.0;
            entry.success_count = 0;
            info!(token = %redact(token), delay = entry.delay, "rate limiter: rewarded token");
        }
    }

    /// Select a token to use next: uniformly at random among tokens not
    /// currently cooling down, or the soonest-to-free token if all are
    /// cooling (spec §4.4 "token selection").
    pub fn select_token<'a>(&self, tokens: &'a [String]) -> Option<&'a str> {
        if tokens.is_empty() {
            return None;
        }
        let now = now_secs_f64();
        let available: Vec<&String> =
            tokens.iter().filter(|t| self.state_of(t).cooldown_until <= now).collect();

        if let Some(choice) = available.choose(&mut rand::thread_rng()) {
            return Some(choice.as_str());
        }

        tokens
            .iter()
            .min_by(|a, b| {
                self.state_of(a)
                    .cooldown_until
                    .partial_cmp(&self.state_of(b).cooldown_until)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|s| s.as_str())
    }

    /// Snapshot a token's current state (used by tests and diagnostics).
    pub fn state(&self, token: &str) -> TokenState {
        self.state_of(token)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

fn redact(token: &str) -> String {
    format!("{}***", &token[..token.len().min(5)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn penalize_backs_off_and_cools_down() {
        let limiter = RateLimiter::new();
        let before = limiter.state("a");
        assert_eq!(before.delay, MIN_DELAY);

        limiter.penalize("a");
        let after = limiter.state("a");
        assert_eq!(after.delay, MIN_DELAY * BACKOFF_FACTOR);
        assert!(after.cooldown_until >= now_secs_f64() + 29.0);
        assert_eq!(after.success_count, 0);
    }

    #[tokio::test]
    async fn reward_only_kicks_in_at_threshold() {
        let limiter = RateLimiter::new();
        limiter.penalize("a"); // delay = 1.0
        for _ in 0..SUCCESS_THRESHOLD - 1 {
            limiter.reward("a");
        }
        assert_eq!(limiter.state("a").delay, MIN_DELAY * BACKOFF_FACTOR, "not yet rewarded");

        limiter.reward("a");
        let state = limiter.state("a");
        assert!((state.delay - (MIN_DELAY * BACKOFF_FACTOR * REWARD_FACTOR)).abs() < 1e-9);
        assert_eq!(state.cooldown_until, 0.0);
        assert_eq!(state.success_count, 0);
    }

    #[tokio::test]
    async fn reward_never_drops_below_min_delay() {
        let limiter = RateLimiter::new();
        for _ in 0..SUCCESS_THRESHOLD {
            limiter.reward("a");
        }
        assert_eq!(limiter.state("a").delay, MIN_DELAY);
    }

    #[tokio::test]
    async fn selection_avoids_cooling_tokens() {
        let limiter = RateLimiter::new();
        let tokens = vec!["a".to_string(), "b".to_string()];
        limiter.penalize("a");
        // a is cooling for 30s, b is untouched -> must pick b.
        assert_eq!(limiter.select_token(&tokens), Some("b"));
    }

    #[tokio::test]
    async fn selection_picks_soonest_when_all_cooling() {
        let limiter = RateLimiter::new();
        let tokens = vec!["a".to_string(), "b".to_string()];
        limiter.penalize("a");
        limiter.penalize("b");
        limiter.penalize("b"); // b now cools further into the future than a
        assert_eq!(limiter.select_token(&tokens), Some("a"));
    }

    #[tokio::test]
    async fn ten_consecutive_successes_converge_near_min_delay() {
        let limiter = RateLimiter::new();
        for _ in 0..10 {
            limiter.reward("b");
        }
        let state = limiter.state("b");
        assert!((state.delay - MIN_DELAY).abs() < 1e-9);
    }
}
