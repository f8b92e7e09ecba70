//! Client-side predictive quota cache.
//!
//! A best-effort mirror of server rate-limit decisions. The UI reads it to
//! disable controls and render countdowns without a round-trip on every
//! keystroke. It is never authoritative: the server re-checks every call, and
//! entries go stale after a short TTL so the client falls back to asking the
//! server rather than trusting old optimism indefinitely.
//!
//! Each browsing context holds its own cache, seeded only from responses it
//! observed itself. There is no cross-tab synchronization.
//!
//! Per `(policy, identifier)` the cache moves UNKNOWN -> OK (remaining > 0)
//! -> EXHAUSTED (remaining == 0) -> OK once the clock crosses `reset_ms` or a
//! fresh sync reports budget again. Transitions are driven only by observed
//! responses and the local clock, never by guessing at server state.

use std::collections::HashMap;

use crate::rate_limit::{RateLimitHeaders, RateLimitRejection};

/// Default staleness bound. An entry older than this no longer gates the UI.
pub const DEFAULT_STALE_AFTER_MS: i64 = 30_000;

/// Last decision observed for one `(policy, identifier)` pair.
#[derive(Debug, Clone, Copy)]
struct CachedDecision {
    remaining: u32,
    reset_ms: i64,
    last_updated_ms: i64,
}

/// Best-effort client mirror of server quota decisions.
///
/// Callers supply `now_ms` explicitly so the cache works the same under
/// `Date.now()` in WASM and under a fake clock in tests.
#[derive(Debug, Default)]
pub struct ClientQuotaCache {
    entries: HashMap<(String, String), CachedDecision>,
    stale_after_ms: i64,
}

impl ClientQuotaCache {
    pub fn new() -> Self {
        Self::with_stale_after(DEFAULT_STALE_AFTER_MS)
    }

    pub fn with_stale_after(stale_after_ms: i64) -> Self {
        Self {
            entries: HashMap::new(),
            stale_after_ms,
        }
    }

    /// Record the decision carried by a gated response's headers.
    pub fn sync_from_headers(
        &mut self,
        policy: &str,
        identifier: &str,
        headers: RateLimitHeaders,
        now_ms: i64,
    ) {
        self.insert(policy, identifier, headers.remaining, headers.reset_ms, now_ms);
    }

    /// Record a 429 rejection body.
    pub fn sync_from_rejection(
        &mut self,
        policy: &str,
        identifier: &str,
        rejection: &RateLimitRejection,
        now_ms: i64,
    ) {
        self.insert(
            policy,
            identifier,
            rejection.remaining,
            rejection.reset_time,
            now_ms,
        );
    }

    /// Whether the UI should let the user attempt the action.
    ///
    /// Permissive by default: an unknown, stale, or expired entry means "ask
    /// the server", not "deny".
    pub fn can_perform(&self, policy: &str, identifier: &str, now_ms: i64) -> bool {
        match self.lookup(policy, identifier) {
            None => true,
            Some(cached) => {
                now_ms - cached.last_updated_ms >= self.stale_after_ms
                    || now_ms >= cached.reset_ms
                    || cached.remaining > 0
            }
        }
    }

    /// Milliseconds until the action is worth attempting again. Zero when
    /// `can_perform` already allows it.
    pub fn time_until_next(&self, policy: &str, identifier: &str, now_ms: i64) -> i64 {
        if self.can_perform(policy, identifier, now_ms) {
            return 0;
        }
        match self.lookup(policy, identifier) {
            Some(cached) => (cached.reset_ms - now_ms).max(0),
            None => 0,
        }
    }

    /// Drop everything, e.g. when the user logs in or out and the identifier
    /// changes under us.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn insert(
        &mut self,
        policy: &str,
        identifier: &str,
        remaining: u32,
        reset_ms: i64,
        now_ms: i64,
    ) {
        self.entries.insert(
            (policy.to_string(), identifier.to_string()),
            CachedDecision {
                remaining,
                reset_ms,
                last_updated_ms: now_ms,
            },
        );
    }

    fn lookup(&self, policy: &str, identifier: &str) -> Option<&CachedDecision> {
        self.entries
            .get(&(policy.to_string(), identifier.to_string()))
    }
}
