//! Rate-limit policy catalog.
//!
//! Policies are compile-time constants; there is no runtime registration.

use crate::error::QuotaError;

/// A named, immutable rate-limit configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub name: &'static str,
    /// Length of one fixed quota window.
    pub window_ms: i64,
    /// Request budget per window.
    pub max_requests: u32,
    /// Namespacing prefix for store keys.
    pub key_prefix: &'static str,
}

impl Policy {
    /// Store key for one identifier under this policy.
    pub fn key_for(&self, identifier: &str) -> String {
        format!("{}:{}", self.key_prefix, identifier)
    }
}

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

/// One idea per day for anonymous visitors, keyed by anonymous token.
pub const ANON_IDEAS: Policy = Policy {
    name: "ANON_IDEAS",
    window_ms: DAY_MS,
    max_requests: 1,
    key_prefix: "anon-ideas",
};

/// Five ideas per hour for signed-in users, keyed by user id.
pub const AUTH_IDEAS: Policy = Policy {
    name: "AUTH_IDEAS",
    window_ms: HOUR_MS,
    max_requests: 5,
    key_prefix: "auth-ideas",
};

/// Voting budget for signed-in users, keyed by user id.
pub const AUTH_VOTES: Policy = Policy {
    name: "AUTH_VOTES",
    window_ms: MINUTE_MS,
    max_requests: 100,
    key_prefix: "auth-votes",
};

/// How many fresh anonymous tokens one network origin may mint per day.
/// Keyed by the caller's network origin, not by the token, so discarding
/// credentials does not buy a new budget.
pub const ANON_TOKEN_ISSUE: Policy = Policy {
    name: "ANON_TOKEN_ISSUE",
    window_ms: DAY_MS,
    max_requests: 3,
    key_prefix: "anon-issue",
};

/// Static registry of every policy the service enforces.
pub struct PolicyCatalog;

impl PolicyCatalog {
    pub const ALL: [&'static Policy; 4] = [&ANON_IDEAS, &AUTH_IDEAS, &AUTH_VOTES, &ANON_TOKEN_ISSUE];

    /// Look up a policy by name.
    ///
    /// An unknown name is a configuration bug in the caller, not a runtime
    /// condition, and is surfaced as [`QuotaError::UnknownPolicy`].
    pub fn get(name: &str) -> Result<&'static Policy, QuotaError> {
        Self::ALL
            .iter()
            .copied()
            .find(|policy| policy.name == name)
            .ok_or_else(|| QuotaError::UnknownPolicy(name.to_string()))
    }
}
