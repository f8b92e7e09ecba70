//! Rate-limit wire types shared by the server and the browser client.
//!
//! The server writes these headers and the 429 body; the client parses them
//! back into its predictive quota cache. Keeping both sides on one set of
//! types prevents the header names and JSON field names from drifting apart.

use serde::{Deserialize, Serialize};

/// Header carrying the policy's total budget for the current window.
pub const HEADER_LIMIT: &str = "X-RateLimit-Limit";
/// Header carrying the remaining budget for the current window.
pub const HEADER_REMAINING: &str = "X-RateLimit-Remaining";
/// Header carrying the epoch-millisecond timestamp when the window resets.
pub const HEADER_RESET: &str = "X-RateLimit-Reset";
/// Standard retry hint on 429 responses, in whole seconds.
pub const HEADER_RETRY_AFTER: &str = "Retry-After";

/// Parsed rate-limit response headers.
///
/// Present on every gated response, allowed or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitHeaders {
    pub limit: u32,
    pub remaining: u32,
    /// Epoch milliseconds when the current window ends.
    pub reset_ms: i64,
}

impl RateLimitHeaders {
    /// Parse the three headers out of any header lookup.
    ///
    /// Returns `None` unless all three are present and well-formed, so a
    /// response from an ungated endpoint never pollutes the client cache.
    pub fn from_lookup<'a, F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        Some(Self {
            limit: lookup(HEADER_LIMIT)?.parse().ok()?,
            remaining: lookup(HEADER_REMAINING)?.parse().ok()?,
            reset_ms: lookup(HEADER_RESET)?.parse().ok()?,
        })
    }
}

/// JSON body of a 429 rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitRejection {
    /// Human-readable message ("Rate limit exceeded. Try again in ...").
    pub error: String,
    /// Machine-readable code, always `RATE_LIMIT_EXCEEDED`.
    pub code: String,
    pub remaining: u32,
    /// Epoch milliseconds when the window resets.
    pub reset_time: i64,
    /// Whole seconds until a retry can succeed.
    pub retry_after: u64,
    /// Always `false`; mirrors the success envelope of normal responses.
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_complete_headers() {
        let headers = |name: &str| match name {
            HEADER_LIMIT => Some("100"),
            HEADER_REMAINING => Some("42"),
            HEADER_RESET => Some("1700000060000"),
            _ => None,
        };

        let parsed = RateLimitHeaders::from_lookup(headers).unwrap();
        assert_eq!(parsed.limit, 100);
        assert_eq!(parsed.remaining, 42);
        assert_eq!(parsed.reset_ms, 1_700_000_060_000);
    }

    #[test]
    fn rejects_partial_headers() {
        let headers = |name: &str| match name {
            HEADER_LIMIT => Some("100"),
            _ => None,
        };

        assert!(RateLimitHeaders::from_lookup(headers).is_none());
    }

    #[test]
    fn rejection_uses_camel_case_field_names() {
        let rejection = RateLimitRejection {
            error: "Rate limit exceeded. Try again in 45 seconds.".to_string(),
            code: "RATE_LIMIT_EXCEEDED".to_string(),
            remaining: 0,
            reset_time: 1_700_000_045_000,
            retry_after: 45,
            success: false,
        };

        let json = serde_json::to_value(&rejection).unwrap();
        assert_eq!(json["code"], "RATE_LIMIT_EXCEEDED");
        assert_eq!(json["resetTime"], 1_700_000_045_000_i64);
        assert_eq!(json["retryAfter"], 45);
        assert_eq!(json["success"], false);
    }
}
