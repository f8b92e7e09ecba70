//! Domain-level error types.

use thiserror::Error;

use crate::ports::QuotaStoreError;

/// Machine-readable code for quota rejections, stable across the wire.
pub const RATE_LIMIT_EXCEEDED_CODE: &str = "RATE_LIMIT_EXCEEDED";

/// Details of a denied check, shaped for the HTTP contract.
#[derive(Debug, Clone)]
pub struct LimitError {
    /// Always [`RATE_LIMIT_EXCEEDED_CODE`].
    pub code: &'static str,
    pub remaining: u32,
    /// The policy's total budget per window.
    pub total: u32,
    /// Epoch milliseconds when the window resets.
    pub reset_time_ms: i64,
    /// Whole seconds until a retry can succeed, rounded up.
    pub retry_after_secs: u64,
    /// "Rate limit exceeded. Try again in {human-readable duration}."
    pub message: String,
}

/// Quota service errors.
///
/// The first two variants are routine, expected outcomes and must be returned
/// to the caller as typed results, never escalated to a process failure.
/// `UnknownPolicy` is the one programmer error here: an unregistered policy
/// name means the caller is misconfigured.
#[derive(Debug, Error)]
pub enum QuotaError {
    /// The identifier's budget for the current window is spent.
    #[error("{}", .0.message)]
    RateLimitExceeded(LimitError),

    /// A network origin asked for more fresh anonymous tokens than its
    /// issuance budget allows. Distinct from a normal rejection so callers
    /// can tell credential churn from ordinary quota exhaustion.
    #[error("{}", .0.message)]
    TokenIssuanceLimitExceeded(LimitError),

    /// An unregistered policy name was requested. Configuration bug.
    #[error("Unknown rate-limit policy: {0}")]
    UnknownPolicy(String),

    #[error(transparent)]
    Store(#[from] QuotaStoreError),
}
