use serde::{Deserialize, Serialize};

/// Persisted counter state for one `(policy, identifier)` pair.
///
/// While `now < reset_time_ms` the owning policy guarantees `requests` never
/// exceeds its budget. Once the window has passed the record is logically
/// expired and is treated as a fresh window on the next access, whether or
/// not a sweep has physically deleted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaRecord {
    /// `key_prefix:identifier`, unique per policy and identifier.
    pub key: String,
    /// Requests consumed in the current window.
    pub requests: u32,
    /// Epoch milliseconds when the current window ends.
    pub reset_time_ms: i64,
    /// Epoch milliseconds of the last mutation.
    pub updated_at_ms: i64,
}

impl QuotaRecord {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms >= self.reset_time_ms
    }
}

/// Outcome of one rate-limit check. Derived fresh on every call, never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub allowed: bool,
    pub remaining: u32,
    /// Epoch milliseconds when the current window ends.
    pub reset_time_ms: i64,
    /// The policy's total budget per window.
    pub total: u32,
}
