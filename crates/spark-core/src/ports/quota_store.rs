//! Quota store port.

use async_trait::async_trait;

use crate::domain::QuotaRecord;

/// One attempt to consume a slot for a key in a fixed window.
#[derive(Debug, Clone)]
pub struct QuotaClaim {
    pub key: String,
    pub max_requests: u32,
    pub window_ms: i64,
    pub now_ms: i64,
}

/// Result of a claim: whether the slot was taken, plus the authoritative
/// post-claim record.
#[derive(Debug, Clone)]
pub struct ClaimOutcome {
    pub claimed: bool,
    pub record: QuotaRecord,
}

/// Abstraction over quota counter storage.
///
/// The store is the one resource shared across concurrent requests and across
/// independent service processes. Race safety therefore lives entirely in
/// `upsert`: implementations must serialize concurrent claims on the same key
/// through the backing store's own transactional insert-or-update primitive
/// (conditional update, Lua script, row locking). An in-process lock is never
/// sufficient on its own, because other processes share the same counters.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Plain read of the current record for a key. No side effects.
    async fn get(&self, key: &str) -> Result<Option<QuotaRecord>, QuotaStoreError>;

    /// Atomically claim one slot.
    ///
    /// When the key is absent or its stored window has expired, a fresh
    /// window starting at `now_ms` is created. The counter is incremented
    /// only while it is below `max_requests`, so a persisted record never
    /// exceeds its policy's budget inside a live window.
    async fn upsert(&self, claim: &QuotaClaim) -> Result<ClaimOutcome, QuotaStoreError>;

    /// Delete every record whose window ended before `now_ms`.
    ///
    /// Hygiene only: expired records are already treated as fresh windows on
    /// read, so skipping the sweep never affects correctness. Safe to call
    /// concurrently. Returns the number of records deleted.
    async fn sweep(&self, now_ms: i64) -> Result<u64, QuotaStoreError>;
}

/// Quota store errors.
#[derive(Debug, thiserror::Error)]
pub enum QuotaStoreError {
    #[error("Backend error: {0}")]
    Backend(String),
}
