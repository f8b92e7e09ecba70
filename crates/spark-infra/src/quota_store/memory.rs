//! In-memory quota store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use spark_core::domain::QuotaRecord;
use spark_core::ports::{ClaimOutcome, QuotaClaim, QuotaStore, QuotaStoreError};

/// Process-local quota store.
///
/// This is the fallback when no shared backend is configured, and the store
/// the test suite runs against. Counters live in one process only, so with
/// multiple service instances each instance enforces its own budget. Never
/// deploy it as the sole mechanism behind a fleet.
#[derive(Debug, Default)]
pub struct InMemoryQuotaStore {
    records: Mutex<HashMap<String, QuotaRecord>>,
}

impl InMemoryQuotaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuotaStore for InMemoryQuotaStore {
    async fn get(&self, key: &str) -> Result<Option<QuotaRecord>, QuotaStoreError> {
        let records = self
            .records
            .lock()
            .map_err(|e| QuotaStoreError::Backend(e.to_string()))?;
        Ok(records.get(key).cloned())
    }

    async fn upsert(&self, claim: &QuotaClaim) -> Result<ClaimOutcome, QuotaStoreError> {
        // The whole read-decide-write runs under one lock; within this
        // process that is the same serialization the shared backends get
        // from their transactional upsert.
        let mut records = self
            .records
            .lock()
            .map_err(|e| QuotaStoreError::Backend(e.to_string()))?;

        let mut record = match records.get(&claim.key) {
            Some(existing) if !existing.is_expired(claim.now_ms) => existing.clone(),
            _ => QuotaRecord {
                key: claim.key.clone(),
                requests: 0,
                reset_time_ms: claim.now_ms + claim.window_ms,
                updated_at_ms: claim.now_ms,
            },
        };

        let claimed = record.requests < claim.max_requests;
        if claimed {
            record.requests += 1;
            record.updated_at_ms = claim.now_ms;
        }
        records.insert(claim.key.clone(), record.clone());

        Ok(ClaimOutcome { claimed, record })
    }

    async fn sweep(&self, now_ms: i64) -> Result<u64, QuotaStoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| QuotaStoreError::Backend(e.to_string()))?;
        let before = records.len();
        records.retain(|_, record| record.reset_time_ms >= now_ms);
        Ok((before - records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    const NOW: i64 = 1_700_000_000_000;
    const WINDOW: i64 = 60_000;

    fn claim_at(key: &str, max_requests: u32, now_ms: i64) -> QuotaClaim {
        QuotaClaim {
            key: key.to_string(),
            max_requests,
            window_ms: WINDOW,
            now_ms,
        }
    }

    #[tokio::test]
    async fn first_claim_creates_the_record() {
        let store = InMemoryQuotaStore::new();
        assert!(store.get("auth-votes:u1").await.unwrap().is_none());

        let outcome = store.upsert(&claim_at("auth-votes:u1", 3, NOW)).await.unwrap();
        assert!(outcome.claimed);
        assert_eq!(outcome.record.requests, 1);
        assert_eq!(outcome.record.reset_time_ms, NOW + WINDOW);

        let stored = store.get("auth-votes:u1").await.unwrap().unwrap();
        assert_eq!(stored, outcome.record);
    }

    #[tokio::test]
    async fn counter_never_exceeds_the_budget_in_a_live_window() {
        let store = InMemoryQuotaStore::new();

        for _ in 0..10 {
            store.upsert(&claim_at("k", 3, NOW)).await.unwrap();
        }

        let record = store.get("k").await.unwrap().unwrap();
        assert_eq!(record.requests, 3);
    }

    #[tokio::test]
    async fn expired_record_is_a_fresh_window_without_any_sweep() {
        let store = InMemoryQuotaStore::new();

        store.upsert(&claim_at("k", 1, NOW)).await.unwrap();
        let denied = store.upsert(&claim_at("k", 1, NOW)).await.unwrap();
        assert!(!denied.claimed);

        // Past the reset time the physically-present record no longer counts.
        let later = NOW + WINDOW;
        let outcome = store.upsert(&claim_at("k", 1, later)).await.unwrap();
        assert!(outcome.claimed);
        assert_eq!(outcome.record.requests, 1);
        assert_eq!(outcome.record.reset_time_ms, later + WINDOW);
    }

    #[tokio::test]
    async fn keys_do_not_interfere() {
        let store = InMemoryQuotaStore::new();

        store.upsert(&claim_at("p:a", 1, NOW)).await.unwrap();
        assert!(!store.upsert(&claim_at("p:a", 1, NOW)).await.unwrap().claimed);

        assert!(store.upsert(&claim_at("p:b", 1, NOW)).await.unwrap().claimed);
    }

    #[tokio::test]
    async fn sweep_deletes_only_expired_records() {
        let store = InMemoryQuotaStore::new();
        store.upsert(&claim_at("old", 1, NOW)).await.unwrap();
        store
            .upsert(&claim_at("live", 1, NOW + WINDOW / 2))
            .await
            .unwrap();

        let deleted = store.sweep(NOW + WINDOW).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(store.get("old").await.unwrap().is_none());
        assert!(store.get("live").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn concurrent_claims_on_the_last_slots_admit_exactly_the_budget() {
        let store = Arc::new(InMemoryQuotaStore::new());
        let budget = 5u32;

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.upsert(&claim_at("race", budget, NOW)).await.unwrap()
            }));
        }

        let mut claimed = 0;
        for handle in handles {
            if handle.await.unwrap().claimed {
                claimed += 1;
            }
        }

        assert_eq!(claimed, budget);
        let record = store.get("race").await.unwrap().unwrap();
        assert_eq!(record.requests, budget);
    }
}
