//! Fixed-window rate limiter.
//!
//! Applies a [`Policy`] to an identifier through the [`QuotaStore`]. The
//! read-decide-write sequence for one key lives inside a single store
//! `upsert`, which is what keeps two simultaneous checks for the last slot
//! from both being allowed, across threads and across service instances.

use std::sync::Arc;

use crate::domain::Decision;
use crate::error::{LimitError, QuotaError, RATE_LIMIT_EXCEEDED_CODE};
use crate::policy::PolicyCatalog;
use crate::ports::{Clock, QuotaClaim, QuotaStore, SystemClock};

/// Fraction of checks that also run an inline store sweep.
const SWEEP_SAMPLE_RATE: f64 = 0.01;

pub struct RateLimiter {
    store: Arc<dyn QuotaStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn QuotaStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn with_system_clock(store: Arc<dyn QuotaStore>) -> Self {
        Self::new(store, Arc::new(SystemClock))
    }

    /// Check the policy for an identifier, consuming one slot when allowed.
    ///
    /// A denied decision is a routine `Ok` outcome, not an error; callers
    /// translate it into the 429 contract themselves.
    pub async fn check(&self, policy_name: &str, identifier: &str) -> Result<Decision, QuotaError> {
        let policy = PolicyCatalog::get(policy_name)?;
        let now_ms = self.clock.now_ms();

        let outcome = self
            .store
            .upsert(&QuotaClaim {
                key: policy.key_for(identifier),
                max_requests: policy.max_requests,
                window_ms: policy.window_ms,
                now_ms,
            })
            .await?;

        let decision = Decision {
            allowed: outcome.claimed,
            remaining: policy.max_requests.saturating_sub(outcome.record.requests),
            reset_time_ms: outcome.record.reset_time_ms,
            total: policy.max_requests,
        };

        if decision.allowed {
            tracing::debug!(
                policy = policy.name,
                identifier,
                remaining = decision.remaining,
                "rate limit check passed"
            );
        } else {
            tracing::info!(
                policy = policy.name,
                identifier,
                reset_time_ms = decision.reset_time_ms,
                "rate limit exhausted"
            );
        }

        self.maybe_sweep(now_ms).await;

        Ok(decision)
    }

    /// Read-only decision: what `check` would say right now, without
    /// consuming a slot. Used to seed client-side state.
    ///
    /// For a key with no live record the reset time is prospective: the
    /// window only actually starts on the first consuming check.
    pub async fn peek(&self, policy_name: &str, identifier: &str) -> Result<Decision, QuotaError> {
        let policy = PolicyCatalog::get(policy_name)?;
        let now_ms = self.clock.now_ms();

        let record = self
            .store
            .get(&policy.key_for(identifier))
            .await?
            .filter(|record| !record.is_expired(now_ms));

        let decision = match record {
            Some(record) => Decision {
                allowed: record.requests < policy.max_requests,
                remaining: policy.max_requests.saturating_sub(record.requests),
                reset_time_ms: record.reset_time_ms,
                total: policy.max_requests,
            },
            None => Decision {
                allowed: policy.max_requests > 0,
                remaining: policy.max_requests,
                reset_time_ms: now_ms + policy.window_ms,
                total: policy.max_requests,
            },
        };

        Ok(decision)
    }

    /// Build the structured rejection for a denied decision.
    pub fn build_limit_error(&self, decision: &Decision) -> LimitError {
        let now_ms = self.clock.now_ms();
        let wait_ms = (decision.reset_time_ms - now_ms).max(0);

        LimitError {
            code: RATE_LIMIT_EXCEEDED_CODE,
            remaining: decision.remaining,
            total: decision.total,
            reset_time_ms: decision.reset_time_ms,
            retry_after_secs: (wait_ms as u64).div_ceil(1000),
            message: format!(
                "Rate limit exceeded. Try again in {}.",
                human_duration(wait_ms)
            ),
        }
    }

    /// Opportunistic housekeeping: on a sampled fraction of checks, delete
    /// expired records. Failures are logged and swallowed; correctness never
    /// depends on the sweep running.
    async fn maybe_sweep(&self, now_ms: i64) {
        if rand::random::<f64>() >= SWEEP_SAMPLE_RATE {
            return;
        }

        match self.store.sweep(now_ms).await {
            Ok(deleted) if deleted > 0 => {
                tracing::debug!(deleted, "swept expired quota records");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "quota record sweep failed"),
        }
    }
}

/// Rough human-readable duration for rejection messages.
fn human_duration(ms: i64) -> String {
    fn count(n: u64, unit: &str) -> String {
        if n == 1 {
            format!("1 {unit}")
        } else {
            format!("{n} {unit}s")
        }
    }

    let secs = (ms.max(0) as u64).div_ceil(1000).max(1);
    if secs < 60 {
        count(secs, "second")
    } else if secs < 3600 {
        count(secs.div_ceil(60), "minute")
    } else if secs < 86_400 {
        count(secs.div_ceil(3600), "hour")
    } else {
        count(secs.div_ceil(86_400), "day")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::domain::QuotaRecord;
    use crate::ports::{ClaimOutcome, ManualClock, QuotaStoreError};
    use crate::policy;

    /// Minimal conforming store for exercising the limiter in isolation.
    #[derive(Default)]
    struct TestStore {
        records: Mutex<HashMap<String, QuotaRecord>>,
    }

    #[async_trait]
    impl QuotaStore for TestStore {
        async fn get(&self, key: &str) -> Result<Option<QuotaRecord>, QuotaStoreError> {
            Ok(self.records.lock().unwrap().get(key).cloned())
        }

        async fn upsert(&self, claim: &QuotaClaim) -> Result<ClaimOutcome, QuotaStoreError> {
            let mut records = self.records.lock().unwrap();
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
            let mut records = self.records.lock().unwrap();
            let before = records.len();
            records.retain(|_, record| record.reset_time_ms >= now_ms);
            Ok((before - records.len()) as u64)
        }
    }

    const NOW: i64 = 1_700_000_000_000;

    fn limiter_at(now_ms: i64) -> (RateLimiter, Arc<ManualClock>) {
        let clock = ManualClock::at(now_ms);
        let limiter = RateLimiter::new(Arc::new(TestStore::default()), clock.clone());
        (limiter, clock)
    }

    #[tokio::test]
    async fn budget_counts_down_then_denies() {
        let (limiter, _) = limiter_at(NOW);
        let policy = policy::AUTH_IDEAS;

        for expected_remaining in (0..policy.max_requests).rev() {
            let decision = limiter.check(policy.name, "user-1").await.unwrap();
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
            assert_eq!(decision.total, policy.max_requests);
            assert_eq!(decision.reset_time_ms, NOW + policy.window_ms);
        }

        let denied = limiter.check(policy.name, "user-1").await.unwrap();
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
    }

    #[tokio::test]
    async fn window_expiry_grants_a_fresh_budget() {
        let (limiter, clock) = limiter_at(NOW);
        let policy = policy::AUTH_IDEAS;

        for _ in 0..policy.max_requests {
            limiter.check(policy.name, "user-1").await.unwrap();
        }
        assert!(!limiter.check(policy.name, "user-1").await.unwrap().allowed);

        clock.advance(policy.window_ms + 1);

        let decision = limiter.check(policy.name, "user-1").await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.remaining, policy.max_requests - 1);
        assert_eq!(decision.reset_time_ms, clock.now_ms() + policy.window_ms);
    }

    #[tokio::test]
    async fn identifiers_are_isolated() {
        let (limiter, _) = limiter_at(NOW);

        for _ in 0..policy::ANON_IDEAS.max_requests {
            limiter.check("ANON_IDEAS", "a").await.unwrap();
        }
        assert!(!limiter.check("ANON_IDEAS", "a").await.unwrap().allowed);

        let other = limiter.check("ANON_IDEAS", "b").await.unwrap();
        assert!(other.allowed);
    }

    #[tokio::test]
    async fn hundred_votes_then_denial_with_bounded_retry() {
        let (limiter, _) = limiter_at(NOW);

        for i in 0..100u32 {
            let decision = limiter.check("AUTH_VOTES", "user-42").await.unwrap();
            assert!(decision.allowed, "call {} should be allowed", i + 1);
            assert_eq!(decision.remaining, 99 - i);
        }

        let denied = limiter.check("AUTH_VOTES", "user-42").await.unwrap();
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);

        let err = limiter.build_limit_error(&denied);
        assert!(err.retry_after_secs <= 60);
        assert_eq!(err.code, "RATE_LIMIT_EXCEEDED");
    }

    #[tokio::test]
    async fn unknown_policy_is_a_configuration_error() {
        let (limiter, _) = limiter_at(NOW);
        let err = limiter.check("NOT_A_POLICY", "user-1").await.unwrap_err();
        assert!(matches!(err, QuotaError::UnknownPolicy(_)));
    }

    #[tokio::test]
    async fn peek_does_not_consume_budget() {
        let (limiter, _) = limiter_at(NOW);

        let fresh = limiter.peek("ANON_IDEAS", "anon-1").await.unwrap();
        assert!(fresh.allowed);
        assert_eq!(fresh.remaining, 1);

        limiter.check("ANON_IDEAS", "anon-1").await.unwrap();

        let spent = limiter.peek("ANON_IDEAS", "anon-1").await.unwrap();
        assert!(!spent.allowed);
        assert_eq!(spent.remaining, 0);

        // Peeking again changes nothing.
        let again = limiter.peek("ANON_IDEAS", "anon-1").await.unwrap();
        assert_eq!(again, spent);
    }

    #[tokio::test]
    async fn limit_error_message_is_human_readable() {
        let (limiter, _) = limiter_at(NOW);
        let decision = Decision {
            allowed: false,
            remaining: 0,
            reset_time_ms: NOW + 45_000,
            total: 1,
        };

        let err = limiter.build_limit_error(&decision);
        assert_eq!(err.retry_after_secs, 45);
        assert_eq!(err.total, 1);
        assert_eq!(err.message, "Rate limit exceeded. Try again in 45 seconds.");
    }

    #[test]
    fn human_durations_round_up() {
        assert_eq!(human_duration(500), "1 second");
        assert_eq!(human_duration(45_000), "45 seconds");
        assert_eq!(human_duration(61_000), "2 minutes");
        assert_eq!(human_duration(3_600_000), "1 hour");
        assert_eq!(human_duration(86_400_000), "1 day");
        assert_eq!(human_duration(172_800_000), "2 days");
    }
}
