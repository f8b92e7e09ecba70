//! Redis quota store.
//!
//! Each record is a small hash; the claim runs as one Lua script, which Redis
//! executes atomically, so concurrent claims from any number of service
//! instances serialize on the server.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};

use spark_core::domain::QuotaRecord;
use spark_core::ports::{ClaimOutcome, QuotaClaim, QuotaStore, QuotaStoreError};

/// Redis quota store configuration.
#[derive(Debug, Clone)]
pub struct RedisQuotaConfig {
    pub url: String,
    pub connect_timeout: Duration,
    /// Namespace prepended to every record key.
    pub key_prefix: String,
}

impl Default for RedisQuotaConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connect_timeout: Duration::from_secs(5),
            key_prefix: "quota".to_string(),
        }
    }
}

impl RedisQuotaConfig {
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            connect_timeout: Duration::from_secs(
                std::env::var("REDIS_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            key_prefix: std::env::var("QUOTA_KEY_PREFIX").unwrap_or_else(|_| "quota".to_string()),
        }
    }
}

/// Quota store backed by a shared Redis instance.
pub struct RedisQuotaStore {
    conn: ConnectionManager,
    config: RedisQuotaConfig,
    /// Atomic fixed-window claim.
    claim_script: Script,
}

impl RedisQuotaStore {
    pub async fn new(config: RedisQuotaConfig) -> Result<Self, QuotaStoreError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| QuotaStoreError::Backend(e.to_string()))?;

        // Bound the connection attempt so startup does not hang on an
        // unreachable Redis.
        let conn_manager_fut = ConnectionManager::new(client);
        let conn = tokio::time::timeout(config.connect_timeout, conn_manager_fut)
            .await
            .map_err(|_| QuotaStoreError::Backend("Connection timed out".to_string()))?
            .map_err(|e| QuotaStoreError::Backend(e.to_string()))?;

        // Fresh window when absent or expired, increment only below the
        // budget, expire the hash at the window end.
        // Returns: [claimed, requests, reset_time_ms]
        let claim_script = Script::new(
            r#"
            local key = KEYS[1]
            local max_requests = tonumber(ARGV[1])
            local window_ms = tonumber(ARGV[2])
            local now_ms = tonumber(ARGV[3])

            local requests = tonumber(redis.call('HGET', key, 'requests') or '0')
            local reset = tonumber(redis.call('HGET', key, 'reset_time_ms') or '0')
            if reset <= now_ms then
                requests = 0
                reset = now_ms + window_ms
            end

            local claimed = 0
            if requests < max_requests then
                requests = requests + 1
                claimed = 1
            end

            redis.call('HSET', key,
                'requests', requests,
                'reset_time_ms', reset,
                'updated_at_ms', now_ms)
            redis.call('PEXPIREAT', key, reset)
            return {claimed, requests, reset}
            "#,
        );

        tracing::info!(url = %config.url, "Connected to Redis quota store");

        Ok(Self {
            conn,
            config,
            claim_script,
        })
    }

    pub async fn from_env() -> Result<Self, QuotaStoreError> {
        Self::new(RedisQuotaConfig::from_env()).await
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.config.key_prefix, key)
    }
}

#[async_trait]
impl QuotaStore for RedisQuotaStore {
    async fn get(&self, key: &str) -> Result<Option<QuotaRecord>, QuotaStoreError> {
        let mut conn = self.conn.clone();
        let fields: Vec<Option<i64>> = conn
            .hget(
                self.namespaced(key),
                &["requests", "reset_time_ms", "updated_at_ms"],
            )
            .await
            .map_err(|e| QuotaStoreError::Backend(e.to_string()))?;

        let record = match (
            fields.first().copied().flatten(),
            fields.get(1).copied().flatten(),
            fields.get(2).copied().flatten(),
        ) {
            (Some(requests), Some(reset_time_ms), Some(updated_at_ms)) => Some(QuotaRecord {
                key: key.to_string(),
                requests: requests.max(0) as u32,
                reset_time_ms,
                updated_at_ms,
            }),
            _ => None,
        };

        Ok(record)
    }

    async fn upsert(&self, claim: &QuotaClaim) -> Result<ClaimOutcome, QuotaStoreError> {
        let mut conn = self.conn.clone();

        let result: Vec<i64> = self
            .claim_script
            .key(self.namespaced(&claim.key))
            .arg(claim.max_requests)
            .arg(claim.window_ms)
            .arg(claim.now_ms)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| QuotaStoreError::Backend(e.to_string()))?;

        let claimed = result.first().copied().unwrap_or(0) == 1;
        let requests = result.get(1).copied().unwrap_or(0).max(0) as u32;
        let reset_time_ms = result
            .get(2)
            .copied()
            .unwrap_or(claim.now_ms + claim.window_ms);

        Ok(ClaimOutcome {
            claimed,
            record: QuotaRecord {
                key: claim.key.clone(),
                requests,
                reset_time_ms,
                updated_at_ms: claim.now_ms,
            },
        })
    }

    async fn sweep(&self, _now_ms: i64) -> Result<u64, QuotaStoreError> {
        // PEXPIREAT on every write already ties each hash's lifetime to its
        // window, so Redis does the deleting on its own.
        Ok(0)
    }
}
