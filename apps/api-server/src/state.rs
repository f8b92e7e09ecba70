//! Application state - shared across all handlers.

use std::sync::Arc;

use spark_core::ports::{QuotaStore, TokenService};
use spark_core::{IdentityResolver, RateLimiter};
use spark_infra::InMemoryQuotaStore;
use spark_infra::auth::JwtTokenService;

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub limiter: Arc<RateLimiter>,
    pub resolver: Arc<IdentityResolver>,
    pub quota_store: Arc<dyn QuotaStore>,
    pub token_service: Arc<dyn TokenService>,
}

impl AppState {
    /// Build the application state with the best available quota backend.
    pub async fn new(config: &AppConfig) -> Self {
        let quota_store = Self::init_quota_store(config).await;
        let limiter = Arc::new(RateLimiter::with_system_clock(quota_store.clone()));
        let resolver = Arc::new(IdentityResolver::new(limiter.clone()));
        let token_service: Arc<dyn TokenService> = Arc::new(JwtTokenService::from_env());

        tracing::info!("Application state initialized");

        Self {
            limiter,
            resolver,
            quota_store,
            token_service,
        }
    }

    /// Pick the quota backend: Redis, then Postgres, then in-memory.
    ///
    /// Budgets are only enforced fleet-wide when a shared backend is up; the
    /// in-memory fallback keeps a single instance working but is per-process.
    async fn init_quota_store(config: &AppConfig) -> Arc<dyn QuotaStore> {
        #[cfg(feature = "redis")]
        if config.redis_configured {
            match spark_infra::RedisQuotaStore::from_env().await {
                Ok(store) => return Arc::new(store),
                Err(e) => {
                    tracing::error!("Failed to connect to Redis quota store: {}. Trying next backend.", e);
                }
            }
        }

        #[cfg(feature = "postgres")]
        if let Some(db_config) = &config.database {
            match spark_infra::database::connect(db_config).await {
                Ok(conn) => return Arc::new(spark_infra::PostgresQuotaStore::new(conn)),
                Err(e) => {
                    tracing::error!("Failed to connect to Postgres quota store: {}.", e);
                }
            }
        }

        tracing::warn!(
            "No shared quota backend available. Falling back to the in-memory store; budgets will be per-process."
        );
        Arc::new(InMemoryQuotaStore::new())
    }
}
