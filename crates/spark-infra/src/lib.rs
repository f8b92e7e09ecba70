//! # Spark Infrastructure
//!
//! Concrete implementations of the ports defined in `spark-core`:
//! quota stores, database connections, and token services.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external dependencies, in-memory only
//! - `postgres` - PostgreSQL quota store via SeaORM
//! - `redis` - Redis quota store
//! - `auth` - JWT token service

pub mod database;
pub mod quota_store;

#[cfg(feature = "auth")]
pub mod auth;

// Re-exports - In-Memory
pub use quota_store::InMemoryQuotaStore;

pub use database::DatabaseConfig;

#[cfg(feature = "auth")]
pub use auth::{JwtConfig, JwtTokenService};

#[cfg(feature = "postgres")]
pub use quota_store::PostgresQuotaStore;

#[cfg(feature = "redis")]
pub use quota_store::{RedisQuotaConfig, RedisQuotaStore};
