//! Quota store implementations.

mod memory;

pub use memory::InMemoryQuotaStore;

#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "postgres")]
pub use postgres::PostgresQuotaStore;

#[cfg(feature = "redis")]
mod redis;
#[cfg(feature = "redis")]
pub use self::redis::{RedisQuotaConfig, RedisQuotaStore};
