//! # Spark Shared
//!
//! Types shared between the server and the browser client.
//! In a full-stack Rust setup this crate compiles for both the server and
//! WASM, so it stays free of infrastructure dependencies.

pub mod dto;
pub mod quota_cache;
pub mod rate_limit;
pub mod response;

pub use quota_cache::ClientQuotaCache;
pub use rate_limit::{RateLimitHeaders, RateLimitRejection};
pub use response::{ApiResponse, ErrorResponse};
