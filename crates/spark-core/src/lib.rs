//! # Spark Core
//!
//! The domain layer of the Spark quota service: policy catalog, fixed-window
//! decision algorithm, anonymous-identity resolution, and the ports the
//! infrastructure layer implements. Pure business logic with zero
//! infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod identity;
pub mod limiter;
pub mod policy;
pub mod ports;

pub use error::{LimitError, QuotaError};
pub use identity::{CallContext, IdentityResolver, ResolvedIdentity};
pub use limiter::RateLimiter;
pub use policy::{Policy, PolicyCatalog};
