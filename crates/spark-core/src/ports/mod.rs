//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod clock;
mod quota_store;

pub use auth::{AuthError, TokenClaims, TokenService};
pub use clock::{Clock, ManualClock, SystemClock};
pub use quota_store::{ClaimOutcome, QuotaClaim, QuotaStore, QuotaStoreError};
