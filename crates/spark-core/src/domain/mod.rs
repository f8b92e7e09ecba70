//! Domain types - the objects the quota service reasons about.

mod quota;

pub use quota::{Decision, QuotaRecord};
