//! SeaORM entities.

pub mod quota_record;
