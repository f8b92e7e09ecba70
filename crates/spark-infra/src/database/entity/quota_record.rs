//! Quota record entity for SeaORM.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "quota_records")]
pub struct Model {
    /// `key_prefix:identifier`, unique per policy and identifier.
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    pub requests: i32,
    /// Epoch milliseconds when the current window ends.
    pub reset_time_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Conversion from SeaORM Model to the domain record.
impl From<Model> for spark_core::domain::QuotaRecord {
    fn from(model: Model) -> Self {
        Self {
            key: model.key,
            requests: model.requests.max(0) as u32,
            reset_time_ms: model.reset_time_ms,
            updated_at_ms: model.updated_at_ms,
        }
    }
}
