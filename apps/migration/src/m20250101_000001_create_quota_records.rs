use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(QuotaRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(QuotaRecords::Key)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(QuotaRecords::Requests).integer().not_null())
                    .col(
                        ColumnDef::new(QuotaRecords::ResetTimeMs)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(QuotaRecords::UpdatedAtMs)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // The sweeper deletes by reset_time_ms range, so keep it indexed.
        manager
            .create_index(
                Index::create()
                    .name("idx_quota_records_reset_time_ms")
                    .table(QuotaRecords::Table)
                    .col(QuotaRecords::ResetTimeMs)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(QuotaRecords::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum QuotaRecords {
    Table,
    Key,
    Requests,
    ResetTimeMs,
    UpdatedAtMs,
}
