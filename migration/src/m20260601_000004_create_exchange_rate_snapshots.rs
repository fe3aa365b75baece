use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ExchangeRateSnapshots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExchangeRateSnapshots::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ExchangeRateSnapshots::OrderId).integer().null())
                    .col(
                        ColumnDef::new(ExchangeRateSnapshots::PaymentId)
                            .integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ExchangeRateSnapshots::UsdToVes)
                            .decimal_len(18, 6)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExchangeRateSnapshots::AmountUsd)
                            .decimal_len(15, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExchangeRateSnapshots::AmountVes)
                            .decimal_len(18, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExchangeRateSnapshots::SnapshotTimestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // One snapshot per order / per payment, enforced at the schema level
        manager
            .create_index(
                Index::create()
                    .name("idx_snapshots_order_unique")
                    .table(ExchangeRateSnapshots::Table)
                    .col(ExchangeRateSnapshots::OrderId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_snapshots_payment_unique")
                    .table(ExchangeRateSnapshots::Table)
                    .col(ExchangeRateSnapshots::PaymentId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(ExchangeRateSnapshots::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
enum ExchangeRateSnapshots {
    Table,
    Id,
    OrderId,
    PaymentId,
    UsdToVes,
    AmountUsd,
    AmountVes,
    SnapshotTimestamp,
}
