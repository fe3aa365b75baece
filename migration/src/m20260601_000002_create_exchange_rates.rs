use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Append-only log of every fetch attempt, successful or not
        manager
            .create_table(
                Table::create()
                    .table(ExchangeRates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExchangeRates::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ExchangeRates::UsdToVes)
                            .decimal_len(18, 6)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExchangeRates::Source)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExchangeRates::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExchangeRates::IsActive)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ExchangeRates::FetchSuccess)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(ExchangeRates::ErrorMessage).text().null())
                    .col(
                        ColumnDef::new(ExchangeRates::ChangePercentage)
                            .decimal_len(10, 4)
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Lookups: active pointer, and "rate at timestamp" queries
        manager
            .create_index(
                Index::create()
                    .name("idx_exchange_rates_active")
                    .table(ExchangeRates::Table)
                    .col(ExchangeRates::IsActive)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_exchange_rates_success_time")
                    .table(ExchangeRates::Table)
                    .col(ExchangeRates::FetchSuccess)
                    .col((ExchangeRates::Timestamp, IndexOrder::Desc))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ExchangeRates::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ExchangeRates {
    Table,
    Id,
    UsdToVes,
    Source,
    Timestamp,
    IsActive,
    FetchSuccess,
    ErrorMessage,
    ChangePercentage,
}
