use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ExchangeRateAlerts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExchangeRateAlerts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ExchangeRateAlerts::AlertType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExchangeRateAlerts::ExchangeRateId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExchangeRateAlerts::ThresholdValue)
                            .decimal_len(10, 4)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ExchangeRateAlerts::Message)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExchangeRateAlerts::Acknowledged)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ExchangeRateAlerts::AcknowledgedBy)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ExchangeRateAlerts::AcknowledgedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ExchangeRateAlerts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_alerts_exchange_rate")
                            .from(ExchangeRateAlerts::Table, ExchangeRateAlerts::ExchangeRateId)
                            .to(ExchangeRates::Table, ExchangeRates::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_alerts_acknowledged_time")
                    .table(ExchangeRateAlerts::Table)
                    .col(ExchangeRateAlerts::Acknowledged)
                    .col((ExchangeRateAlerts::CreatedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ExchangeRateAlerts::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ExchangeRateAlerts {
    Table,
    Id,
    AlertType,
    ExchangeRateId,
    ThresholdValue,
    Message,
    Acknowledged,
    AcknowledgedBy,
    AcknowledgedAt,
    CreatedAt,
}

#[derive(Iden)]
enum ExchangeRates {
    Table,
    Id,
}
