use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PagoMovilVerifications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PagoMovilVerifications::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PagoMovilVerifications::UserId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PagoMovilVerifications::OrderId)
                            .integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PagoMovilVerifications::SenderId)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PagoMovilVerifications::SenderPhone)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PagoMovilVerifications::BankCode)
                            .string_len(8)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PagoMovilVerifications::Recipient)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PagoMovilVerifications::AmountVes)
                            .decimal_len(18, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PagoMovilVerifications::ExchangeRateUsed)
                            .decimal_len(18, 6)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PagoMovilVerifications::UsdEquivalent)
                            .decimal_len(15, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PagoMovilVerifications::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(PagoMovilVerifications::Notes).text().null())
                    .col(
                        ColumnDef::new(PagoMovilVerifications::ReviewedBy)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PagoMovilVerifications::ReviewedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PagoMovilVerifications::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .col(
                        ColumnDef::new(PagoMovilVerifications::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pago_movil_order")
                            .from(
                                PagoMovilVerifications::Table,
                                PagoMovilVerifications::OrderId,
                            )
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Sliding-window rate limit query: (user_id, created_at DESC)
        manager
            .create_index(
                Index::create()
                    .name("idx_pago_movil_user_time")
                    .table(PagoMovilVerifications::Table)
                    .col(PagoMovilVerifications::UserId)
                    .col((PagoMovilVerifications::CreatedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_pago_movil_status")
                    .table(PagoMovilVerifications::Table)
                    .col(PagoMovilVerifications::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(PagoMovilVerifications::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
enum PagoMovilVerifications {
    Table,
    Id,
    UserId,
    OrderId,
    SenderId,
    SenderPhone,
    BankCode,
    Recipient,
    AmountVes,
    ExchangeRateUsed,
    UsdEquivalent,
    Status,
    Notes,
    ReviewedBy,
    ReviewedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Orders {
    Table,
    Id,
}
