//! SeaORM entity pinning the rate used for one financial event.
//!
//! Exactly one of `order_id` / `payment_id` is set. Rows are written once and
//! never updated; unique indexes on both columns back the pin-once rule.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "exchange_rate_snapshots")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub order_id: Option<i32>,
    pub payment_id: Option<i32>,
    #[sea_orm(column_type = "Decimal(Some((18, 6)))")]
    pub usd_to_ves: Decimal,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub amount_usd: Decimal,
    #[sea_orm(column_type = "Decimal(Some((18, 2)))")]
    pub amount_ves: Decimal,
    pub snapshot_timestamp: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
