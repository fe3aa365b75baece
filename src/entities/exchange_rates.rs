//! SeaORM entity for the append-only USD→VES exchange rate log.
//!
//! Every fetch attempt (successful or not) and every manual override lands
//! here. Records are never deleted; at most one row has `is_active = true`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "exchange_rates")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Rate of 1 USD in VES
    #[sea_orm(column_type = "Decimal(Some((18, 6)))")]
    pub usd_to_ves: Decimal,
    /// 'exchangerate_host', 'google_finance', 'open_exchange_rates', 'manual', 'fallback'
    pub source: String,
    pub timestamp: DateTimeWithTimeZone,
    pub is_active: bool,
    pub fetch_success: bool,
    pub error_message: Option<String>,
    /// Signed change vs. the previous successful record; null for the first
    #[sea_orm(column_type = "Decimal(Some((10, 4)))", nullable)]
    pub change_percentage: Option<Decimal>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::exchange_rate_alerts::Entity")]
    Alerts,
}

impl Related<super::exchange_rate_alerts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Alerts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
