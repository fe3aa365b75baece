//! SeaORM entity for rate anomaly alerts.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "exchange_rate_alerts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// 'high_change', 'fetch_error', 'source_fallback', 'manual_override'
    pub alert_type: String,
    pub exchange_rate_id: i32,
    #[sea_orm(column_type = "Decimal(Some((10, 4)))", nullable)]
    pub threshold_value: Option<Decimal>,
    pub message: String,
    pub acknowledged: bool,
    pub acknowledged_by: Option<String>,
    pub acknowledged_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::exchange_rates::Entity",
        from = "Column::ExchangeRateId",
        to = "super::exchange_rates::Column::Id",
        on_delete = "Cascade"
    )]
    ExchangeRate,
}

impl Related<super::exchange_rates::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExchangeRate.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
