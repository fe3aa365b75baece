//! SeaORM entity for customer-submitted Pago Móvil transfer claims.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pago_movil_verifications")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub order_id: Option<i32>,
    /// Normalized cédula/RIF: V-12345678 or J-12345678-0
    pub sender_id: String,
    /// Digits only, 10-11 long
    pub sender_phone: String,
    pub bank_code: String,
    pub recipient: String,
    #[sea_orm(column_type = "Decimal(Some((18, 2)))")]
    pub amount_ves: Decimal,
    /// Rate frozen at submission time; never recomputed
    #[sea_orm(column_type = "Decimal(Some((18, 6)))")]
    pub exchange_rate_used: Decimal,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub usd_equivalent: Decimal,
    /// 'pending', 'approved', 'rejected'
    pub status: String,
    /// Only field staff may edit after the request reaches a terminal state
    pub notes: Option<String>,
    /// Staff member who approved or rejected, set on either transition
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::orders::Entity",
        from = "Column::OrderId",
        to = "super::orders::Column::Id",
        on_delete = "SetNull"
    )]
    Order,
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
