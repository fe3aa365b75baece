use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::pago_movil_verifications;
use crate::services::pago_movil::BatchItemResult;

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyRequest {
    pub user_id: i32,
    pub order_id: Option<i32>,
    pub sender_id: String,
    pub sender_phone: String,
    pub bank_code: String,
    pub recipient: String,
    pub amount_ves: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusQuery {
    pub user_id: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdateRequest {
    /// 'approved' or 'rejected'
    pub status: String,
    pub notes: Option<String>,
    pub actor: Option<String>,
}

/// Notes are the only field staff may edit once a request is terminal;
/// `null` clears them.
#[derive(Debug, Clone, Deserialize)]
pub struct NotesUpdateRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchStatusUpdateRequest {
    pub ids: Vec<i32>,
    pub status: String,
    pub notes: Option<String>,
    pub actor: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchStatusUpdateResponse {
    pub results: Vec<BatchItemResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationResponse {
    pub id: i32,
    pub user_id: i32,
    pub order_id: Option<i32>,
    pub sender_id: String,
    pub sender_phone: String,
    pub bank_code: String,
    pub recipient: String,
    pub amount_ves: Decimal,
    pub exchange_rate_used: Decimal,
    pub usd_equivalent: Decimal,
    pub status: String,
    pub notes: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<FixedOffset>>,
    pub created_at: DateTime<FixedOffset>,
}

impl From<pago_movil_verifications::Model> for VerificationResponse {
    fn from(record: pago_movil_verifications::Model) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            order_id: record.order_id,
            sender_id: record.sender_id,
            sender_phone: record.sender_phone,
            bank_code: record.bank_code,
            recipient: record.recipient,
            amount_ves: record.amount_ves,
            exchange_rate_used: record.exchange_rate_used,
            usd_equivalent: record.usd_equivalent,
            status: record.status,
            notes: record.notes,
            reviewed_by: record.reviewed_by,
            reviewed_at: record.reviewed_at,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationListResponse {
    pub requests: Vec<VerificationResponse>,
}
