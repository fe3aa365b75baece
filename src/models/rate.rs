use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::exchange_rates;

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentRateQuery {
    #[serde(default)]
    pub force_fetch: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateHistoryQuery {
    pub start: Option<DateTime<FixedOffset>>,
    pub end: Option<DateTime<FixedOffset>>,
    pub source: Option<String>,
    pub fetch_success: Option<bool>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateAtQuery {
    pub timestamp: DateTime<FixedOffset>,
}

/// Projection of one rate log record.
#[derive(Debug, Clone, Serialize)]
pub struct RateRecordResponse {
    pub id: i32,
    pub usd_to_ves: Decimal,
    pub source: String,
    pub timestamp: DateTime<FixedOffset>,
    pub is_active: bool,
    pub fetch_success: bool,
    pub error_message: Option<String>,
    pub change_percentage: Option<Decimal>,
}

impl From<exchange_rates::Model> for RateRecordResponse {
    fn from(record: exchange_rates::Model) -> Self {
        Self {
            id: record.id,
            usd_to_ves: record.usd_to_ves,
            source: record.source,
            timestamp: record.timestamp,
            is_active: record.is_active,
            fetch_success: record.fetch_success,
            error_message: record.error_message,
            change_percentage: record.change_percentage,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RateHistoryResponse {
    pub records: Vec<RateRecordResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManualRateRequest {
    pub rate: Decimal,
    pub actor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConvertRequest {
    pub amount: Decimal,
    pub from_currency: String,
    pub to_currency: String,
    pub rate: Option<Decimal>,
}

/// Pin request from the order/payment collaborator. Exactly one of
/// `order_id` / `payment_id` must be set.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotRequest {
    pub order_id: Option<i32>,
    pub payment_id: Option<i32>,
    pub amount_usd: Decimal,
}
