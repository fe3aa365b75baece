use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::exchange_rate_alerts;

#[derive(Debug, Clone, Deserialize)]
pub struct AlertsQuery {
    pub acknowledged: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AcknowledgeRequest {
    pub actor: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertResponse {
    pub id: i32,
    pub alert_type: String,
    pub exchange_rate_id: i32,
    pub threshold_value: Option<Decimal>,
    pub message: String,
    pub acknowledged: bool,
    pub acknowledged_by: Option<String>,
    pub acknowledged_at: Option<DateTime<FixedOffset>>,
    pub created_at: DateTime<FixedOffset>,
}

impl From<exchange_rate_alerts::Model> for AlertResponse {
    fn from(alert: exchange_rate_alerts::Model) -> Self {
        Self {
            id: alert.id,
            alert_type: alert.alert_type,
            exchange_rate_id: alert.exchange_rate_id,
            threshold_value: alert.threshold_value,
            message: alert.message,
            acknowledged: alert.acknowledged,
            acknowledged_by: alert.acknowledged_by,
            acknowledged_at: alert.acknowledged_at,
            created_at: alert.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertListResponse {
    pub alerts: Vec<AlertResponse>,
}
