//! Anomaly detection over newly committed rate records.
//!
//! Rule evaluation is pure; persistence failures are logged and swallowed so
//! that alerting can never break the rate-fetch path.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter, QueryOrder, Set};
use std::sync::Arc;

use crate::entities::{exchange_rate_alerts, exchange_rates, prelude::*};
use crate::error::Error;

/// Swing size (absolute percent) that triggers a high-change alert.
pub const HIGH_CHANGE_THRESHOLD: Decimal = dec!(5.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertType {
    HighChange,
    FetchError,
    SourceFallback,
    ManualOverride,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::HighChange => "high_change",
            AlertType::FetchError => "fetch_error",
            AlertType::SourceFallback => "source_fallback",
            AlertType::ManualOverride => "manual_override",
        }
    }
}

/// A rule that fired, not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertDraft {
    pub alert_type: AlertType,
    pub threshold_value: Option<Decimal>,
    pub message: String,
}

/// Evaluate every rule against one record. Each rule fires at most once.
pub fn evaluate(record: &exchange_rates::Model) -> Vec<AlertDraft> {
    let mut drafts = Vec::new();

    if let Some(change) = record.change_percentage {
        if change.abs() >= HIGH_CHANGE_THRESHOLD {
            drafts.push(AlertDraft {
                alert_type: AlertType::HighChange,
                threshold_value: Some(change),
                message: format!(
                    "Exchange rate changed by {}% from previous rate. New rate: {} VES per USD.",
                    change, record.usd_to_ves
                ),
            });
        }
    }

    if !record.fetch_success {
        drafts.push(AlertDraft {
            alert_type: AlertType::FetchError,
            threshold_value: None,
            message: format!(
                "Failed to fetch exchange rate from external sources. Serving rate: {} VES per USD. Error: {}",
                record.usd_to_ves,
                record.error_message.as_deref().unwrap_or("unknown")
            ),
        });
    }

    if record.source == "fallback" {
        drafts.push(AlertDraft {
            alert_type: AlertType::SourceFallback,
            threshold_value: None,
            message: format!(
                "All exchange rate sources failed. Using fallback rate: {} VES per USD.",
                record.usd_to_ves
            ),
        });
    }

    if record.source == "manual" {
        drafts.push(AlertDraft {
            alert_type: AlertType::ManualOverride,
            threshold_value: None,
            message: format!(
                "Exchange rate manually set to {} VES per USD.",
                record.usd_to_ves
            ),
        });
    }

    drafts
}

#[derive(Clone)]
pub struct AlertEngine {
    db: Arc<DatabaseConnection>,
}

impl AlertEngine {
    pub fn new(db: impl Into<Arc<DatabaseConnection>>) -> Self {
        Self { db: db.into() }
    }

    /// Evaluate and persist alerts for a committed record. Never returns an
    /// error: rate continuity takes priority over alerting.
    pub async fn run(&self, record: &exchange_rates::Model) {
        for draft in evaluate(record) {
            let row = exchange_rate_alerts::ActiveModel {
                alert_type: Set(draft.alert_type.as_str().to_owned()),
                exchange_rate_id: Set(record.id),
                threshold_value: Set(draft.threshold_value),
                message: Set(draft.message.clone()),
                acknowledged: Set(false),
                created_at: Set(Utc::now().into()),
                ..Default::default()
            };

            if let Err(err) = row.insert(self.db.as_ref()).await {
                tracing::error!(
                    "Failed to store {} alert for rate record {}: {}",
                    draft.alert_type.as_str(),
                    record.id,
                    err
                );
            } else if draft.alert_type == AlertType::HighChange {
                tracing::warn!("High change alert: {}", draft.message);
            }
        }
    }

    /// Alerts newest first, optionally filtered by acknowledgement state.
    pub async fn list(
        &self,
        acknowledged: Option<bool>,
    ) -> Result<Vec<exchange_rate_alerts::Model>, Error> {
        let mut query = ExchangeRateAlerts::find();
        if let Some(flag) = acknowledged {
            query = query.filter(exchange_rate_alerts::Column::Acknowledged.eq(flag));
        }
        let alerts = query
            .order_by(exchange_rate_alerts::Column::CreatedAt, Order::Desc)
            .all(self.db.as_ref())
            .await?;
        Ok(alerts)
    }

    /// Mark an alert acknowledged. Acknowledging twice is a no-op on the
    /// original acknowledgement.
    pub async fn acknowledge(
        &self,
        alert_id: i32,
        actor: &str,
    ) -> Result<exchange_rate_alerts::Model, Error> {
        let alert = ExchangeRateAlerts::find_by_id(alert_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| Error::NotFound(format!("alert {} not found", alert_id)))?;

        if alert.acknowledged {
            return Ok(alert);
        }

        let mut active: exchange_rate_alerts::ActiveModel = alert.into();
        active.acknowledged = Set(true);
        active.acknowledged_by = Set(Some(actor.to_owned()));
        active.acknowledged_at = Set(Some(Utc::now().into()));
        let updated = active.update(self.db.as_ref()).await?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn record(
        rate: Decimal,
        source: &str,
        fetch_success: bool,
        change_percentage: Option<Decimal>,
    ) -> exchange_rates::Model {
        exchange_rates::Model {
            id: 1,
            usd_to_ves: rate,
            source: source.to_owned(),
            timestamp: Utc::now().into(),
            is_active: true,
            fetch_success,
            error_message: None,
            change_percentage,
        }
    }

    #[test]
    fn quiet_successful_fetch_raises_nothing() {
        let drafts = evaluate(&record(dec!(36.5), "exchangerate_host", true, Some(dec!(1.2))));
        assert!(drafts.is_empty());
    }

    #[test]
    fn swing_at_threshold_fires_high_change() {
        let drafts = evaluate(&record(dec!(40.0), "exchangerate_host", true, Some(dec!(5.0))));
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].alert_type, AlertType::HighChange);
        assert_eq!(drafts[0].threshold_value, Some(dec!(5.0)));
    }

    #[test]
    fn negative_swing_counts_by_magnitude() {
        let drafts = evaluate(&record(dec!(34.0), "exchangerate_host", true, Some(dec!(-6.3))));
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].alert_type, AlertType::HighChange);
    }

    #[test]
    fn swing_below_threshold_is_silent() {
        let drafts = evaluate(&record(dec!(37.0), "exchangerate_host", true, Some(dec!(4.9999))));
        assert!(drafts.is_empty());
    }

    #[test]
    fn fallback_commit_fires_fetch_error_and_fallback_rules() {
        let drafts = evaluate(&record(dec!(38.0), "fallback", false, None));
        let kinds: Vec<_> = drafts.iter().map(|d| d.alert_type).collect();
        assert_eq!(kinds, vec![AlertType::FetchError, AlertType::SourceFallback]);
    }

    #[test]
    fn manual_override_fires_its_own_rule() {
        let drafts = evaluate(&record(dec!(42.0), "manual", true, None));
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].alert_type, AlertType::ManualOverride);
    }

    #[tokio::test]
    async fn acknowledging_an_unknown_alert_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<exchange_rate_alerts::Model>::new()])
            .into_connection();

        let err = AlertEngine::new(db)
            .acknowledge(9, "staff")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    // No exec results are queued: a second acknowledgement must return the
    // original row without touching the database.
    #[tokio::test]
    async fn acknowledging_twice_is_a_no_op() {
        let acked = exchange_rate_alerts::Model {
            id: 3,
            alert_type: "high_change".into(),
            exchange_rate_id: 1,
            threshold_value: Some(dec!(6.1)),
            message: "swing".into(),
            acknowledged: true,
            acknowledged_by: Some("ana".into()),
            acknowledged_at: Some(Utc::now().into()),
            created_at: Utc::now().into(),
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![acked]])
            .into_connection();

        let alert = AlertEngine::new(db).acknowledge(3, "bruno").await.unwrap();
        assert_eq!(alert.acknowledged_by.as_deref(), Some("ana"));
    }
}
