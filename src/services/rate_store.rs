//! Persistence layer for the exchange rate log: append-only commits, the
//! single active-record pointer, and point-in-time lookups.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::entities::{exchange_rates, prelude::*};
use crate::error::Error;
use crate::sources::SourceId;

/// One commit request: a fetch outcome (successful or failed) or a manual
/// override, headed for the append-only log.
#[derive(Debug, Clone)]
pub struct CommitRate {
    pub rate: Decimal,
    pub source: SourceId,
    pub fetch_success: bool,
    pub error_message: Option<String>,
}

/// Filters for the history endpoint.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub start: Option<chrono::DateTime<chrono::FixedOffset>>,
    pub end: Option<chrono::DateTime<chrono::FixedOffset>>,
    pub source: Option<String>,
    pub fetch_success: Option<bool>,
    pub limit: Option<u64>,
}

#[derive(Clone)]
pub struct RateStore {
    db: Arc<DatabaseConnection>,
    // Serializes activation so two concurrent commits can never both end up
    // active. The transaction below keeps the flip atomic against readers.
    commit_lock: Arc<Mutex<()>>,
}

/// `(new - prev) / prev * 100`, rounded to 4 decimal places. None when the
/// previous rate is zero (nothing meaningful to compare against).
pub fn compute_change_percentage(previous: Decimal, new: Decimal) -> Option<Decimal> {
    if previous.is_zero() {
        return None;
    }
    Some(((new - previous) / previous * dec!(100)).round_dp(4))
}

/// Failure logs are kept for audit but must not become the active rate;
/// everything else (fetched, manual, fallback substitution) does.
fn record_activates(source: SourceId, fetch_success: bool) -> bool {
    fetch_success || matches!(source, SourceId::Manual | SourceId::Fallback)
}

impl RateStore {
    pub fn new(db: impl Into<Arc<DatabaseConnection>>) -> Self {
        Self {
            db: db.into(),
            commit_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Append a record. For successful records the change percentage is
    /// computed against the most recent prior successful record; for records
    /// that activate, every other record is deactivated in the same
    /// transaction.
    pub async fn commit(&self, request: CommitRate) -> Result<exchange_rates::Model, Error> {
        let _guard = self.commit_lock.lock().await;
        let txn = self.db.begin().await?;

        let change_percentage = if request.fetch_success {
            let prior = ExchangeRates::find()
                .filter(exchange_rates::Column::FetchSuccess.eq(true))
                .order_by(exchange_rates::Column::Timestamp, Order::Desc)
                .one(&txn)
                .await?;
            prior.and_then(|p| compute_change_percentage(p.usd_to_ves, request.rate))
        } else {
            None
        };

        let activates = record_activates(request.source, request.fetch_success);
        if activates {
            ExchangeRates::update_many()
                .col_expr(exchange_rates::Column::IsActive, Expr::value(false))
                .filter(exchange_rates::Column::IsActive.eq(true))
                .exec(&txn)
                .await?;
        }

        let record = exchange_rates::ActiveModel {
            usd_to_ves: Set(request.rate),
            source: Set(request.source.as_str().to_owned()),
            timestamp: Set(Utc::now().into()),
            is_active: Set(activates),
            fetch_success: Set(request.fetch_success),
            error_message: Set(request.error_message),
            change_percentage: Set(change_percentage),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        tracing::info!(
            "Committed exchange rate {} VES/USD from {} (active: {})",
            record.usd_to_ves,
            record.source,
            record.is_active
        );

        Ok(record)
    }

    /// The single record currently considered authoritative, if any.
    pub async fn current_active(&self) -> Result<Option<exchange_rates::Model>, Error> {
        let record = ExchangeRates::find()
            .filter(exchange_rates::Column::IsActive.eq(true))
            .order_by(exchange_rates::Column::Timestamp, Order::Desc)
            .one(self.db.as_ref())
            .await?;
        Ok(record)
    }

    /// The latest successful record at or before `timestamp`. Answers "what
    /// rate applied at 14:02 on order #123" independent of snapshots.
    pub async fn at(
        &self,
        timestamp: chrono::DateTime<chrono::FixedOffset>,
    ) -> Result<Option<exchange_rates::Model>, Error> {
        let record = ExchangeRates::find()
            .filter(exchange_rates::Column::FetchSuccess.eq(true))
            .filter(exchange_rates::Column::Timestamp.lte(timestamp))
            .order_by(exchange_rates::Column::Timestamp, Order::Desc)
            .one(self.db.as_ref())
            .await?;
        Ok(record)
    }

    /// Fetch-attempt history, newest first.
    pub async fn history(
        &self,
        filter: HistoryFilter,
    ) -> Result<Vec<exchange_rates::Model>, Error> {
        let mut query = ExchangeRates::find();

        if let Some(start) = filter.start {
            query = query.filter(exchange_rates::Column::Timestamp.gte(start));
        }
        if let Some(end) = filter.end {
            query = query.filter(exchange_rates::Column::Timestamp.lte(end));
        }
        if let Some(source) = filter.source {
            query = query.filter(exchange_rates::Column::Source.eq(source));
        }
        if let Some(success) = filter.fetch_success {
            query = query.filter(exchange_rates::Column::FetchSuccess.eq(success));
        }

        let records = query
            .order_by(exchange_rates::Column::Timestamp, Order::Desc)
            .limit(filter.limit.unwrap_or(100))
            .all(self.db.as_ref())
            .await?;
        Ok(records)
    }

    /// Successful records since `since`, for the stats endpoint.
    pub async fn successful_since(
        &self,
        since: chrono::DateTime<chrono::FixedOffset>,
    ) -> Result<Vec<exchange_rates::Model>, Error> {
        let records = ExchangeRates::find()
            .filter(exchange_rates::Column::FetchSuccess.eq(true))
            .filter(exchange_rates::Column::Timestamp.gte(since))
            .order_by(exchange_rates::Column::Timestamp, Order::Desc)
            .all(self.db.as_ref())
            .await?;
        Ok(records)
    }
}
