//! Pins the rate used for a financial event, permanently.
//!
//! A snapshot is written once per order or payment and never touched again;
//! later rate movement must not change what a customer was charged.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr,
    TransactionTrait,
};
use std::sync::Arc;

use crate::entities::{exchange_rate_snapshots, prelude::*};
use crate::error::Error;
use crate::services::rate_service::RateService;

/// The financial event a snapshot belongs to. Exactly one per snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinTarget {
    Order(i32),
    Payment(i32),
}

impl PinTarget {
    fn entity_name(&self) -> &'static str {
        match self {
            PinTarget::Order(_) => "order",
            PinTarget::Payment(_) => "payment",
        }
    }
}

#[derive(Clone)]
pub struct SnapshotService {
    db: Arc<DatabaseConnection>,
    rates: RateService,
}

impl SnapshotService {
    pub fn new(db: impl Into<Arc<DatabaseConnection>>, rates: RateService) -> Self {
        Self { db: db.into(), rates }
    }

    /// Freeze the current rate against one order or payment.
    ///
    /// Re-pinning is rejected with `AlreadyPinned`; the check runs inside a
    /// transaction and the unique index on the target column backs it up
    /// against concurrent callers.
    pub async fn pin(
        &self,
        target: PinTarget,
        usd_amount: Decimal,
    ) -> Result<exchange_rate_snapshots::Model, Error> {
        if usd_amount <= Decimal::ZERO {
            return Err(Error::Validation("usd_amount must be positive".into()));
        }

        let view = self.rates.get_current(false).await.map_err(|err| match err {
            Error::Database(e) => Error::Database(e),
            _ => Error::NoRateAvailable,
        })?;

        let amount_ves = (usd_amount * view.usd_to_ves).round_dp(2);

        let txn = self.db.begin().await?;

        let existing = match target {
            PinTarget::Order(id) => {
                ExchangeRateSnapshots::find()
                    .filter(exchange_rate_snapshots::Column::OrderId.eq(id))
                    .one(&txn)
                    .await?
            }
            PinTarget::Payment(id) => {
                ExchangeRateSnapshots::find()
                    .filter(exchange_rate_snapshots::Column::PaymentId.eq(id))
                    .one(&txn)
                    .await?
            }
        };
        if existing.is_some() {
            return Err(Error::AlreadyPinned {
                entity: target.entity_name(),
            });
        }

        let (order_id, payment_id) = match target {
            PinTarget::Order(id) => (Some(id), None),
            PinTarget::Payment(id) => (None, Some(id)),
        };

        let insert_result = exchange_rate_snapshots::ActiveModel {
            order_id: Set(order_id),
            payment_id: Set(payment_id),
            usd_to_ves: Set(view.usd_to_ves),
            amount_usd: Set(usd_amount),
            amount_ves: Set(amount_ves),
            snapshot_timestamp: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(&txn)
        .await;

        let snapshot = match insert_result {
            Ok(snapshot) => snapshot,
            // Lost the race to another pinner: report it as the same error
            // the pre-check produces.
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                return Err(Error::AlreadyPinned {
                    entity: target.entity_name(),
                });
            }
            Err(err) => return Err(err.into()),
        };

        txn.commit().await?;

        tracing::info!(
            "Pinned rate {} for {} {:?}: {} USD = {} VES",
            snapshot.usd_to_ves,
            target.entity_name(),
            target,
            snapshot.amount_usd,
            snapshot.amount_ves
        );
        Ok(snapshot)
    }

    /// The snapshot for a target, if one was ever pinned.
    pub async fn find_for(
        &self,
        target: PinTarget,
    ) -> Result<Option<exchange_rate_snapshots::Model>, Error> {
        let snapshot = match target {
            PinTarget::Order(id) => {
                ExchangeRateSnapshots::find()
                    .filter(exchange_rate_snapshots::Column::OrderId.eq(id))
                    .one(self.db.as_ref())
                    .await?
            }
            PinTarget::Payment(id) => {
                ExchangeRateSnapshots::find()
                    .filter(exchange_rate_snapshots::Column::PaymentId.eq(id))
                    .one(self.db.as_ref())
                    .await?
            }
        };
        Ok(snapshot)
    }
}
