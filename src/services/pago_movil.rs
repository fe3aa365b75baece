//! Pago Móvil verification workflow: customer-submitted transfer claims,
//! validated and rate-limited on the way in, then driven from `pending` to a
//! terminal state by staff.

use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter,
    QueryOrder, Set,
};
use serde::Serialize;
use std::sync::Arc;

use crate::entities::{orders, pago_movil_verifications, prelude::*};
use crate::error::Error;
use crate::services::rate_service::RateService;

/// Submissions allowed per user inside the sliding window.
pub const RATE_LIMIT_MAX: u64 = 3;
pub const RATE_LIMIT_WINDOW_MINUTES: i64 = 60;

lazy_static! {
    // Cédula/RIF: V-12345678 or J-12345678-0
    static ref SENDER_ID_REGEX: Regex = Regex::new(r"^[VJPE]-\d{8}(-\d)?$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    Pending,
    Approved,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Approved => "approved",
            VerificationStatus::Rejected => "rejected",
        }
    }

    /// Parse a staff-requested terminal status. `pending` is not a valid
    /// transition target.
    pub fn parse_terminal(s: &str) -> Result<Self, Error> {
        match s {
            "approved" => Ok(VerificationStatus::Approved),
            "rejected" => Ok(VerificationStatus::Rejected),
            other => Err(Error::Validation(format!(
                "status must be 'approved' or 'rejected', got '{}'",
                other
            ))),
        }
    }
}

/// Strip spaces, uppercase, and check the `[VJPE]-########[-#]` shape.
pub fn normalize_sender_id(raw: &str) -> Result<String, Error> {
    let normalized = raw.replace(' ', "").to_uppercase();
    if SENDER_ID_REGEX.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(Error::Validation(
            "Sender ID must be in format V-12345678 or J-12345678-0".into(),
        ))
    }
}

/// Keep digits only; Venezuelan numbers are 10-11 digits.
pub fn normalize_phone(raw: &str) -> Result<String, Error> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if (10..=11).contains(&digits.len()) {
        Ok(digits)
    } else {
        Err(Error::Validation("Phone number must be 10-11 digits".into()))
    }
}

/// Venezuelan bank codes are 4 digits (e.g. 0102).
pub fn validate_bank_code(raw: &str) -> Result<(), Error> {
    if raw.len() == 4 && raw.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(Error::Validation("Bank code must be 4 digits".into()))
    }
}

/// Derived once at submission; never recomputed.
pub fn compute_usd_equivalent(amount_ves: Decimal, rate: Decimal) -> Decimal {
    (amount_ves / rate).round_dp(2)
}

/// Seconds until the oldest in-window submission leaves the sliding window.
pub fn retry_after_secs(
    oldest_in_window: DateTime<FixedOffset>,
    now: DateTime<FixedOffset>,
) -> i64 {
    let expires = oldest_in_window + ChronoDuration::minutes(RATE_LIMIT_WINDOW_MINUTES);
    (expires - now).num_seconds().max(0)
}

#[derive(Debug, Clone)]
pub struct NewVerification {
    pub user_id: i32,
    pub order_id: Option<i32>,
    pub sender_id: String,
    pub sender_phone: String,
    pub bank_code: String,
    pub recipient: String,
    pub amount_ves: Decimal,
}

/// Per-item outcome of a batch transition.
#[derive(Debug, Clone, Serialize)]
pub struct BatchItemResult {
    pub id: i32,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct PagoMovilService {
    db: Arc<DatabaseConnection>,
    rates: RateService,
}

impl PagoMovilService {
    pub fn new(db: impl Into<Arc<DatabaseConnection>>, rates: RateService) -> Self {
        Self { db: db.into(), rates }
    }

    /// Create a pending verification request.
    ///
    /// The current rate is frozen into the record at this moment; later rate
    /// changes never alter `usd_equivalent`.
    pub async fn submit(
        &self,
        request: NewVerification,
    ) -> Result<pago_movil_verifications::Model, Error> {
        let sender_id = normalize_sender_id(&request.sender_id)?;
        let sender_phone = normalize_phone(&request.sender_phone)?;
        validate_bank_code(&request.bank_code)?;
        if request.recipient.trim().is_empty() {
            return Err(Error::Validation("recipient must not be empty".into()));
        }
        if request.amount_ves <= Decimal::ZERO {
            return Err(Error::Validation("amount_ves must be positive".into()));
        }

        self.check_rate_limit(request.user_id).await?;

        let view = self.rates.get_current(false).await.map_err(|err| match err {
            Error::Database(e) => Error::Database(e),
            _ => Error::NoRateAvailable,
        })?;
        let usd_equivalent = compute_usd_equivalent(request.amount_ves, view.usd_to_ves);

        let now: DateTime<FixedOffset> = Utc::now().into();
        let record = pago_movil_verifications::ActiveModel {
            user_id: Set(request.user_id),
            order_id: Set(request.order_id),
            sender_id: Set(sender_id),
            sender_phone: Set(sender_phone),
            bank_code: Set(request.bank_code),
            recipient: Set(request.recipient),
            amount_ves: Set(request.amount_ves),
            exchange_rate_used: Set(view.usd_to_ves),
            usd_equivalent: Set(usd_equivalent),
            status: Set(VerificationStatus::Pending.as_str().to_owned()),
            notes: Set(None),
            reviewed_by: Set(None),
            reviewed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await?;

        tracing::info!(
            "Pago Móvil verification {} submitted by user {}: {} VES = {} USD at rate {}",
            record.id,
            record.user_id,
            record.amount_ves,
            record.usd_equivalent,
            record.exchange_rate_used
        );
        Ok(record)
    }

    /// Sliding 60-minute window, live count against the table.
    async fn check_rate_limit(&self, user_id: i32) -> Result<(), Error> {
        let now: DateTime<FixedOffset> = Utc::now().into();
        let window_start = now - ChronoDuration::minutes(RATE_LIMIT_WINDOW_MINUTES);

        let recent = PagoMovilVerifications::find()
            .filter(pago_movil_verifications::Column::UserId.eq(user_id))
            .filter(pago_movil_verifications::Column::CreatedAt.gte(window_start))
            .order_by(pago_movil_verifications::Column::CreatedAt, Order::Asc)
            .all(self.db.as_ref())
            .await?;

        if recent.len() as u64 >= RATE_LIMIT_MAX {
            let retry = retry_after_secs(recent[0].created_at, now);
            return Err(Error::RateLimited {
                retry_after_secs: retry,
            });
        }
        Ok(())
    }

    /// Drive one request from `pending` to a terminal state.
    ///
    /// The status check and the write are one conditional UPDATE, so two
    /// staff members racing on the same request cannot both win; the loser
    /// gets `InvalidTransition` with the terminal status echoed back.
    pub async fn transition(
        &self,
        id: i32,
        to: VerificationStatus,
        actor: &str,
        notes: Option<String>,
    ) -> Result<pago_movil_verifications::Model, Error> {
        if to == VerificationStatus::Pending {
            return Err(Error::Validation(
                "cannot transition a request back to pending".into(),
            ));
        }

        let now: DateTime<FixedOffset> = Utc::now().into();
        let result = PagoMovilVerifications::update_many()
            .col_expr(
                pago_movil_verifications::Column::Status,
                Expr::value(to.as_str()),
            )
            .col_expr(
                pago_movil_verifications::Column::ReviewedBy,
                Expr::value(Some(actor.to_owned())),
            )
            .col_expr(
                pago_movil_verifications::Column::ReviewedAt,
                Expr::value(Some(now)),
            )
            .col_expr(
                pago_movil_verifications::Column::Notes,
                Expr::value(notes.clone()),
            )
            .col_expr(
                pago_movil_verifications::Column::UpdatedAt,
                Expr::value(now),
            )
            .filter(pago_movil_verifications::Column::Id.eq(id))
            .filter(
                pago_movil_verifications::Column::Status
                    .eq(VerificationStatus::Pending.as_str()),
            )
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            // Either the id is unknown or the request is already terminal.
            let current = PagoMovilVerifications::find_by_id(id)
                .one(self.db.as_ref())
                .await?
                .ok_or_else(|| {
                    Error::NotFound(format!("verification request {} not found", id))
                })?;
            return Err(Error::InvalidTransition {
                current: current.status,
            });
        }

        let record = PagoMovilVerifications::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| Error::Database("verification vanished mid-transition".into()))?;

        if to == VerificationStatus::Approved {
            if let Some(order_id) = record.order_id {
                self.mark_order_paid(order_id).await?;
            }
        }

        tracing::info!(
            "Pago Móvil verification {} -> {} by {}",
            record.id,
            record.status,
            actor
        );
        Ok(record)
    }

    /// Replace the staff notes on a request in any state. Terminal requests
    /// are otherwise frozen; status, reviewer and timestamps stay untouched.
    pub async fn update_notes(
        &self,
        id: i32,
        notes: Option<String>,
    ) -> Result<pago_movil_verifications::Model, Error> {
        let now: DateTime<FixedOffset> = Utc::now().into();
        let result = PagoMovilVerifications::update_many()
            .col_expr(pago_movil_verifications::Column::Notes, Expr::value(notes))
            .col_expr(
                pago_movil_verifications::Column::UpdatedAt,
                Expr::value(now),
            )
            .filter(pago_movil_verifications::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Err(Error::NotFound(format!(
                "verification request {} not found",
                id
            )));
        }

        let record = PagoMovilVerifications::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| Error::Database("verification vanished mid-update".into()))?;
        Ok(record)
    }

    /// Order collaborator hook: approval advances the linked order to
    /// paid/confirmed.
    async fn mark_order_paid(&self, order_id: i32) -> Result<(), Error> {
        let Some(order) = Orders::find_by_id(order_id).one(self.db.as_ref()).await? else {
            tracing::warn!("Approved verification references missing order {}", order_id);
            return Ok(());
        };

        let mut active: orders::ActiveModel = order.into();
        active.payment_status = Set("paid".to_owned());
        active.status = Set("confirmed".to_owned());
        active.update(self.db.as_ref()).await?;

        tracing::info!("Order {} marked paid/confirmed", order_id);
        Ok(())
    }

    /// Bulk staff action: the single pending-to-terminal invariant applies
    /// per item, and failures are reported per item rather than aborting the
    /// batch.
    pub async fn batch_transition(
        &self,
        ids: &[i32],
        to: VerificationStatus,
        actor: &str,
        notes: Option<String>,
    ) -> Vec<BatchItemResult> {
        let mut results = Vec::with_capacity(ids.len());
        for &id in ids {
            match self.transition(id, to, actor, notes.clone()).await {
                Ok(_) => results.push(BatchItemResult {
                    id,
                    ok: true,
                    error: None,
                }),
                Err(err) => results.push(BatchItemResult {
                    id,
                    ok: false,
                    error: Some(err.to_string()),
                }),
            }
        }
        results
    }

    /// Latest request for one customer, for the status endpoint.
    pub async fn latest_for_user(
        &self,
        user_id: i32,
    ) -> Result<Option<pago_movil_verifications::Model>, Error> {
        let record = PagoMovilVerifications::find()
            .filter(pago_movil_verifications::Column::UserId.eq(user_id))
            .order_by(pago_movil_verifications::Column::CreatedAt, Order::Desc)
            .one(self.db.as_ref())
            .await?;
        Ok(record)
    }

    /// Staff review list, newest first, optionally filtered by status.
    pub async fn list(
        &self,
        status: Option<String>,
    ) -> Result<Vec<pago_movil_verifications::Model>, Error> {
        let mut query = PagoMovilVerifications::find();
        if let Some(status) = status {
            query = query.filter(pago_movil_verifications::Column::Status.eq(status));
        }
        let records = query
            .order_by(pago_movil_verifications::Column::CreatedAt, Order::Desc)
            .all(self.db.as_ref())
            .await?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn sender_id_accepts_cedula_and_rif_formats() {
        assert_eq!(normalize_sender_id("V-12345678").unwrap(), "V-12345678");
        assert_eq!(normalize_sender_id("J-87654321-0").unwrap(), "J-87654321-0");
        assert_eq!(normalize_sender_id("e-00000001").unwrap(), "E-00000001");
        // Embedded spaces are stripped before matching
        assert_eq!(normalize_sender_id(" P-12345678 ").unwrap(), "P-12345678");
    }

    #[test]
    fn sender_id_rejects_short_and_bad_prefix() {
        assert!(normalize_sender_id("V-1234567").is_err()); // 7 digits
        assert!(normalize_sender_id("X-12345678").is_err()); // bad prefix
        assert!(normalize_sender_id("V12345678").is_err()); // missing dash
        assert!(normalize_sender_id("V-123456789").is_err()); // 9 digits
        assert!(normalize_sender_id("").is_err());
    }

    #[test]
    fn phone_normalizes_to_digits() {
        assert_eq!(normalize_phone("0414-123-4567").unwrap(), "04141234567");
        assert_eq!(normalize_phone("(414) 123.45.67").unwrap(), "4141234567");
    }

    #[test]
    fn phone_outside_10_11_digits_is_rejected() {
        assert!(normalize_phone("123456789").is_err()); // 9
        assert!(normalize_phone("041412345678").is_err()); // 12
        assert!(normalize_phone("no digits").is_err());
    }

    #[test]
    fn bank_code_must_be_four_digits() {
        assert!(validate_bank_code("0102").is_ok());
        assert!(validate_bank_code("102").is_err());
        assert!(validate_bank_code("01O2").is_err());
    }

    #[test]
    fn usd_equivalent_is_amount_over_rate() {
        assert_eq!(compute_usd_equivalent(dec!(3650), dec!(36.5)), dec!(100.00));
        assert_eq!(compute_usd_equivalent(dec!(1000), dec!(36.53)), dec!(27.37));
    }

    #[test]
    fn retry_hint_counts_down_from_the_oldest_submission() {
        let now: DateTime<FixedOffset> = Utc::now().into();
        let oldest = now - ChronoDuration::minutes(45);
        // Window closes 15 minutes after `now`
        let secs = retry_after_secs(oldest, now);
        assert!((899..=900).contains(&secs), "got {}", secs);

        // A submission 61 minutes old has already left the window
        let stale = now - ChronoDuration::minutes(61);
        assert_eq!(retry_after_secs(stale, now), 0);
    }

    use crate::services::alert_engine::AlertEngine;
    use crate::services::rate_service::RateService;
    use crate::services::rate_store::RateStore;
    use crate::sources::SourceChain;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn service(db: DatabaseConnection) -> PagoMovilService {
        let db = Arc::new(db);
        let store = RateStore::new(db.clone());
        let alerts = AlertEngine::new(db.clone());
        let rates = RateService::new(store, alerts, Arc::new(SourceChain::new(vec![])));
        PagoMovilService::new(db, rates)
    }

    fn verification(
        id: i32,
        status: &str,
        created_at: DateTime<FixedOffset>,
    ) -> pago_movil_verifications::Model {
        pago_movil_verifications::Model {
            id,
            user_id: 7,
            order_id: None,
            sender_id: "V-12345678".into(),
            sender_phone: "04141234567".into(),
            bank_code: "0102".into(),
            recipient: "Tienda C.A.".into(),
            amount_ves: dec!(1000),
            exchange_rate_used: dec!(36.5),
            usd_equivalent: dec!(27.40),
            status: status.into(),
            notes: None,
            reviewed_by: None,
            reviewed_at: None,
            created_at,
            updated_at: created_at,
        }
    }

    // Double approval: the conditional UPDATE matches nothing, and the
    // caller gets the terminal status echoed back.
    #[tokio::test]
    async fn approving_a_terminal_request_is_an_invalid_transition() {
        let now: DateTime<FixedOffset> = Utc::now().into();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([vec![verification(5, "approved", now)]])
            .into_connection();

        let err = service(db)
            .transition(5, VerificationStatus::Approved, "staff", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { current } if current == "approved"));
    }

    #[tokio::test]
    async fn transition_on_an_unknown_id_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([Vec::<pago_movil_verifications::Model>::new()])
            .into_connection();

        let err = service(db)
            .transition(99, VerificationStatus::Rejected, "staff", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    // 3 submissions already sit inside the trailing hour; the 4th is
    // throttled before any rate lookup or insert happens.
    #[tokio::test]
    async fn fourth_submission_inside_the_window_is_rate_limited() {
        let now: DateTime<FixedOffset> = Utc::now().into();
        let recent: Vec<_> = [50, 30, 10]
            .iter()
            .map(|&age| verification(age, "pending", now - ChronoDuration::minutes(age as i64)))
            .collect();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([recent])
            .into_connection();

        let err = service(db)
            .submit(NewVerification {
                user_id: 7,
                order_id: None,
                sender_id: "V-12345678".into(),
                sender_phone: "04141234567".into(),
                bank_code: "0102".into(),
                recipient: "Tienda C.A.".into(),
                amount_ves: dec!(1000),
            })
            .await
            .unwrap_err();

        match err {
            // Oldest submission is 50 minutes old, so the window frees up in
            // about 10 minutes.
            Error::RateLimited { retry_after_secs } => {
                assert!((1..=600).contains(&retry_after_secs), "got {}", retry_after_secs)
            }
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    // Terminal requests stay frozen except for notes.
    #[tokio::test]
    async fn notes_can_be_replaced_on_a_terminal_request() {
        let now: DateTime<FixedOffset> = Utc::now().into();
        let mut after_update = verification(5, "approved", now);
        after_update.notes = Some("receipt re-checked".into());
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .append_query_results([vec![after_update]])
            .into_connection();

        let record = service(db)
            .update_notes(5, Some("receipt re-checked".into()))
            .await
            .unwrap();
        assert_eq!(record.status, "approved");
        assert_eq!(record.notes.as_deref(), Some("receipt re-checked"));
    }

    #[tokio::test]
    async fn notes_update_on_an_unknown_id_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let err = service(db).update_notes(99, None).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn only_terminal_statuses_parse_as_transition_targets() {
        assert_eq!(
            VerificationStatus::parse_terminal("approved").unwrap(),
            VerificationStatus::Approved
        );
        assert_eq!(
            VerificationStatus::parse_terminal("rejected").unwrap(),
            VerificationStatus::Rejected
        );
        assert!(VerificationStatus::parse_terminal("pending").is_err());
        assert!(VerificationStatus::parse_terminal("confirmed").is_err());
    }
}
