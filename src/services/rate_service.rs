//! Current-rate access: TTL cache, single-flight acquisition through the
//! source chain, fallback substitution, manual overrides and conversions.

use chrono::{Duration as ChronoDuration, Utc};
use moka::future::Cache;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};

use crate::entities::exchange_rates;
use crate::error::Error;
use crate::services::alert_engine::AlertEngine;
use crate::services::rate_store::{CommitRate, RateStore};
use crate::sources::{SourceChain, SourceId};

/// Cache TTL; also the freshness bound for serving a persisted rate without
/// re-fetching.
pub const CACHE_TTL: Duration = Duration::from_secs(3600);

/// Conservative constant served when every upstream source fails.
pub const FALLBACK_RATE: Decimal = dec!(38.0);

/// Manual rates below this are rejected outright.
pub const MIN_SANE_RATE: Decimal = dec!(1.0);

/// Manual rates above this are stored but logged as suspicious.
pub const MAX_SANE_RATE: Decimal = dec!(1000.0);

const CACHE_KEY: &str = "usd_ves:current";

/// The shape every consumer of "the current rate" sees.
#[derive(Debug, Clone, Serialize)]
pub struct RateView {
    pub usd_to_ves: Decimal,
    pub last_updated: chrono::DateTime<chrono::FixedOffset>,
    pub source: String,
    pub change_percentage: Option<Decimal>,
}

impl From<&exchange_rates::Model> for RateView {
    fn from(record: &exchange_rates::Model) -> Self {
        Self {
            usd_to_ves: record.usd_to_ves,
            last_updated: record.timestamp,
            source: record.source.clone(),
            change_percentage: record.change_percentage,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Currency {
    Usd,
    Ves,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Ves => "VES",
        }
    }
}

impl FromStr for Currency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "VES" => Ok(Currency::Ves),
            other => Err(Error::Validation(format!(
                "unsupported currency '{}', expected USD or VES",
                other
            ))),
        }
    }
}

/// Convert between USD and VES at the given rate, rounded to 2 decimal
/// places. Same-currency pairs are rejected upstream.
pub fn convert(amount: Decimal, from: Currency, to: Currency, rate: Decimal) -> Decimal {
    let converted = match (from, to) {
        (Currency::Usd, Currency::Ves) => amount * rate,
        (Currency::Ves, Currency::Usd) => amount / rate,
        _ => amount,
    };
    converted.round_dp(2)
}

pub fn validate_manual_rate(rate: Decimal) -> Result<(), Error> {
    if rate <= Decimal::ZERO {
        return Err(Error::Validation("rate must be a positive number".into()));
    }
    if rate < MIN_SANE_RATE {
        return Err(Error::Validation(format!(
            "manual rate {} is below the sanity floor of {} VES per USD",
            rate, MIN_SANE_RATE
        )));
    }
    Ok(())
}

pub fn is_suspicious_manual_rate(rate: Decimal) -> bool {
    rate > MAX_SANE_RATE
}

/// Result of a conversion, echoing the rate actually used.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutcome {
    pub original_amount: Decimal,
    pub converted_amount: Decimal,
    pub from_currency: &'static str,
    pub to_currency: &'static str,
    pub exchange_rate: Decimal,
    pub rate_source: String,
}

/// Min/max/avg over the recent successful history.
#[derive(Debug, Clone, Serialize)]
pub struct RateStats {
    pub current: Option<RateView>,
    pub window_days: i64,
    pub sample_count: usize,
    pub min_rate: Option<Decimal>,
    pub max_rate: Option<Decimal>,
    pub avg_rate: Option<Decimal>,
}

pub(crate) fn summarize_rates(rates: &[Decimal]) -> (Option<Decimal>, Option<Decimal>, Option<Decimal>) {
    if rates.is_empty() {
        return (None, None, None);
    }
    let min = rates.iter().min().copied();
    let max = rates.iter().max().copied();
    let sum: Decimal = rates.iter().sum();
    let avg = Some((sum / Decimal::from(rates.len() as i64)).round_dp(6));
    (min, max, avg)
}

/// Coalesces concurrent acquisitions: one fetch per miss window, every
/// waiter sees its result. The fetch runs in its own task and waiters watch
/// for the outcome, so a caller that disconnects mid-flight cannot abort
/// work other callers are waiting on.
pub(crate) struct SingleFlight<T> {
    slot: Mutex<Option<watch::Receiver<Option<Result<T, Error>>>>>,
}

impl<T: Clone + Send + Sync + 'static> SingleFlight<T> {
    pub(crate) fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Join the in-flight fetch if one is still pending, otherwise start a
    /// new one from `start`. Errors are shared with the flight's waiters but
    /// never cached beyond it.
    pub(crate) async fn run<F, Fut>(&self, start: F) -> Result<T, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        let mut rx = {
            let mut slot = self.slot.lock().await;
            let pending = slot
                .as_ref()
                .filter(|rx| rx.borrow().is_none())
                .cloned();
            match pending {
                Some(rx) => rx,
                None => {
                    let (tx, rx) = watch::channel(None);
                    *slot = Some(rx.clone());
                    let fut = start();
                    tokio::spawn(async move {
                        let _ = tx.send(Some(fut.await));
                    });
                    rx
                }
            }
        };

        loop {
            {
                let value = rx.borrow_and_update();
                if let Some(result) = value.as_ref() {
                    return result.clone();
                }
            }
            rx.changed().await.map_err(|_| {
                Error::Database("rate acquisition task ended without a result".into())
            })?;
        }
    }
}

#[derive(Clone)]
pub struct RateService {
    store: RateStore,
    alerts: AlertEngine,
    chain: Arc<SourceChain>,
    cache: Cache<&'static str, RateView>,
    flight: Arc<SingleFlight<RateView>>,
}

impl RateService {
    pub fn new(store: RateStore, alerts: AlertEngine, chain: Arc<SourceChain>) -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(CACHE_TTL)
            .build();

        Self {
            store,
            alerts,
            chain,
            cache,
            flight: Arc::new(SingleFlight::new()),
        }
    }

    /// The current USD→VES rate.
    ///
    /// Unforced calls read through the cache; concurrent cache misses
    /// coalesce into a single acquisition (all callers observe the same
    /// result and timestamp), and the acquisition is detached from any one
    /// requester: a dropped request leaves the fetch running for the rest.
    /// Forced calls always hit the source chain and repopulate the cache.
    pub async fn get_current(&self, force_fetch: bool) -> Result<RateView, Error> {
        if force_fetch {
            let view = self.acquire_and_store().await?;
            self.cache.insert(CACHE_KEY, view.clone()).await;
            return Ok(view);
        }

        if let Some(view) = self.cache.get(&CACHE_KEY).await {
            return Ok(view);
        }

        let service = self.clone();
        self.flight
            .run(move || async move {
                let view = service.load().await?;
                service.cache.insert(CACHE_KEY, view.clone()).await;
                Ok(view)
            })
            .await
    }

    /// Cache-miss path: a fresh-enough persisted rate wins over a new fetch.
    async fn load(&self) -> Result<RateView, Error> {
        if let Some(record) = self.store.current_active().await? {
            let age = Utc::now().signed_duration_since(record.timestamp);
            if age < ChronoDuration::hours(1) {
                tracing::debug!(
                    "Serving persisted rate from {} ({}s old)",
                    record.source,
                    age.num_seconds()
                );
                return Ok(RateView::from(&record));
            }
        }

        self.acquire_and_store().await
    }

    /// Run the source chain, substitute the fallback on exhaustion, commit
    /// the outcome and evaluate alerts.
    async fn acquire_and_store(&self) -> Result<RateView, Error> {
        let outcome = self.chain.fetch_first().await;
        let error_message = outcome.error_message();

        let commit = match outcome.rate {
            Some((rate, source)) => CommitRate {
                rate,
                source,
                fetch_success: true,
                error_message,
            },
            None => {
                tracing::warn!(
                    "All exchange rate sources failed, using fallback rate {}",
                    FALLBACK_RATE
                );
                CommitRate {
                    rate: FALLBACK_RATE,
                    source: SourceId::Fallback,
                    fetch_success: false,
                    error_message,
                }
            }
        };

        let record = self.store.commit(commit).await?;
        self.alerts.run(&record).await;
        Ok(RateView::from(&record))
    }

    /// Administrative override. Floor violations are hard errors; ceiling
    /// violations are stored but logged. The cache is invalidated so the new
    /// rate is visible to the very next caller.
    pub async fn set_manual_rate(
        &self,
        rate: Decimal,
        actor: Option<&str>,
    ) -> Result<RateView, Error> {
        validate_manual_rate(rate)?;
        if is_suspicious_manual_rate(rate) {
            tracing::warn!(
                "Manual rate {} exceeds the sanity ceiling of {}, storing anyway",
                rate,
                MAX_SANE_RATE
            );
        }

        let record = self
            .store
            .commit(CommitRate {
                rate,
                source: SourceId::Manual,
                fetch_success: true,
                error_message: None,
            })
            .await?;
        self.alerts.run(&record).await;

        self.cache.invalidate(&CACHE_KEY).await;
        let view = RateView::from(&record);
        self.cache.insert(CACHE_KEY, view.clone()).await;

        tracing::info!(
            "Manual exchange rate set to {} VES per USD by {}",
            rate,
            actor.unwrap_or("unknown")
        );
        Ok(view)
    }

    /// Convert between USD and VES, optionally at a caller-provided rate.
    pub async fn convert_amount(
        &self,
        amount: Decimal,
        from: &str,
        to: &str,
        rate_override: Option<Decimal>,
    ) -> Result<ConversionOutcome, Error> {
        let from: Currency = from.parse()?;
        let to: Currency = to.parse()?;
        if from == to {
            return Err(Error::Validation(
                "from_currency and to_currency must differ".into(),
            ));
        }
        if amount < Decimal::ZERO {
            return Err(Error::Validation("amount must not be negative".into()));
        }

        let (rate, rate_source) = match rate_override {
            Some(rate) => {
                if rate <= Decimal::ZERO {
                    return Err(Error::Validation("rate must be a positive number".into()));
                }
                (rate, "custom".to_owned())
            }
            None => {
                let view = self.get_current(false).await?;
                (view.usd_to_ves, view.source)
            }
        };

        Ok(ConversionOutcome {
            original_amount: amount,
            converted_amount: convert(amount, from, to, rate),
            from_currency: from.as_str(),
            to_currency: to.as_str(),
            exchange_rate: rate,
            rate_source,
        })
    }

    /// 7-day summary of successful fetches plus the current view.
    pub async fn stats(&self) -> Result<RateStats, Error> {
        const WINDOW_DAYS: i64 = 7;
        let since = (Utc::now() - ChronoDuration::days(WINDOW_DAYS)).into();
        let records = self.store.successful_since(since).await?;
        let rates: Vec<Decimal> = records.iter().map(|r| r.usd_to_ves).collect();
        let (min_rate, max_rate, avg_rate) = summarize_rates(&rates);

        let current = self
            .store
            .current_active()
            .await?
            .as_ref()
            .map(RateView::from);

        Ok(RateStats {
            current,
            window_days: WINDOW_DAYS,
            sample_count: rates.len(),
            min_rate,
            max_rate,
            avg_rate,
        })
    }

    pub fn store(&self) -> &RateStore {
        &self.store
    }
}
