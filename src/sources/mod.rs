//! Upstream USD→VES rate providers and the ordered fallback chain.
//!
//! Each provider implements [`RateSource`] and converts every network, parse
//! and schema problem into a typed [`FetchError`] at its own boundary. The
//! [`SourceChain`] tries providers in a fixed priority order and
//! short-circuits on the first success; it never panics and never lets a
//! provider error escape raw.

pub mod exchangerate_host;
pub mod google_finance;
pub mod open_exchange_rates;

use rust_decimal::Decimal;
use std::fmt;
use std::time::Duration;

/// Per-source HTTP timeout. A hung provider costs at most this much before
/// the chain moves on.
pub const SOURCE_TIMEOUT: Duration = Duration::from_secs(15);

/// Where a committed rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceId {
    ExchangerateHost,
    GoogleFinance,
    OpenExchangeRates,
    Manual,
    Fallback,
}

impl SourceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::ExchangerateHost => "exchangerate_host",
            SourceId::GoogleFinance => "google_finance",
            SourceId::OpenExchangeRates => "open_exchange_rates",
            SourceId::Manual => "manual",
            SourceId::Fallback => "fallback",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single provider attempt gone wrong. Always carries the source identity
/// so the chain can log and record which upstream failed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("{source_id}: http request failed: {message}")]
    Http { source_id: SourceId, message: String },

    #[error("{source_id}: could not parse response: {message}")]
    Parse { source_id: SourceId, message: String },

    #[error("{source_id}: returned rate {rate} is not a positive number")]
    InvalidRate { source_id: SourceId, rate: Decimal },

    #[error("{source_id}: api key not configured")]
    MissingApiKey { source_id: SourceId },
}

impl FetchError {
    pub fn source_id(&self) -> SourceId {
        match self {
            FetchError::Http { source_id, .. }
            | FetchError::Parse { source_id, .. }
            | FetchError::InvalidRate { source_id, .. }
            | FetchError::MissingApiKey { source_id } => *source_id,
        }
    }

    pub fn http(source_id: SourceId, err: reqwest::Error) -> Self {
        FetchError::Http {
            source_id,
            message: err.to_string(),
        }
    }

    pub fn parse(source_id: SourceId, message: impl Into<String>) -> Self {
        FetchError::Parse {
            source_id,
            message: message.into(),
        }
    }
}

/// One upstream provider of the USD→VES rate.
#[async_trait::async_trait]
pub trait RateSource: Send + Sync {
    fn id(&self) -> SourceId;

    /// Fetch the current rate. Must not panic; every failure mode becomes a
    /// [`FetchError`].
    async fn fetch(&self) -> Result<Decimal, FetchError>;
}

/// Outcome of running the whole chain: either the first success, or every
/// error collected in attempt order.
pub struct ChainOutcome {
    pub rate: Option<(Decimal, SourceId)>,
    pub errors: Vec<FetchError>,
}

impl ChainOutcome {
    /// Joined error text suitable for the rate log's `error_message` column.
    pub fn error_message(&self) -> Option<String> {
        if self.errors.is_empty() {
            None
        } else {
            Some(
                self.errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        }
    }
}

/// Ordered fallback combinator over the configured providers.
pub struct SourceChain {
    sources: Vec<Box<dyn RateSource>>,
}

impl SourceChain {
    pub fn new(sources: Vec<Box<dyn RateSource>>) -> Self {
        Self { sources }
    }

    /// Default production ordering: free API first, scraped page second,
    /// keyed API third.
    pub fn from_env(client: reqwest::Client) -> Self {
        Self::new(vec![
            Box::new(exchangerate_host::ExchangerateHostSource::new(
                client.clone(),
            )),
            Box::new(google_finance::GoogleFinanceSource::new(client.clone())),
            Box::new(open_exchange_rates::OpenExchangeRatesSource::new(
                client,
                std::env::var("OPEN_EXCHANGE_RATES_API_KEY").ok(),
            )),
        ])
    }

    /// Try each source in priority order, short-circuiting on the first
    /// success. All failures are logged and collected; none propagate.
    pub async fn fetch_first(&self) -> ChainOutcome {
        let mut errors = Vec::new();

        for source in &self.sources {
            tracing::info!("Trying to fetch USD/VES rate from {}", source.id());
            match source.fetch().await {
                Ok(rate) => {
                    tracing::info!("Fetched rate {} from {}", rate, source.id());
                    return ChainOutcome {
                        rate: Some((rate, source.id())),
                        errors,
                    };
                }
                Err(err) => {
                    tracing::warn!("Rate source {} failed: {}", source.id(), err);
                    errors.push(err);
                }
            }
        }

        ChainOutcome { rate: None, errors }
    }
}

/// Parse and sanity-check a provider-reported rate value.
pub(crate) fn validate_rate(source_id: SourceId, rate: Decimal) -> Result<Decimal, FetchError> {
    if rate > Decimal::ZERO {
        Ok(rate)
    } else {
        Err(FetchError::InvalidRate { source_id, rate })
    }
}
