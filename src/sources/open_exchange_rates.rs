//! Open Exchange Rates API. Lowest-priority source: requires a paid app id,
//! configured via `OPEN_EXCHANGE_RATES_API_KEY`.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

use super::{validate_rate, FetchError, RateSource, SourceId};

const LATEST_URL: &str = "https://openexchangerates.org/api/latest.json";

pub struct OpenExchangeRatesSource {
    client: reqwest::Client,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    rates: HashMap<String, Decimal>,
}

impl OpenExchangeRatesSource {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }
}

#[async_trait::async_trait]
impl RateSource for OpenExchangeRatesSource {
    fn id(&self) -> SourceId {
        SourceId::OpenExchangeRates
    }

    async fn fetch(&self) -> Result<Decimal, FetchError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(FetchError::MissingApiKey {
                source_id: self.id(),
            })?;

        let response = self
            .client
            .get(LATEST_URL)
            .query(&[("app_id", api_key), ("symbols", "VES")])
            .send()
            .await
            .map_err(|e| FetchError::http(self.id(), e))?
            .error_for_status()
            .map_err(|e| FetchError::http(self.id(), e))?;

        let data: LatestResponse = response
            .json()
            .await
            .map_err(|e| FetchError::parse(self.id(), e.to_string()))?;

        match data.rates.get("VES") {
            Some(rate) => validate_rate(self.id(), *rate),
            None => Err(FetchError::parse(
                self.id(),
                "VES not present in rates response",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_api_key_is_a_typed_error_not_a_request() {
        let source = OpenExchangeRatesSource::new(reqwest::Client::new(), None);
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::MissingApiKey { .. }));

        let source = OpenExchangeRatesSource::new(reqwest::Client::new(), Some(String::new()));
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::MissingApiKey { .. }));
    }
}
