//! Free exchangerate.host API. Highest-priority source: no key, JSON, and
//! historically the most reliable of the three upstreams.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

use super::{validate_rate, FetchError, RateSource, SourceId};

const LATEST_URL: &str = "https://api.exchangerate.host/latest";
const CONVERT_URL: &str = "https://api.exchangerate.host/convert";

pub struct ExchangerateHostSource {
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    rates: HashMap<String, Decimal>,
}

#[derive(Debug, Deserialize)]
struct ConvertResponse {
    #[serde(default)]
    success: bool,
    result: Option<Decimal>,
}

impl ExchangerateHostSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch_latest(&self) -> Result<Option<Decimal>, FetchError> {
        let response = self
            .client
            .get(LATEST_URL)
            .query(&[("base", "USD"), ("symbols", "VES")])
            .send()
            .await
            .map_err(|e| FetchError::http(self.id(), e))?
            .error_for_status()
            .map_err(|e| FetchError::http(self.id(), e))?;

        let data: LatestResponse = response
            .json()
            .await
            .map_err(|e| FetchError::parse(self.id(), e.to_string()))?;

        if data.success {
            Ok(data.rates.get("VES").copied())
        } else {
            Ok(None)
        }
    }

    async fn fetch_convert(&self) -> Result<Option<Decimal>, FetchError> {
        let response = self
            .client
            .get(CONVERT_URL)
            .query(&[("from", "USD"), ("to", "VES"), ("amount", "1")])
            .send()
            .await
            .map_err(|e| FetchError::http(self.id(), e))?
            .error_for_status()
            .map_err(|e| FetchError::http(self.id(), e))?;

        let data: ConvertResponse = response
            .json()
            .await
            .map_err(|e| FetchError::parse(self.id(), e.to_string()))?;

        if data.success {
            Ok(data.result)
        } else {
            Ok(None)
        }
    }
}

#[async_trait::async_trait]
impl RateSource for ExchangerateHostSource {
    fn id(&self) -> SourceId {
        SourceId::ExchangerateHost
    }

    async fn fetch(&self) -> Result<Decimal, FetchError> {
        // The /latest endpoint first; /convert covers the occasional window
        // where /latest omits VES.
        if let Some(rate) = self.fetch_latest().await? {
            return validate_rate(self.id(), rate);
        }

        tracing::debug!("exchangerate.host /latest had no VES rate, trying /convert");
        match self.fetch_convert().await? {
            Some(rate) => validate_rate(self.id(), rate),
            None => Err(FetchError::parse(
                self.id(),
                "no VES rate in /latest or /convert response",
            )),
        }
    }
}
