//! Google Finance USD-VES quote page, scraped. Second-priority source: the
//! markup shifts occasionally, so several selectors are tried before the
//! page is declared unparseable.

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use scraper::{Html, Selector};
use std::str::FromStr;

use super::{validate_rate, FetchError, RateSource, SourceId};

const QUOTE_URL: &str = "https://www.google.com/finance/quote/USD-VES";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

// Selectors Google Finance has used for the last price, most specific first
const PRICE_SELECTORS: &[&str] = &["[data-last-price]", ".YMlKec.fxKbKc", ".kf1m0", ".YMlKec"];

lazy_static! {
    static ref PRICE_REGEX: Regex = Regex::new(r"[\d]+\.?\d*").unwrap();
}

pub struct GoogleFinanceSource {
    client: reqwest::Client,
}

impl GoogleFinanceSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// Pull the first numeric token out of a price string like "36.53" or
/// "1,234.56 VES".
fn extract_price(text: &str) -> Option<Decimal> {
    let cleaned = text.replace(',', "");
    let captured = PRICE_REGEX.find(&cleaned)?;
    Decimal::from_str(captured.as_str()).ok()
}

fn parse_quote_page(html: &str) -> Option<Decimal> {
    let document = Html::parse_document(html);

    for raw_selector in PRICE_SELECTORS {
        let Ok(selector) = Selector::parse(raw_selector) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            // data-last-price carries the raw number; fall back to the text
            let text = element
                .value()
                .attr("data-last-price")
                .map(str::to_owned)
                .unwrap_or_else(|| element.text().collect::<String>());
            if let Some(rate) = extract_price(text.trim()) {
                return Some(rate);
            }
        }
    }

    None
}

#[async_trait::async_trait]
impl RateSource for GoogleFinanceSource {
    fn id(&self) -> SourceId {
        SourceId::GoogleFinance
    }

    async fn fetch(&self) -> Result<Decimal, FetchError> {
        let response = self
            .client
            .get(QUOTE_URL)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|e| FetchError::http(self.id(), e))?
            .error_for_status()
            .map_err(|e| FetchError::http(self.id(), e))?;

        let html = response
            .text()
            .await
            .map_err(|e| FetchError::parse(self.id(), e.to_string()))?;

        match parse_quote_page(&html) {
            Some(rate) => validate_rate(self.id(), rate),
            None => Err(FetchError::parse(
                self.id(),
                "could not locate a price element in the quote page",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_data_last_price_attribute() {
        let html = r#"<html><body>
            <div data-last-price="36.53" class="YMlKec fxKbKc">36.53</div>
        </body></html>"#;
        assert_eq!(parse_quote_page(html), Some(dec!(36.53)));
    }

    #[test]
    fn falls_back_to_element_text() {
        let html = r#"<html><body>
            <div class="YMlKec fxKbKc">1,234.56</div>
        </body></html>"#;
        assert_eq!(parse_quote_page(html), Some(dec!(1234.56)));
    }

    #[test]
    fn page_without_price_yields_none() {
        let html = "<html><body><p>market closed</p></body></html>";
        assert_eq!(parse_quote_page(html), None);
    }

    #[test]
    fn extract_price_strips_thousands_separators() {
        assert_eq!(extract_price("1,234,567.89 VES"), Some(dec!(1234567.89)));
        assert_eq!(extract_price("no digits here"), None);
    }
}
