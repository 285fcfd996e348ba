use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::price_provider::{PriceProvider, PriceQuote};
use crate::providers::util::with_retry;

const RETRIES: usize = 2;
const RETRY_DELAY_MS: u64 = 250;

/// Latest-price lookup against the Yahoo Finance chart endpoint.
pub struct YahooFinanceProvider {
    base_url: String,
    client: reqwest::Client,
}

impl YahooFinanceProvider {
    pub fn new(base_url: &str) -> Self {
        YahooFinanceProvider {
            base_url: base_url.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Deserialize, Debug)]
struct YahooPriceResponse {
    chart: PriceChartResult,
}

#[derive(Deserialize, Debug)]
struct PriceChartResult {
    result: Option<Vec<PriceChartItem>>,
}

#[derive(Deserialize, Debug)]
struct PriceChartItem {
    meta: PriceChartMeta,
}

#[derive(Deserialize, Debug)]
struct PriceChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: Option<f64>,
}

#[async_trait]
impl PriceProvider for YahooFinanceProvider {
    #[instrument(
        name = "YahooPriceFetch",
        skip(self),
        fields(symbol = %symbol)
    )]
    async fn fetch_price(&self, symbol: &str) -> Result<PriceQuote> {
        let url = format!(
            "{}/v8/finance/chart/{}?interval=1d&range=5d",
            self.base_url, symbol
        );
        debug!("Requesting price data from {}", url);

        let response = with_retry(
            || async { self.client.get(&url).send().await },
            RETRIES,
            RETRY_DELAY_MS,
        )
        .await?;

        // Yahoo answers unknown symbols with 404 and a chart error body;
        // both map to "no price", not to a failed run.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!("Symbol '{}' unknown to provider", symbol);
            return Ok(PriceQuote::Unavailable);
        }
        if !response.status().is_success() {
            return Err(anyhow!(
                "price request for '{}' failed with status {}",
                symbol,
                response.status()
            ));
        }

        let body = response.text().await?;
        let parsed: YahooPriceResponse = serde_json::from_str(&body)
            .map_err(|e| anyhow!("failed to parse price response for '{}': {}", symbol, e))?;
        let price = parsed
            .chart
            .result
            .as_ref()
            .and_then(|items| items.first())
            .and_then(|item| item.meta.regular_market_price);

        match price {
            Some(price) if price > 0.0 => Ok(PriceQuote::Available(price)),
            _ => Ok(PriceQuote::Unavailable),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_chart(symbol: &str, status: u16, body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/v8/finance/chart/{symbol}")))
            .respond_with(ResponseTemplate::new(status).set_body_string(body.to_string()))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn parses_regular_market_price() {
        let body = r#"{"chart":{"result":[{"meta":{"regularMarketPrice":123.45,"currency":"EUR"}}]}}"#;
        let server = mock_chart("SAP.DE", 200, body).await;
        let provider = YahooFinanceProvider::new(&server.uri());
        let quote = provider.fetch_price("SAP.DE").await.unwrap();
        assert_eq!(quote, PriceQuote::Available(123.45));
    }

    #[tokio::test]
    async fn unknown_symbol_is_unavailable_not_an_error() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found"}}}"#;
        let server = mock_chart("NOPE.DE", 404, body).await;
        let provider = YahooFinanceProvider::new(&server.uri());
        let quote = provider.fetch_price("NOPE.DE").await.unwrap();
        assert_eq!(quote, PriceQuote::Unavailable);
    }

    #[tokio::test]
    async fn missing_price_field_is_unavailable() {
        let body = r#"{"chart":{"result":[{"meta":{"currency":"EUR"}}]}}"#;
        let server = mock_chart("X", 200, body).await;
        let provider = YahooFinanceProvider::new(&server.uri());
        let quote = provider.fetch_price("X").await.unwrap();
        assert_eq!(quote, PriceQuote::Unavailable);
    }

    #[tokio::test]
    async fn malformed_body_is_an_error() {
        let server = mock_chart("X", 200, "not json at all").await;
        let provider = YahooFinanceProvider::new(&server.uri());
        let err = provider.fetch_price("X").await.unwrap_err();
        assert!(err.to_string().contains("parse"), "error was: {err}");
    }

    #[tokio::test]
    async fn server_error_propagates() {
        let server = mock_chart("X", 500, "oops").await;
        let provider = YahooFinanceProvider::new(&server.uri());
        assert!(provider.fetch_price("X").await.is_err());
    }
}
