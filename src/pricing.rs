//! Concurrent market-price retrieval for the whole portfolio.
//!
//! Each ticker's lookup is independent and read-only over the portfolio, so
//! all lookups run concurrently and their results are merged back in a single
//! synchronization point ([`crate::portfolio::apply_prices`]).

use std::collections::HashMap;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::lookthrough::LookupMiss;
use crate::portfolio::{AssetClass, Position};
use crate::price_provider::{PriceProvider, PriceQuote};
use crate::ticker;
use crate::ui;

/// Candidate provider symbols for one ticker: the normalized identifier with
/// each configured suffix appended, then the bare identifier as a fallback.
fn candidates(normalized: &str, suffixes: &[String]) -> Vec<String> {
    let mut symbols: Vec<String> = suffixes.iter().map(|s| format!("{normalized}{s}")).collect();
    symbols.push(normalized.to_string());
    symbols
}

/// Fetches prices for every distinct non-cash ticker.
///
/// Returns a map keyed by normalized ticker (`None` marks an unavailable
/// price) plus the misses for the run summary. Cash is valued at the unit
/// without a lookup. Provider errors degrade to misses: a partially priced
/// portfolio is still a valid run.
pub async fn fetch_prices(
    positions: &[Position],
    provider: &dyn PriceProvider,
    stock_suffixes: &[String],
    crypto_suffixes: &[String],
) -> (HashMap<String, Option<f64>>, Vec<LookupMiss>) {
    let mut targets: Vec<(String, Vec<String>)> = Vec::new();
    let mut prices: HashMap<String, Option<f64>> = HashMap::new();

    for position in positions {
        let normalized = ticker::normalize(&position.ticker, position.class);
        if position.class == AssetClass::Cash {
            prices.insert(normalized.to_string(), Some(1.0));
            continue;
        }
        if targets.iter().any(|(t, _)| t == normalized) {
            continue;
        }
        let suffixes = match position.class {
            AssetClass::Crypto => crypto_suffixes,
            _ => stock_suffixes,
        };
        targets.push((normalized.to_string(), candidates(normalized, suffixes)));
    }

    let pb = ui::new_progress_bar(targets.len() as u64, true);
    pb.set_message("Fetching prices...");

    let lookups = targets.iter().map(|(normalized, symbols)| {
        let pb = pb.clone();
        async move {
            let price = fetch_first_available(provider, symbols).await;
            pb.inc(1);
            (normalized.clone(), price)
        }
    });
    let results = join_all(lookups).await;
    pb.finish_and_clear();

    let mut misses = Vec::new();
    for (normalized, price) in results {
        if price.is_none() {
            warn!("No price found for ticker '{}'", normalized);
            misses.push(LookupMiss::Price { ticker: normalized.clone() });
        }
        prices.insert(normalized, price);
    }
    (prices, misses)
}

async fn fetch_first_available(provider: &dyn PriceProvider, symbols: &[String]) -> Option<f64> {
    for symbol in symbols {
        match provider.fetch_price(symbol).await {
            Ok(PriceQuote::Available(price)) => {
                debug!("Priced '{}' at {}", symbol, price);
                return Some(price);
            }
            Ok(PriceQuote::Unavailable) => continue,
            Err(err) => {
                warn!("Price lookup for '{}' failed: {err}", symbol);
                continue;
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;

    struct MockProvider {
        prices: HashMap<String, f64>,
        failing: Vec<String>,
    }

    #[async_trait]
    impl PriceProvider for MockProvider {
        async fn fetch_price(&self, symbol: &str) -> Result<PriceQuote> {
            if self.failing.iter().any(|s| s == symbol) {
                anyhow::bail!("provider offline for {symbol}");
            }
            Ok(self
                .prices
                .get(symbol)
                .map(|p| PriceQuote::Available(*p))
                .unwrap_or(PriceQuote::Unavailable))
        }
    }

    fn position(ticker: &str, class: AssetClass) -> Position {
        Position {
            ticker: ticker.to_string(),
            class,
            label: ticker.to_string(),
            sector: String::new(),
            country: String::new(),
            quantity: Some(1.0),
            price: None,
            market_value: None,
            value_share: None,
        }
    }

    fn suffixes(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn tries_suffixes_in_order_then_bare_symbol() {
        let provider = MockProvider {
            prices: HashMap::from([("SAP.DE".to_string(), 150.0), ("AAPL".to_string(), 200.0)]),
            failing: Vec::new(),
        };
        let positions = vec![
            position("SAP.F", AssetClass::Equity),
            position("AAPL", AssetClass::Equity),
        ];
        let (prices, misses) = fetch_prices(
            &positions,
            &provider,
            &suffixes(&[".DE"]),
            &suffixes(&["-EUR"]),
        )
        .await;
        assert_eq!(prices.get("SAP"), Some(&Some(150.0)));
        // AAPL.DE is unknown, the bare-symbol fallback resolves it.
        assert_eq!(prices.get("AAPL"), Some(&Some(200.0)));
        assert!(misses.is_empty());
    }

    #[tokio::test]
    async fn crypto_uses_currency_pair_suffixes() {
        let provider = MockProvider {
            prices: HashMap::from([("BTC-EUR".to_string(), 60000.0)]),
            failing: Vec::new(),
        };
        let positions = vec![position("BTC-EUR", AssetClass::Crypto)];
        let (prices, _) = fetch_prices(
            &positions,
            &provider,
            &suffixes(&[".DE"]),
            &suffixes(&["-EUR"]),
        )
        .await;
        assert_eq!(prices.get("BTC"), Some(&Some(60000.0)));
    }

    #[tokio::test]
    async fn cash_is_priced_at_unit_without_lookup() {
        let provider = MockProvider { prices: HashMap::new(), failing: Vec::new() };
        let positions = vec![position("-", AssetClass::Cash)];
        let (prices, misses) = fetch_prices(&positions, &provider, &[], &[]).await;
        assert_eq!(prices.get("-"), Some(&Some(1.0)));
        assert!(misses.is_empty());
    }

    #[tokio::test]
    async fn unavailable_price_is_a_miss_not_a_failure() {
        let provider = MockProvider { prices: HashMap::new(), failing: Vec::new() };
        let positions = vec![position("GHOST", AssetClass::Equity)];
        let (prices, misses) = fetch_prices(&positions, &provider, &suffixes(&[".DE"]), &[]).await;
        assert_eq!(prices.get("GHOST"), Some(&None));
        assert_eq!(misses, vec![LookupMiss::Price { ticker: "GHOST".to_string() }]);
    }

    #[tokio::test]
    async fn provider_errors_degrade_to_misses() {
        let provider = MockProvider {
            prices: HashMap::new(),
            failing: vec!["DOWN.DE".to_string(), "DOWN".to_string()],
        };
        let positions = vec![position("DOWN", AssetClass::Equity)];
        let (prices, misses) = fetch_prices(&positions, &provider, &suffixes(&[".DE"]), &[]).await;
        assert_eq!(prices.get("DOWN"), Some(&None));
        assert_eq!(misses.len(), 1);
    }
}
