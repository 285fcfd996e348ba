use anyhow::Result;
use async_trait::async_trait;

/// Outcome of a single price lookup. "Unavailable" is a valid result, not an
/// error: the position stays unpriced and the run continues.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriceQuote {
    Available(f64),
    Unavailable,
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Fetches the latest unit price for a fully-qualified symbol (already
    /// carrying any exchange or currency suffix).
    async fn fetch_price(&self, symbol: &str) -> Result<PriceQuote>;
}
