use std::future::Future;
use std::time::Duration;

use anyhow::Error;
use tracing::debug;

/// Runs a fallible request up to `1 + retries` times, doubling the delay
/// between attempts. Retries belong here, at the network edge; the pipeline
/// core never retries.
pub async fn with_retry<F, Fut, T>(mut request: F, retries: usize, base_delay_ms: u64) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, reqwest::Error>>,
{
    let mut delay = Duration::from_millis(base_delay_ms);
    for attempt in 0..retries {
        match request().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                debug!("Request attempt {} failed: {err}; retrying in {delay:?}", attempt + 1);
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }
    }
    request().await.map_err(Error::from)
}
