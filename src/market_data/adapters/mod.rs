// Shared feed contract + the raw record every adapter produces

use serde::Deserialize;

/// One upstream market row, before normalisation. Only `symbol` is required;
/// everything else may be absent or null and is filled in by the normaliser.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawCoin {
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("feed transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("feed answered with HTTP {0}")]
    Status(u16),
    #[error("feed body could not be decoded: {0}")]
    Decode(String),
}

/// A single request/response snapshot of current market rows.
/// No retries and no partial results: any failure fails the whole call.
#[async_trait::async_trait]
pub trait FeedClient: Send + Sync {
    async fn fetch(&self) -> Result<Vec<RawCoin>, FetchError>;
}

pub mod coingecko;
pub mod coingecko_types;
