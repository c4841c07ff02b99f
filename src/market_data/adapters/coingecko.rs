// CoinGecko REST adapter: one GET per refresh tick

use std::time::Duration;

use tracing::{debug, instrument};

use super::coingecko_types::{decode_markets, MarketsQuery};
use super::{FeedClient, FetchError, RawCoin};
use crate::config::FeedSettings;

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

pub struct CoinGeckoAdapter {
    client: reqwest::Client,
    markets_url: String, // "{base_url}/coins/markets"
    query: MarketsQuery,
}

impl CoinGeckoAdapter {
    pub fn new(base_url: &str, query: MarketsQuery, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("coinx/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            markets_url: format!("{}/coins/markets", base_url.trim_end_matches('/')),
            query,
        })
    }

    pub fn from_settings(feed: &FeedSettings) -> Result<Self, FetchError> {
        Self::new(
            &feed.base_url,
            MarketsQuery::new(&feed.vs_currency, feed.per_page),
            Duration::from_secs(feed.timeout_secs),
        )
    }

    pub fn markets_url(&self) -> &str {
        &self.markets_url
    }
}

#[async_trait::async_trait]
impl FeedClient for CoinGeckoAdapter {
    #[instrument(level = "debug", skip(self), fields(url = %self.markets_url))]
    async fn fetch(&self) -> Result<Vec<RawCoin>, FetchError> {
        let res = self.client.get(&self.markets_url).query(&self.query).send().await?;

        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body: serde_json::Value =
            res.json().await.map_err(|e| FetchError::Decode(e.to_string()))?;
        let coins = decode_markets(body)?;
        debug!(rows = coins.len(), "fetched market snapshot");
        Ok(coins)
    }
}
