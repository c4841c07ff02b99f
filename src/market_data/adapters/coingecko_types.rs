// Source: https://api.coingecko.com/api/v3/coins/markets
use serde::Serialize;
use tracing::warn;

use super::{FetchError, RawCoin};

pub const MAX_PER_PAGE: u32 = 100;

/// Query string for `/coins/markets`. Always the first page, no sparkline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketsQuery {
    pub vs_currency: String,
    pub order: &'static str,
    pub per_page: u32,
    pub page: u32,
    pub sparkline: bool,
}

impl MarketsQuery {
    pub fn new(vs_currency: &str, per_page: u32) -> Self {
        Self {
            vs_currency: vs_currency.to_string(),
            order: "market_cap_desc",
            per_page: per_page.clamp(1, MAX_PER_PAGE),
            page: 1,
            sparkline: false,
        }
    }
}

/// Decode the markets array element by element. An element that is not a
/// usable row (no `symbol`, wrong types) is logged and dropped so the rest of
/// the snapshot still goes through. A body that is not an array at all fails.
pub fn decode_markets(body: serde_json::Value) -> Result<Vec<RawCoin>, FetchError> {
    let serde_json::Value::Array(items) = body else {
        return Err(FetchError::Decode("expected a JSON array of market rows".to_string()));
    };

    let mut coins = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<RawCoin>(item) {
            Ok(coin) => coins.push(coin),
            Err(e) => {
                metrics::counter!(crate::telemetry::FEED_MALFORMED_RECORDS).increment(1);
                warn!(index = idx, error = %e, "dropping malformed market row");
            }
        }
    }
    Ok(coins)
}
