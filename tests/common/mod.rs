#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use coinx_rs::market_data::adapters::{FeedClient, FetchError, RawCoin};
use parking_lot::Mutex;

/// Feed that replays queued responses in order, then returns empty snapshots.
#[derive(Default)]
pub struct ScriptedFeed {
    responses: Mutex<VecDeque<Result<Vec<RawCoin>, FetchError>>>,
    calls: AtomicUsize,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, rows: Vec<RawCoin>) -> &Self {
        self.responses.lock().push_back(Ok(rows));
        self
    }

    pub fn push_err(&self, err: FetchError) -> &Self {
        self.responses.lock().push_back(Err(err));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl FeedClient for ScriptedFeed {
    async fn fetch(&self) -> Result<Vec<RawCoin>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses.lock().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

pub fn raw(symbol: &str, price: f64, market_cap: f64) -> RawCoin {
    RawCoin {
        symbol: symbol.to_string(),
        name: Some(format!("{symbol} coin")),
        current_price: Some(price),
        market_cap: Some(market_cap),
        price_change_percentage_24h: Some(1.0),
        last_updated: Some("2024-01-01T00:00:00Z".to_string()),
    }
}
