// Market data module entrypoint
pub mod adapters;   // upstream fetchers (e.g. CoinGecko)
pub mod normaliser; // raw rows -> canonical coins
