// Convert raw feed rows into canonical coins ready for upsert.
// Nothing in here may fail a batch: bad fields are substituted and logged.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, warn};

use crate::market_data::adapters::RawCoin;
use crate::persist::NewCoin;

#[derive(Debug, thiserror::Error)]
pub enum TimestampError {
    #[error("no upstream timestamp")]
    Missing,
    #[error("unparsable timestamp {value:?}: {source}")]
    Invalid {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Parse an upstream ISO-8601 timestamp into naive UTC wall time.
///
/// Accepts a trailing `Z` or an explicit offset in any of `±hh:mm`, `±hhmm`
/// or `±hh` (converted to UTC and dropped). A string with no offset at all is
/// taken to already be UTC.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, TimestampError> {
    let raw = raw.trim();
    let rfc_err = match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => return Ok(ts.with_timezone(&Utc).naive_utc()),
        Err(e) => e,
    };

    // `%#z` takes the basic and hour-only offset forms RFC 3339 rejects.
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%#z") {
        return Ok(ts.with_timezone(&Utc).naive_utc());
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|_| TimestampError::Invalid { value: raw.to_string(), source: rfc_err })
}

/// `parse_timestamp`, falling back to `fallback` when the value is absent or
/// unparsable. The error is handed back so the caller can log and count it.
pub fn parse_or(raw: Option<&str>, fallback: NaiveDateTime) -> (NaiveDateTime, Option<TimestampError>) {
    match raw.map(parse_timestamp).unwrap_or(Err(TimestampError::Missing)) {
        Ok(ts) => (ts, None),
        Err(e) => (fallback, Some(e)),
    }
}

/// `parse_or` against the current UTC time.
pub fn parse_or_now(raw: Option<&str>) -> NaiveDateTime {
    let (ts, err) = parse_or(raw, Utc::now().naive_utc());
    if let Some(e) = err {
        debug!(error = %e, "using current time for last_updated");
    }
    ts
}

#[derive(Debug, Default)]
pub struct NormalisedBatch {
    pub coins: Vec<NewCoin>,
    /// Rows whose `last_updated` had to be replaced with the processing time.
    pub timestamp_fallbacks: usize,
}

/// Normalise one raw row. `now` is the substitute for a missing or bad timestamp.
pub fn normalise(raw: RawCoin, now: NaiveDateTime) -> (NewCoin, Option<TimestampError>) {
    let (last_updated, ts_err) = parse_or(raw.last_updated.as_deref(), now);
    match &ts_err {
        Some(TimestampError::Missing) => {
            debug!(symbol = %raw.symbol, "no last_updated upstream, using processing time")
        }
        Some(e @ TimestampError::Invalid { .. }) => {
            warn!(symbol = %raw.symbol, error = %e, "bad last_updated upstream, using processing time")
        }
        None => {}
    }

    if raw.current_price.is_none() || raw.market_cap.is_none() {
        debug!(symbol = %raw.symbol, "null price or market cap upstream, storing 0.0");
    }

    let coin = NewCoin {
        name: raw.name.unwrap_or_else(|| raw.symbol.clone()),
        symbol: raw.symbol,
        current_price: raw.current_price.unwrap_or(0.0),
        market_cap: raw.market_cap.unwrap_or(0.0),
        change_24h: raw.price_change_percentage_24h.unwrap_or(0.0),
        last_updated,
    };
    (coin, ts_err)
}

/// Normalise a whole snapshot, preserving feed order. `now` is sampled once
/// so every substituted timestamp in one tick is identical.
pub fn normalise_batch(raw: Vec<RawCoin>) -> NormalisedBatch {
    let now = Utc::now().naive_utc();
    let mut batch = NormalisedBatch { coins: Vec::with_capacity(raw.len()), timestamp_fallbacks: 0 };
    for row in raw {
        let (coin, ts_err) = normalise(row, now);
        if ts_err.is_some() {
            batch.timestamp_fallbacks += 1;
        }
        batch.coins.push(coin);
    }
    batch
}
