//! Periodic market snapshot poller with an upsert store and a small read API.
//!
//! One background task ([`engine::refresh::RefreshLoop`]) pulls a snapshot from
//! the feed every interval and upserts it by `symbol` in a single batch; the
//! HTTP layer in [`api`] only reads.

pub mod api;
pub mod config;
pub mod engine;
pub mod market_data;
pub mod persist;
pub mod telemetry;
