use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::engine::types::{LoopState, TickOutcome, TickReport};
use crate::market_data::adapters::FeedClient;
use crate::market_data::normaliser::normalise_batch;
use crate::persist::CoinStore;
use crate::telemetry;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(300);

/// The single background writer: fetch, normalise, upsert the batch, commit,
/// sleep, forever. Ticks never overlap because one task runs them in sequence.
pub struct RefreshLoop {
    feed: Arc<dyn FeedClient>,
    store: Arc<dyn CoinStore>,
    interval: Duration,
}

impl RefreshLoop {
    pub fn new(feed: Arc<dyn FeedClient>, store: Arc<dyn CoinStore>) -> Self {
        Self { feed, store, interval: DEFAULT_REFRESH_INTERVAL }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// One fetch-normalise-apply-commit pass. Every failure is logged and
    /// folded into the report; nothing here returns an error.
    #[instrument(skip(self))]
    pub async fn run_tick(&self) -> TickReport {
        metrics::counter!(telemetry::REFRESH_TICKS).increment(1);

        let raw = match self.feed.fetch().await {
            Ok(raw) => raw,
            Err(e) => {
                metrics::counter!(telemetry::REFRESH_FETCH_ERRORS).increment(1);
                error!(error = %e, "feed fetch failed, skipping tick");
                return TickReport::fetch_failed();
            }
        };
        let fetched = raw.len();
        debug!(fetched, "fetched raw rows");

        let batch = normalise_batch(raw);
        if batch.timestamp_fallbacks > 0 {
            metrics::counter!(telemetry::REFRESH_TIMESTAMP_FALLBACKS)
                .increment(batch.timestamp_fallbacks as u64);
        }

        let mut report = TickReport {
            fetched,
            applied: 0,
            timestamp_fallbacks: batch.timestamp_fallbacks,
            outcome: TickOutcome::Committed,
        };

        match self.store.apply_batch(&batch.coins).await {
            Ok(applied) => {
                report.applied = applied;
                metrics::gauge!(telemetry::REFRESH_LAST_BATCH_SIZE).set(applied as f64);
                info!(applied, fallbacks = report.timestamp_fallbacks, "coin data updated");
            }
            Err(e) => {
                report.outcome = TickOutcome::CommitFailed;
                metrics::counter!(telemetry::REFRESH_COMMIT_ERRORS).increment(1);
                error!(error = %e, "batch not committed, will refetch next tick");
            }
        }
        report
    }

    /// Run ticks forever. Starts `Running`, so the first tick fires immediately.
    pub async fn run(self) {
        let mut state = LoopState::Running;
        loop {
            match state {
                LoopState::Running => {
                    let report = self.run_tick().await;
                    if !report.is_committed() {
                        warn!(outcome = ?report.outcome, "tick did not update storage");
                    }
                    state = LoopState::Sleeping;
                }
                LoopState::Sleeping => {
                    debug!(secs = self.interval.as_secs(), "sleeping until next tick");
                    tokio::time::sleep(self.interval).await;
                    state = LoopState::Running;
                }
            }
        }
    }

    /// Move the loop onto its own task. The returned handle is the only
    /// reference to it.
    pub fn spawn(self) -> RefreshHandle {
        info!(interval_secs = self.interval.as_secs(), "starting refresh loop");
        RefreshHandle { task: tokio::spawn(self.run()) }
    }
}

/// Owner of the background refresh task.
#[derive(Debug)]
pub struct RefreshHandle {
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Stop the loop. An uncommitted batch in flight is simply dropped.
    pub fn abort(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
