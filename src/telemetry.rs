use tracing_subscriber::EnvFilter;

pub const UP: &str = "coinx_up";
pub const REFRESH_TICKS: &str = "coinx_refresh_ticks_total";
pub const REFRESH_FETCH_ERRORS: &str = "coinx_refresh_fetch_errors_total";
pub const REFRESH_COMMIT_ERRORS: &str = "coinx_refresh_commit_errors_total";
pub const REFRESH_TIMESTAMP_FALLBACKS: &str = "coinx_refresh_timestamp_fallbacks_total";
pub const REFRESH_LAST_BATCH_SIZE: &str = "coinx_refresh_last_batch_size";
pub const FEED_MALFORMED_RECORDS: &str = "coinx_feed_malformed_records_total";

/// `RUST_LOG` wins over `default_filter`. Safe to call more than once.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .try_init();
}

#[cfg(feature = "metrics-exporter")]
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()?;

    tracing::info!(port, "prometheus exporter listening on /metrics");
    metrics::gauge!(UP).set(1.0);
    Ok(())
}

#[cfg(not(feature = "metrics-exporter"))]
pub fn init_metrics(_port: u16) -> anyhow::Result<()> {
    Ok(())
}
