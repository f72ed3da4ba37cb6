use anyhow::Result;
use ingestion_service::{
    config::AppConfig,
    metrics_server, observability,
    pipeline::Pipeline,
    sinks::PgGenerationSink,
    sources::{EntsoeClient, FetchWindow},
};
use sqlx::postgres::PgPoolOptions;
use time::OffsetDateTime;

/// Batch job: fetch the configured market areas once and append what was found.
///
/// Per-area failures are logged and never change the exit status; only
/// startup problems (config, client construction) do.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;
    cfg.validate_ingestion()?;

    // No scrape endpoint for a one-shot job; the counters are logged once the run ends.
    let metrics = match &cfg.metrics {
        Some(_) => Some(metrics_server::install()?),
        None => None,
    };

    let source = EntsoeClient::new(&cfg.provider)?;

    // Lazy pool: an unreachable database surfaces as per-area storage failures
    // instead of aborting the run before anything is fetched.
    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect_lazy(&cfg.database.uri)?;
    let sink = PgGenerationSink::new(pool, cfg.ingestion.batch_size);

    let pipeline = Pipeline::new(source, sink);
    let window = FetchWindow::trailing(
        OffsetDateTime::now_utc(),
        cfg.ingestion.end_lag_hours,
        cfg.ingestion.lookback_window_hours,
    );

    let report = pipeline.run(&cfg.ingestion.market_areas, window).await;

    for (area, outcome) in report.areas.iter().filter(|(_, o)| o.is_failure()) {
        tracing::warn!(area = %area, outcome = ?outcome, "market area not ingested");
    }

    if let Some(handle) = metrics {
        tracing::info!(metrics = %metrics_server::render(&handle), "ingestion run metrics");
    }

    Ok(())
}
