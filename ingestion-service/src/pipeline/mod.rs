//! Per-market-area fetch, fallback and store, plus the sequential driver.
//!
//! Each area walks an ordered list of [`Strategy`]s. The first strategy that
//! yields rows wins and its rows go to the sink; "no data" moves on to the next
//! strategy; any other error ends the area. Nothing an area does can stop the
//! areas after it.

use std::fmt;

use energy_client::domain::GenerationRecord;

use crate::{
    sinks::GenerationSink,
    sources::{FetchWindow, MarketDataSource, SourceError},
    transform,
};

/// One way of obtaining rows for an area, in order of preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Generation broken down by resource type.
    DetailedGeneration,
    /// Total load under the fallback resource label.
    AggregateLoad,
}

impl Strategy {
    pub const DEFAULT_ORDER: [Strategy; 2] = [Strategy::DetailedGeneration, Strategy::AggregateLoad];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DetailedGeneration => "detailed_generation",
            Self::AggregateLoad => "aggregate_load",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single strategy attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    Success(Vec<GenerationRecord>),
    NoData(String),
    Error(SourceError),
}

/// What happened to one market area in a run.
#[derive(Debug, Clone, PartialEq)]
pub enum AreaOutcome {
    Stored { strategy: Strategy, rows: u64 },
    /// Every strategy reported "no data". Not a failure.
    Skipped { reason: String },
    FetchFailed { strategy: Strategy, error: String },
    StoreFailed { strategy: Strategy, rows: usize, error: String },
}

impl AreaOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::FetchFailed { .. } | Self::StoreFailed { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub areas: Vec<(String, AreaOutcome)>,
}

impl RunReport {
    pub fn stored(&self) -> usize {
        self.count(|o| matches!(o, AreaOutcome::Stored { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, AreaOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(AreaOutcome::is_failure)
    }

    pub fn rows_written(&self) -> u64 {
        self.areas
            .iter()
            .map(|(_, o)| match o {
                AreaOutcome::Stored { rows, .. } => *rows,
                _ => 0,
            })
            .sum()
    }

    pub fn outcome(&self, area: &str) -> Option<&AreaOutcome> {
        self.areas.iter().find(|(a, _)| a == area).map(|(_, o)| o)
    }

    fn count(&self, pred: impl Fn(&AreaOutcome) -> bool) -> usize {
        self.areas.iter().filter(|(_, o)| pred(o)).count()
    }
}

pub struct Pipeline<S, K> {
    pub source: S,
    pub sink: K,
    pub strategies: Vec<Strategy>,
}

impl<S, K> Pipeline<S, K>
where
    S: MarketDataSource,
    K: GenerationSink,
{
    pub fn new(source: S, sink: K) -> Self {
        Self {
            source,
            sink,
            strategies: Strategy::DEFAULT_ORDER.to_vec(),
        }
    }

    /// Process every area in order. Outcomes are collected, never propagated.
    pub async fn run(&self, areas: &[String], window: FetchWindow) -> RunReport {
        tracing::info!(
            areas = areas.len(),
            start = %window.start,
            end = %window.end,
            "starting generation ingestion run"
        );

        let mut report = RunReport::default();
        for area in areas {
            let outcome = self.run_area(area, window).await;
            report.areas.push((area.clone(), outcome));
        }

        tracing::info!(
            stored = report.stored(),
            skipped = report.skipped(),
            failed = report.failed(),
            rows_written = report.rows_written(),
            "generation ingestion run finished"
        );
        report
    }

    /// Fetch with fallback, then store. Every error stays inside this area.
    pub async fn run_area(&self, area: &str, window: FetchWindow) -> AreaOutcome {
        tracing::info!(area, "starting ingestion for market area");

        let mut last_reason = String::from("no strategies configured");
        for &strategy in &self.strategies {
            metrics::counter!("ingest_attempts_total", "strategy" => strategy.as_str()).increment(1);

            match self.attempt(strategy, area, window).await {
                AttemptOutcome::Success(rows) => {
                    tracing::info!(area, %strategy, rows = rows.len(), "fetched market data");
                    return self.store(area, strategy, rows).await;
                }
                AttemptOutcome::NoData(reason) => {
                    tracing::warn!(area, %strategy, reason = %reason, "no matching data, trying next strategy");
                    last_reason = reason;
                }
                AttemptOutcome::Error(e) => {
                    tracing::error!(area, %strategy, error = %e, "failed to fetch market data, skipping area");
                    metrics::counter!("ingest_areas_failed_total", "stage" => "fetch").increment(1);
                    return AreaOutcome::FetchFailed {
                        strategy,
                        error: e.to_string(),
                    };
                }
            }
        }

        tracing::warn!(area, reason = %last_reason, "skipping market area: no data from any strategy");
        metrics::counter!("ingest_areas_skipped_total").increment(1);
        AreaOutcome::Skipped { reason: last_reason }
    }

    async fn attempt(&self, strategy: Strategy, area: &str, window: FetchWindow) -> AttemptOutcome {
        let rows = match strategy {
            Strategy::DetailedGeneration => self
                .source
                .query_generation(area, window)
                .await
                .map(|table| transform::melt_generation(&table, area)),
            Strategy::AggregateLoad => self
                .source
                .query_load(area, window)
                .await
                .map(|table| transform::melt_load(&table, area)),
        };

        match rows {
            Ok(rows) if rows.is_empty() => AttemptOutcome::NoData(format!("empty {strategy} result")),
            Ok(rows) => AttemptOutcome::Success(rows),
            Err(SourceError::NoMatchingData(reason)) => AttemptOutcome::NoData(reason),
            Err(e) => AttemptOutcome::Error(e),
        }
    }

    async fn store(&self, area: &str, strategy: Strategy, rows: Vec<GenerationRecord>) -> AreaOutcome {
        match self.sink.append(&rows).await {
            Ok(written) => {
                tracing::info!(area, %strategy, rows = written, "stored generation records");
                metrics::counter!("ingest_areas_stored_total", "strategy" => strategy.as_str()).increment(1);
                AreaOutcome::Stored { strategy, rows: written }
            }
            Err(e) => {
                tracing::error!(area, %strategy, rows = rows.len(), error = %e, "failed to store generation records");
                metrics::counter!("ingest_areas_failed_total", "stage" => "store").increment(1);
                AreaOutcome::StoreFailed {
                    strategy,
                    rows: rows.len(),
                    error: e.to_string(),
                }
            }
        }
    }
}
