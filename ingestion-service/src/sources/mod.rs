pub mod area;
pub mod document;
pub mod entsoe;
pub mod psr_type;

pub use entsoe::EntsoeClient;

use time::{Duration, OffsetDateTime, Time};

use crate::transform::{GenerationTable, LoadTable};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// The provider has nothing for the requested area/window.
    #[error("no matching data: {0}")]
    NoMatchingData(String),
    #[error("unknown market area: {0}")]
    UnknownArea(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// Half-open `[start, end)` UTC query window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

impl FetchWindow {
    /// Window of `length_hours` ending `end_lag_hours` before `now`, aligned
    /// to whole hours since the provider works on hourly period boundaries.
    pub fn trailing(now: OffsetDateTime, end_lag_hours: u32, length_hours: u32) -> Self {
        let now = now.to_offset(time::UtcOffset::UTC);
        let hour = Time::from_hms(now.hour(), 0, 0).unwrap_or(Time::MIDNIGHT);
        let end = now.replace_time(hour) - Duration::hours(i64::from(end_lag_hours));
        let start = end - Duration::hours(i64::from(length_hours));
        Self { start, end }
    }
}

/// A market-data provider exposing the two queries the pipeline falls back between.
///
/// Implementations perform a single round trip per call and never retry.
#[async_trait::async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn query_generation(&self, area: &str, window: FetchWindow) -> Result<GenerationTable, SourceError>;

    async fn query_load(&self, area: &str, window: FetchWindow) -> Result<LoadTable, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn trailing_window_is_hour_aligned_and_lagged() {
        let now = datetime!(2024-05-10 13:47:12 UTC);
        let w = FetchWindow::trailing(now, 72, 24);

        assert_eq!(w.end, datetime!(2024-05-07 13:00:00 UTC));
        assert_eq!(w.start, datetime!(2024-05-06 13:00:00 UTC));
    }

    #[test]
    fn trailing_window_converts_local_clock_to_utc() {
        let now = datetime!(2024-05-10 02:30:00 +03:00);
        let w = FetchWindow::trailing(now, 0, 1);

        assert_eq!(w.end, datetime!(2024-05-09 23:00:00 UTC));
        assert_eq!(w.start, datetime!(2024-05-09 22:00:00 UTC));
    }
}
