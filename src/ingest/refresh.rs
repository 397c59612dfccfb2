/// Downstream aggregate refresh after a successful backfill
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{error, info};

use crate::storage::AggregateRefresher;
use crate::types::TimeWindow;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub requested: usize,
    pub failed: usize,
}

pub struct CascadeRefreshTrigger {
    refresher: Arc<dyn AggregateRefresher>,
    chunk_days: i64,
}

impl CascadeRefreshTrigger {
    pub fn new(refresher: Arc<dyn AggregateRefresher>, chunk_days: i64) -> Self {
        CascadeRefreshTrigger {
            refresher,
            chunk_days: chunk_days.max(1),
        }
    }

    /// Start of every refresh call for `window`.
    ///
    /// Windows longer than `chunk_days` whole days are refreshed in chunks.
    pub fn chunk_starts(&self, window: &TimeWindow) -> Vec<DateTime<Utc>> {
        if window.duration().num_days() <= self.chunk_days {
            return vec![window.from];
        }

        let step = Duration::days(self.chunk_days);
        let mut starts = Vec::new();
        let mut cursor = window.from;
        while cursor < window.to {
            starts.push(cursor);
            cursor = (cursor + step).min(window.to);
        }
        starts
    }

    /// Refresh every chunk. Failures are logged and never stop later chunks.
    pub async fn trigger(&self, symbol: &str, window: &TimeWindow) -> RefreshSummary {
        let mut summary = RefreshSummary::default();

        for start in self.chunk_starts(window) {
            summary.requested += 1;
            match self.refresher.refresh(symbol, start).await {
                Ok(()) => info!("Triggered cascade refresh for {} from {}", symbol, start),
                Err(e) => {
                    summary.failed += 1;
                    error!("Failed to trigger cascade refresh for {} from {}: {}", symbol, start, e);
                }
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryRefresher;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_short_window_single_refresh() {
        let refresher = Arc::new(MemoryRefresher::new());
        let trigger = CascadeRefreshTrigger::new(refresher.clone(), 7);
        let window = TimeWindow::new(day(1), day(8)).unwrap();

        let summary = trigger.trigger("EURUSD", &window).await;
        assert_eq!(summary, RefreshSummary { requested: 1, failed: 0 });
        assert_eq!(refresher.calls(), vec![("EURUSD".to_string(), day(1))]);
    }

    #[tokio::test]
    async fn test_long_window_is_chunked() {
        let refresher = Arc::new(MemoryRefresher::new());
        let trigger = CascadeRefreshTrigger::new(refresher.clone(), 7);
        let window = TimeWindow::new(day(1), day(20)).unwrap();

        assert_eq!(trigger.chunk_starts(&window), vec![day(1), day(8), day(15)]);
    }

    #[tokio::test]
    async fn test_failed_chunk_does_not_stop_later_chunks() {
        let refresher = Arc::new(MemoryRefresher::new());
        refresher.fail_at(day(8));
        let trigger = CascadeRefreshTrigger::new(refresher.clone(), 7);
        let window = TimeWindow::new(day(1), day(22)).unwrap();

        let summary = trigger.trigger("EURUSD", &window).await;
        assert_eq!(summary, RefreshSummary { requested: 3, failed: 1 });
        assert_eq!(refresher.calls().len(), 3);
    }
}
