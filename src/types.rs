/// Core type definitions for the catchup ingester
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CatchupError, Result};

/// Source tag written with every backfilled tick
pub const TICK_SOURCE: &str = "dukascopy";

/// Upper-case an instrument code such as `eurusd`, rejecting anything
/// that cannot be part of an archive path
pub fn normalize_symbol(raw: &str) -> Result<String> {
    let symbol = raw.trim().to_uppercase();
    if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CatchupError::InvalidSymbol(raw.to_string()));
    }
    Ok(symbol)
}

/// Requested backfill range, both ends inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self> {
        if from >= to {
            return Err(CatchupError::InvertedRange);
        }
        Ok(TimeWindow { from, to })
    }

    /// Reject windows that start after `now`
    pub fn validate_against(&self, now: DateTime<Utc>) -> Result<()> {
        if self.from > now {
            return Err(CatchupError::FutureStart);
        }
        Ok(())
    }

    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.from <= time && time <= self.to
    }

    pub fn duration(&self) -> Duration {
        self.to - self.from
    }
}

/// Archive granularity served by the vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    Hourly,
    Daily,
}

impl Granularity {
    pub fn as_str(&self) -> &str {
        match self {
            Granularity::Hourly => "hourly",
            Granularity::Daily => "daily",
        }
    }

    pub fn expected_hours(&self) -> u32 {
        match self {
            Granularity::Hourly => 1,
            Granularity::Daily => 24,
        }
    }
}

/// One planned archive retrieval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchUnit {
    pub window_start: DateTime<Utc>,
    pub granularity: Granularity,
    pub expected_hours: u32,
}

impl FetchUnit {
    pub fn hourly(window_start: DateTime<Utc>) -> Self {
        FetchUnit {
            window_start,
            granularity: Granularity::Hourly,
            expected_hours: Granularity::Hourly.expected_hours(),
        }
    }

    pub fn daily(window_start: DateTime<Utc>) -> Self {
        FetchUnit {
            window_start,
            granularity: Granularity::Daily,
            expected_hours: Granularity::Daily.expected_hours(),
        }
    }

    /// Instant that archive millisecond offsets are relative to.
    ///
    /// Daily units are always planned at midnight, hourly ones at the hour.
    pub fn base_time(&self) -> DateTime<Utc> {
        self.window_start
    }

    /// Stable identifier used for failed-unit accounting
    pub fn id(&self) -> String {
        format!("{}/{}", self.window_start.to_rfc3339(), self.granularity.as_str())
    }
}

impl fmt::Display for FetchUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.granularity {
            Granularity::Daily => write!(f, "{} daily", self.window_start.format("%Y-%m-%d")),
            Granularity::Hourly => write!(f, "{} hourly", self.window_start.format("%Y-%m-%d %H:00")),
        }
    }
}

/// Normalized bid/ask quote, keyed by (symbol, time)
#[derive(Debug, Clone, PartialEq)]
pub struct TickRecord {
    pub time: DateTime<Utc>,
    pub symbol: String,
    pub bid: Decimal,
    pub ask: Decimal,
    pub bid_size: i64,
    pub ask_size: i64,
    pub source: &'static str,
}

/// Final statistics of one catchup run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub ticks_inserted: u64,
    pub hours_processed: u64,
    pub failed_units: usize,
    pub cancelled: bool,
}

/// Retry settings for archive downloads
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetrySettings {
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 10_000,
            retryable_statuses: vec![429, 500, 502, 503, 504],
        }
    }
}

/// Configuration for the catchup ingester
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatchupConfig {
    // Vendor
    pub base_url: String,
    pub fetch_timeout_secs: u64,
    pub max_workers: usize,
    pub retry: RetrySettings,

    // Persistence
    pub database_url: String,
    pub db_pool_size: u32,
    pub tick_table: String,
    pub batch_size: usize,
    pub flush_on_shutdown: bool,

    // Downstream refresh
    pub refresh_function: String,
    pub refresh_chunk_days: i64,

    // Validation
    pub large_range_warn_days: i64,

    // Logging
    pub log_level: String,
    pub log_json: bool,
}

impl Default for CatchupConfig {
    fn default() -> Self {
        CatchupConfig {
            base_url: "https://datafeed.dukascopy.com/datafeed".to_string(),
            fetch_timeout_secs: 30,
            max_workers: 25,
            retry: RetrySettings::default(),
            database_url: "postgresql://postgres@localhost:5432/forex_trading".to_string(),
            db_pool_size: 10,
            tick_table: "forex_ticks".to_string(),
            batch_size: 1_000_000,
            flush_on_shutdown: false,
            refresh_function: "cascade_forex_aggregate_refresh".to_string(),
            refresh_chunk_days: 7,
            large_range_warn_days: 30,
            log_level: "warn".to_string(),
            log_json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_rejects_inverted_range() {
        let t = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        assert!(matches!(TimeWindow::new(t, t), Err(CatchupError::InvertedRange)));
        assert!(TimeWindow::new(t, t + Duration::seconds(1)).is_ok());
    }

    #[test]
    fn test_window_contains_is_inclusive() {
        let from = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 1, 15, 11, 0, 0).unwrap();
        let window = TimeWindow::new(from, to).unwrap();

        assert!(window.contains(from));
        assert!(window.contains(to));
        assert!(!window.contains(from - Duration::milliseconds(1)));
        assert!(!window.contains(to + Duration::milliseconds(1)));
    }

    #[test]
    fn test_future_start_rejected() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let window = TimeWindow::new(now + Duration::hours(1), now + Duration::hours(2)).unwrap();
        assert!(matches!(window.validate_against(now), Err(CatchupError::FutureStart)));
    }

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol(" eurusd ").unwrap(), "EURUSD");
        assert!(matches!(normalize_symbol(""), Err(CatchupError::InvalidSymbol(_))));
        assert!(matches!(normalize_symbol("EUR/USD"), Err(CatchupError::InvalidSymbol(_))));
    }

    #[test]
    fn test_unit_identity() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let daily = FetchUnit::daily(start);
        assert_eq!(daily.expected_hours, 24);
        assert_eq!(daily.id(), "2024-01-15T00:00:00+00:00/daily");
        assert_eq!(daily.to_string(), "2024-01-15 daily");
        assert_eq!(FetchUnit::hourly(start).to_string(), "2024-01-15 00:00 hourly");
    }
}
