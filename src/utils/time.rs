/// Time utilities for backfill windows
use chrono::{DateTime, Duration, DurationRound, NaiveDateTime, Utc};
use tracing::warn;

use crate::error::{CatchupError, Result};
use crate::types::TimeWindow;

/// Parse an ISO-8601 instant. A trailing `Z` or explicit offset is honoured,
/// a bare date-time is taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    // Offsets without a colon, e.g. 2024-01-15T10:30:00+0000
    if let Ok(dt) = DateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parse one CLI boundary, naming the field in the error
pub fn parse_boundary(field: &'static str, value: &str) -> Result<DateTime<Utc>> {
    parse_timestamp(value).ok_or_else(|| CatchupError::InvalidTimeFormat {
        field,
        value: value.to_string(),
    })
}

/// Validate the requested time range before any work starts
pub fn validate_timerange(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    now: DateTime<Utc>,
    warn_after_days: i64,
) -> Result<TimeWindow> {
    let window = TimeWindow::new(from, to)?;

    let days = window.duration().num_days();
    if days > warn_after_days {
        warn!("Large time range requested: {} days. This may take a while.", days);
    }

    window.validate_against(now)?;
    Ok(window)
}

pub fn truncate_to_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    t.duration_trunc(Duration::hours(1)).unwrap_or(t)
}

pub fn start_of_day(t: DateTime<Utc>) -> DateTime<Utc> {
    t.duration_trunc(Duration::days(1)).unwrap_or(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_zulu_and_offsets() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();

        assert_eq!(parse_timestamp("2024-01-15T10:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T10:30:00+00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T12:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T10:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15 10:30:00"), Some(expected));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2024-13-45T10:30:00Z"), None);

        let err = parse_boundary("to", "nope").unwrap_err();
        assert_eq!(err.to_string(), "Invalid to time format: nope");
    }

    #[test]
    fn test_validate_timerange() {
        let now = Utc.with_ymd_and_hms(2024, 1, 20, 0, 0, 0).unwrap();
        let from = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 1, 15, 11, 0, 0).unwrap();

        assert!(validate_timerange(from, to, now, 30).is_ok());
        assert!(matches!(
            validate_timerange(to, from, now, 30),
            Err(CatchupError::InvertedRange)
        ));
        assert!(matches!(
            validate_timerange(from, from, now, 30),
            Err(CatchupError::InvertedRange)
        ));

        let future = now + Duration::hours(1);
        assert!(matches!(
            validate_timerange(future, future + Duration::hours(1), now, 30),
            Err(CatchupError::FutureStart)
        ));
    }

    #[test]
    fn test_truncation() {
        let t = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 15).unwrap();
        assert_eq!(truncate_to_hour(t), Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap());
        assert_eq!(start_of_day(t), Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap());
    }
}
