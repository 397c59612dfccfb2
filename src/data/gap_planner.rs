/// Gap planning: turn a time window into the fewest vendor archive fetches.
///
/// The vendor serves both hourly and whole-day archives. A day that lies fully
/// inside the window costs one request instead of 24, so the planner walks the
/// window hour by hour from the truncated start and swaps in a daily unit
/// whenever the cursor sits exactly on midnight and the whole day fits.
use chrono::Duration;
use tracing::debug;

use crate::types::{FetchUnit, TimeWindow};
use crate::utils::{start_of_day, truncate_to_hour};

pub struct GapPlanner;

impl GapPlanner {
    /// Plan the fetch units covering `window`, in chronological order
    pub fn plan(window: &TimeWindow) -> Vec<FetchUnit> {
        let mut units = Vec::new();
        let mut cursor = truncate_to_hour(window.from);

        while cursor < window.to {
            let day_start = start_of_day(cursor);
            // Last whole second of the day. The day only qualifies if the
            // window reaches it.
            let day_end = day_start + Duration::days(1) - Duration::seconds(1);

            if cursor == day_start && day_end <= window.to {
                debug!("Using daily file for {}", day_start.format("%Y-%m-%d"));
                units.push(FetchUnit::daily(cursor));
                cursor = day_start + Duration::days(1);
            } else {
                units.push(FetchUnit::hourly(cursor));
                cursor += Duration::hours(1);
            }
        }

        units
    }

    /// Progress denominator: a daily unit counts as 24 hours
    pub fn total_hours(units: &[FetchUnit]) -> u64 {
        units.iter().map(|u| u64::from(u.expected_hours)).sum()
    }
}
