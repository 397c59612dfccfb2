/// Progress tracking - counters behind one lock, an event per update
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

use crate::events::types::round_to;
use crate::events::{CatchupEvent, CompleteEvent, EventSink, ProgressEvent, RunStatus};
use crate::utils::{resident_memory_mb, Clock};

#[derive(Debug, Default)]
struct ProgressState {
    completed_hours: u64,
    ticks_processed: u64,
    failed_units: Vec<String>,
}

pub struct ProgressTracker {
    state: Mutex<ProgressState>,
    total_hours: u64,
    started: Instant,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
}

impl ProgressTracker {
    pub fn new(total_hours: u64, clock: Arc<dyn Clock>, sink: Arc<dyn EventSink>) -> Self {
        let started = clock.now();
        ProgressTracker {
            state: Mutex::new(ProgressState::default()),
            total_hours,
            started,
            clock,
            sink,
        }
    }

    /// Record one consumed unit and emit a progress event
    pub fn record(&self, hours: u64, ticks: u64, failed_unit: Option<&str>) {
        let mut state = self.state.lock();
        state.completed_hours += hours;
        state.ticks_processed += ticks;
        if let Some(id) = failed_unit {
            state.failed_units.push(id.to_string());
        }

        let elapsed = self.elapsed_secs();
        let done = state.completed_hours;
        let progress_pct = if self.total_hours > 0 {
            round_to(done as f64 / self.total_hours as f64 * 100.0, 1)
        } else {
            100.0
        };
        let eta_seconds = if done > 0 {
            (self.total_hours.saturating_sub(done) as f64 / done as f64 * elapsed).round() as u64
        } else {
            0
        };

        let event = CatchupEvent::Progress(ProgressEvent {
            current_hour: done,
            total_hours: self.total_hours,
            progress_pct,
            ticks_processed: state.ticks_processed,
            ticks_per_second: rate(state.ticks_processed, elapsed),
            memory_mb: resident_memory_mb(),
            eta_seconds,
            failed_hours: state.failed_units.len(),
        });

        // Emitted under the lock so events come out in counter order
        self.sink.emit(&event);
    }

    /// Emit the terminal event and return it
    pub fn final_report(&self, ticks_inserted: u64) -> CompleteEvent {
        let state = self.state.lock();
        let elapsed = self.elapsed_secs();

        let report = CompleteEvent {
            status: if state.failed_units.is_empty() {
                RunStatus::Success
            } else {
                RunStatus::Partial
            },
            ticks_inserted,
            ticks_processed: state.ticks_processed,
            hours_processed: state.completed_hours,
            hours_failed: state.failed_units.len(),
            elapsed_seconds: round_to(elapsed, 2),
            ticks_per_second: rate(state.ticks_processed, elapsed),
        };

        self.sink.emit(&CatchupEvent::Complete(report.clone()));
        report
    }

    fn elapsed_secs(&self) -> f64 {
        self.clock.now().saturating_duration_since(self.started).as_secs_f64()
    }
}

fn rate(count: u64, elapsed_secs: f64) -> u64 {
    if elapsed_secs > 0.0 {
        (count as f64 / elapsed_secs).round() as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;
    use crate::utils::clock::ManualClock;
    use std::time::Duration;

    fn tracker(total: u64) -> (Arc<ManualClock>, Arc<MemorySink>, ProgressTracker) {
        let clock = Arc::new(ManualClock::new());
        let sink = Arc::new(MemorySink::new());
        let tracker = ProgressTracker::new(total, clock.clone(), sink.clone());
        (clock, sink, tracker)
    }

    fn progress(event: &CatchupEvent) -> &ProgressEvent {
        match event {
            CatchupEvent::Progress(p) => p,
            other => panic!("expected progress, got {:?}", other),
        }
    }

    #[test]
    fn test_progress_event_per_record() {
        let (clock, sink, tracker) = tracker(48);

        clock.advance(Duration::from_secs(10));
        tracker.record(24, 1_000, None);
        clock.advance(Duration::from_secs(10));
        tracker.record(1, 500, None);

        let events = sink.events();
        assert_eq!(events.len(), 2);

        let first = progress(&events[0]);
        assert_eq!(first.current_hour, 24);
        assert_eq!(first.progress_pct, 50.0);
        assert_eq!(first.ticks_per_second, 100);
        // (48 - 24) / 24 * 10s
        assert_eq!(first.eta_seconds, 10);

        let second = progress(&events[1]);
        assert_eq!(second.current_hour, 25);
        assert_eq!(second.progress_pct, 52.1);
        assert_eq!(second.ticks_processed, 1_500);
    }

    #[test]
    fn test_eta_is_zero_before_progress() {
        let (clock, sink, tracker) = tracker(10);
        clock.advance(Duration::from_secs(5));
        tracker.record(0, 0, Some("2024-01-15T10:00:00+00:00/hourly"));

        let events = sink.events();
        let p = progress(&events[0]);
        assert_eq!(p.eta_seconds, 0);
        assert_eq!(p.failed_hours, 1);
    }

    #[test]
    fn test_final_report_status() {
        let (clock, sink, tracker) = tracker(2);
        tracker.record(1, 100, None);
        clock.advance(Duration::from_secs(10));

        // Nothing persisted, e.g. the buffer was discarded on shutdown
        let report = tracker.final_report(0);
        assert_eq!(report.status, RunStatus::Success);
        assert_eq!(report.ticks_inserted, 0);
        assert_eq!(report.ticks_processed, 100);
        assert_eq!(report.elapsed_seconds, 10.0);
        // Throughput is over processed ticks, not inserted rows
        assert_eq!(report.ticks_per_second, 10);
        assert!(matches!(sink.events().last(), Some(CatchupEvent::Complete(_))));

        tracker.record(1, 0, Some("unit"));
        let report = tracker.final_report(0);
        assert_eq!(report.status, RunStatus::Partial);
        assert_eq!(report.hours_processed, 2);
        assert_eq!(report.hours_failed, 1);
    }

    #[test]
    fn test_rates_and_eta_are_rounded() {
        let (clock, sink, tracker) = tracker(3);
        clock.advance(Duration::from_millis(1_500));
        tracker.record(2, 6, None);

        let events = sink.events();
        let p = progress(&events[0]);
        // 6 / 1.5s = 4, (3 - 2) / 2 * 1.5s = 0.75 -> 1
        assert_eq!(p.ticks_per_second, 4);
        assert_eq!(p.eta_seconds, 1);

        clock.advance(Duration::from_millis(500));
        // 7 ticks over 2s = 3.5 -> 4
        tracker.record(0, 1, None);
        assert_eq!(tracker.final_report(0).ticks_per_second, 4);
    }
}
