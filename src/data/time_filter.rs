/// Keep only ticks inside the requested window.
///
/// Daily archives carry the whole day even when the window covers part of it.
use crate::types::{TickRecord, TimeWindow};

pub fn filter_to_window(ticks: Vec<TickRecord>, window: &TimeWindow) -> Vec<TickRecord> {
    ticks.into_iter().filter(|t| window.contains(t.time)).collect()
}
