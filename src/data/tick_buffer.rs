/// Pending-write buffer for decoded ticks
use crate::types::TickRecord;

/// Ordered buffer of ticks waiting to be persisted.
///
/// Only the batch writer touches it, so it needs no locking.
#[derive(Debug, Default)]
pub struct TickBatchBuffer {
    ticks: Vec<TickRecord>,
}

impl TickBatchBuffer {
    pub fn new() -> Self {
        TickBatchBuffer { ticks: Vec::new() }
    }

    /// Append ticks, keeping arrival order
    pub fn extend(&mut self, ticks: Vec<TickRecord>) {
        if self.ticks.is_empty() {
            self.ticks = ticks;
        } else {
            self.ticks.extend(ticks);
        }
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// Oldest `n` ticks (or all of them if fewer)
    pub fn head(&self, n: usize) -> &[TickRecord] {
        &self.ticks[..n.min(self.ticks.len())]
    }

    /// Drop the oldest `n` ticks once they are persisted
    pub fn drain_head(&mut self, n: usize) {
        let n = n.min(self.ticks.len());
        self.ticks.drain(..n);
    }

    pub fn as_slice(&self) -> &[TickRecord] {
        &self.ticks
    }

    /// Drop everything, returning how many ticks were dropped
    pub fn clear(&mut self) -> usize {
        let dropped = self.ticks.len();
        self.ticks.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TICK_SOURCE;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    fn ticks(n: usize) -> Vec<TickRecord> {
        let base = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        (0..n)
            .map(|i| TickRecord {
                time: base + Duration::seconds(i as i64),
                symbol: "EURUSD".to_string(),
                bid: Decimal::ONE,
                ask: Decimal::ONE,
                bid_size: i as i64,
                ask_size: 0,
                source: TICK_SOURCE,
            })
            .collect()
    }

    #[test]
    fn test_head_and_drain_keep_order() {
        let mut buffer = TickBatchBuffer::new();
        buffer.extend(ticks(3));
        buffer.extend(ticks(2));
        assert_eq!(buffer.len(), 5);

        assert_eq!(buffer.head(2).len(), 2);
        assert_eq!(buffer.head(10).len(), 5);

        buffer.drain_head(3);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.as_slice()[0].bid_size, 0);
        assert_eq!(buffer.as_slice()[1].bid_size, 1);
    }

    #[test]
    fn test_clear_reports_dropped() {
        let mut buffer = TickBatchBuffer::new();
        buffer.extend(ticks(4));
        assert_eq!(buffer.clear(), 4);
        assert!(buffer.is_empty());
        assert_eq!(buffer.clear(), 0);
    }
}
