/// In-process store and refresher used for dry runs and tests
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;

use super::{AggregateRefresher, TickStore};
use crate::error::{CatchupError, Result};
use crate::types::TickRecord;

#[derive(Default)]
struct StoreState {
    rows: HashMap<(String, DateTime<Utc>), TickRecord>,
    flushes: usize,
    fail_next: usize,
}

/// Keyed by (symbol, time); last write wins, same as the Postgres upsert
#[derive(Default)]
pub struct MemoryTickStore {
    state: Mutex<StoreState>,
}

impl MemoryTickStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` upserts fail without touching stored rows
    pub fn fail_next(&self, n: usize) {
        self.state.lock().fail_next = n;
    }

    /// Stored rows sorted by (symbol, time)
    pub fn rows(&self) -> Vec<TickRecord> {
        let mut rows: Vec<_> = self.state.lock().rows.values().cloned().collect();
        rows.sort_by(|a, b| (&a.symbol, a.time).cmp(&(&b.symbol, b.time)));
        rows
    }

    pub fn len(&self) -> usize {
        self.state.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Successful upserts so far
    pub fn flush_count(&self) -> usize {
        self.state.lock().flushes
    }
}

#[async_trait]
impl TickStore for MemoryTickStore {
    async fn upsert_batch(&self, batch: &[TickRecord]) -> Result<u64> {
        let mut state = self.state.lock();

        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(CatchupError::InternalError("simulated store failure".to_string()));
        }

        let mut keys = HashMap::with_capacity(batch.len());
        for tick in batch {
            keys.insert((tick.symbol.clone(), tick.time), tick.clone());
        }

        let affected = keys.len() as u64;
        state.rows.extend(keys);
        state.flushes += 1;
        Ok(affected)
    }
}

/// Records every refresh call
#[derive(Default)]
pub struct MemoryRefresher {
    calls: Mutex<Vec<(String, DateTime<Utc>)>>,
    failing_starts: Mutex<Vec<DateTime<Utc>>>,
}

impl MemoryRefresher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make calls for this chunk start fail
    pub fn fail_at(&self, start: DateTime<Utc>) {
        self.failing_starts.lock().push(start);
    }

    pub fn calls(&self) -> Vec<(String, DateTime<Utc>)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl AggregateRefresher for MemoryRefresher {
    async fn refresh(&self, symbol: &str, start: DateTime<Utc>) -> Result<()> {
        self.calls.lock().push((symbol.to_string(), start));
        if self.failing_starts.lock().contains(&start) {
            return Err(CatchupError::RefreshFailed(format!("simulated failure at {}", start)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TICK_SOURCE;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn tick(sec: u32, bid: i64) -> TickRecord {
        TickRecord {
            time: Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, sec).unwrap(),
            symbol: "EURUSD".to_string(),
            bid: Decimal::new(bid, 5),
            ask: Decimal::new(bid + 2, 5),
            bid_size: 1,
            ask_size: 1,
            source: TICK_SOURCE,
        }
    }

    #[tokio::test]
    async fn test_duplicate_keys_keep_last() {
        let store = MemoryTickStore::new();
        let affected = store
            .upsert_batch(&[tick(0, 100_000), tick(1, 100_010), tick(0, 100_020)])
            .await
            .unwrap();

        assert_eq!(affected, 2);
        assert_eq!(store.rows()[0].bid, Decimal::new(100_020, 5));
    }

    #[tokio::test]
    async fn test_same_batch_twice_is_idempotent() {
        let store = MemoryTickStore::new();
        let batch = vec![tick(0, 100_000), tick(1, 100_010)];

        store.upsert_batch(&batch).await.unwrap();
        let once = store.rows();
        store.upsert_batch(&batch).await.unwrap();

        assert_eq!(store.rows(), once);
        assert_eq!(store.flush_count(), 2);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = MemoryTickStore::new();
        store.fail_next(1);
        assert!(store.upsert_batch(&[tick(0, 1)]).await.is_err());
        assert!(store.is_empty());
        assert_eq!(store.upsert_batch(&[tick(0, 1)]).await.unwrap(), 1);
    }
}
