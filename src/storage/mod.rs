/// Persistence and downstream-refresh capabilities
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::TickRecord;

pub mod memory;
pub mod postgres;

pub use memory::{MemoryRefresher, MemoryTickStore};
pub use postgres::{PgAggregateRefresher, PgTickStore};

/// Idempotent bulk upsert keyed by (symbol, time)
#[async_trait]
pub trait TickStore: Send + Sync {
    /// Persist one batch atomically and return the affected row count.
    ///
    /// Later records win when a key repeats inside the batch.
    async fn upsert_batch(&self, batch: &[TickRecord]) -> Result<u64>;
}

/// Recompute derived aggregates from `start` onwards
#[async_trait]
pub trait AggregateRefresher: Send + Sync {
    async fn refresh(&self, symbol: &str, start: DateTime<Utc>) -> Result<()>;
}
