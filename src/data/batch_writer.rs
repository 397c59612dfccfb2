/// Batch writer - accumulates decoded ticks and persists them in fixed-size batches
use std::sync::Arc;
use tracing::{error, info, warn};

use super::tick_buffer::TickBatchBuffer;
use crate::error::{CatchupError, Result};
use crate::storage::TickStore;
use crate::types::TickRecord;

pub struct BatchWriter {
    buffer: TickBatchBuffer,
    batch_size: usize,
    store: Arc<dyn TickStore>,
    inserted: u64,
}

impl BatchWriter {
    pub fn new(store: Arc<dyn TickStore>, batch_size: usize) -> Self {
        BatchWriter {
            buffer: TickBatchBuffer::new(),
            batch_size: batch_size.max(1),
            store,
            inserted: 0,
        }
    }

    pub fn accumulate(&mut self, ticks: Vec<TickRecord>) {
        self.buffer.extend(ticks);
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Rows reported by successful upserts so far
    pub fn inserted(&self) -> u64 {
        self.inserted
    }

    /// Persist full batches while the buffer holds at least `batch_size` ticks.
    ///
    /// Returns rows affected by this call. A failed batch stays buffered.
    pub async fn flush_if_full(&mut self) -> Result<u64> {
        let mut affected = 0;
        while self.buffer.len() >= self.batch_size {
            affected += self.write_head(self.batch_size).await?;
        }
        Ok(affected)
    }

    /// Persist whatever is left. Called once at normal completion.
    pub async fn flush_remainder(&mut self) -> Result<u64> {
        let mut affected = 0;
        while !self.buffer.is_empty() {
            let n = self.buffer.len().min(self.batch_size);
            affected += self.write_head(n).await?;
        }
        Ok(affected)
    }

    /// Drop buffered ticks without persisting them
    pub fn discard_remainder(&mut self) -> usize {
        let dropped = self.buffer.clear();
        if dropped > 0 {
            warn!("Discarding {} unflushed ticks", dropped);
        }
        dropped
    }

    async fn write_head(&mut self, n: usize) -> Result<u64> {
        let batch = self.buffer.head(n);
        let batch_len = batch.len();

        match self.store.upsert_batch(batch).await {
            Ok(affected) => {
                self.buffer.drain_head(batch_len);
                self.inserted += affected;
                info!("💾 Inserted {} ticks (batch of {}, {} total)", affected, batch_len, self.inserted);
                Ok(affected)
            }
            Err(e) => {
                error!("Error inserting batch of {} ticks: {}", batch_len, e);
                Err(CatchupError::FlushFailed {
                    batch_len,
                    reason: e.to_string(),
                })
            }
        }
    }
}
