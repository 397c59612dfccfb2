/// Postgres-backed tick store and aggregate refresher
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::debug;

use super::{AggregateRefresher, TickStore};
use crate::error::{CatchupError, Result};
use crate::types::TickRecord;

/// Rows sent per staging insert
const STAGING_CHUNK: usize = 50_000;

/// Build a lazily connecting pool. No connection is opened until the first query.
pub fn lazy_pool(database_url: &str, pool_size: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(pool_size)
        .acquire_timeout(Duration::from_secs(30))
        .connect_lazy(database_url)?;
    Ok(pool)
}

pub struct PgTickStore {
    pool: PgPool,
    tick_table: String,
}

impl PgTickStore {
    /// `tick_table` must already be a validated SQL identifier
    pub fn new(pool: PgPool, tick_table: impl Into<String>) -> Self {
        PgTickStore {
            pool,
            tick_table: tick_table.into(),
        }
    }

    pub fn connect_lazy(database_url: &str, pool_size: u32, tick_table: impl Into<String>) -> Result<Self> {
        Ok(Self::new(lazy_pool(database_url, pool_size)?, tick_table))
    }

    fn upsert_sql(&self) -> String {
        // DISTINCT ON keeps the highest seq per key, i.e. the last record in buffer order
        format!(
            r#"
            INSERT INTO {table} (time, symbol, bid, ask, bid_size, ask_size, source)
            SELECT DISTINCT ON (symbol, time) time, symbol, bid, ask, bid_size, ask_size, source
            FROM temp_catchup_ticks
            ORDER BY symbol, time, seq DESC
            ON CONFLICT (symbol, time) DO UPDATE SET
                bid = EXCLUDED.bid,
                ask = EXCLUDED.ask,
                bid_size = EXCLUDED.bid_size,
                ask_size = EXCLUDED.ask_size,
                source = EXCLUDED.source
            "#,
            table = self.tick_table
        )
    }
}

#[async_trait]
impl TickStore for PgTickStore {
    async fn upsert_batch(&self, batch: &[TickRecord]) -> Result<u64> {
        if batch.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            CREATE TEMP TABLE temp_catchup_ticks (
                seq BIGINT NOT NULL,
                time TIMESTAMPTZ NOT NULL,
                symbol VARCHAR(20) NOT NULL,
                bid NUMERIC(12, 5) NOT NULL,
                ask NUMERIC(12, 5) NOT NULL,
                bid_size BIGINT NOT NULL,
                ask_size BIGINT NOT NULL,
                source VARCHAR(50) NOT NULL
            ) ON COMMIT DROP
            "#,
        )
        .execute(&mut *tx)
        .await?;

        for (chunk_idx, chunk) in batch.chunks(STAGING_CHUNK).enumerate() {
            let offset = (chunk_idx * STAGING_CHUNK) as i64;
            let len = chunk.len();

            let mut seqs: Vec<i64> = Vec::with_capacity(len);
            let mut times: Vec<DateTime<Utc>> = Vec::with_capacity(len);
            let mut symbols: Vec<String> = Vec::with_capacity(len);
            let mut bids: Vec<Decimal> = Vec::with_capacity(len);
            let mut asks: Vec<Decimal> = Vec::with_capacity(len);
            let mut bid_sizes: Vec<i64> = Vec::with_capacity(len);
            let mut ask_sizes: Vec<i64> = Vec::with_capacity(len);
            let mut sources: Vec<String> = Vec::with_capacity(len);

            for (i, tick) in chunk.iter().enumerate() {
                seqs.push(offset + i as i64);
                times.push(tick.time);
                symbols.push(tick.symbol.clone());
                bids.push(tick.bid);
                asks.push(tick.ask);
                bid_sizes.push(tick.bid_size);
                ask_sizes.push(tick.ask_size);
                sources.push(tick.source.to_string());
            }

            sqlx::query(
                r#"
                INSERT INTO temp_catchup_ticks (seq, time, symbol, bid, ask, bid_size, ask_size, source)
                SELECT * FROM UNNEST(
                    $1::bigint[], $2::timestamptz[], $3::varchar[], $4::numeric[],
                    $5::numeric[], $6::bigint[], $7::bigint[], $8::varchar[]
                )
                "#,
            )
            .bind(seqs)
            .bind(times)
            .bind(symbols)
            .bind(bids)
            .bind(asks)
            .bind(bid_sizes)
            .bind(ask_sizes)
            .bind(sources)
            .execute(&mut *tx)
            .await?;
        }

        let result = sqlx::query(&self.upsert_sql()).execute(&mut *tx).await?;
        tx.commit().await?;

        let affected = result.rows_affected();
        debug!("Upserted {} rows from batch of {}", affected, batch.len());
        Ok(affected)
    }
}

/// Calls the downstream cascade procedure, e.g.
/// `SELECT cascade_forex_aggregate_refresh($1, $2::timestamptz)`
pub struct PgAggregateRefresher {
    pool: PgPool,
    function: String,
}

impl PgAggregateRefresher {
    /// `function` must already be a validated SQL identifier
    pub fn new(pool: PgPool, function: impl Into<String>) -> Self {
        PgAggregateRefresher {
            pool,
            function: function.into(),
        }
    }
}

#[async_trait]
impl AggregateRefresher for PgAggregateRefresher {
    async fn refresh(&self, symbol: &str, start: DateTime<Utc>) -> Result<()> {
        let sql = format!("SELECT {}($1, $2::timestamptz)", self.function);
        sqlx::query(&sql)
            .bind(symbol)
            .bind(start)
            .execute(&self.pool)
            .await
            .map_err(|e| CatchupError::RefreshFailed(e.to_string()))?;

        debug!("Refresh procedure {} returned for {} from {}", self.function, symbol, start);
        Ok(())
    }
}
