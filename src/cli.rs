/// Command-line surface of the catchup binary
use chrono::{DateTime, Utc};
use clap::Parser;
use std::path::PathBuf;

use crate::error::Result;
use crate::types::{CatchupConfig, IngestStats, TimeWindow};
use crate::utils::{parse_boundary, validate_timerange};

#[derive(Debug, Parser)]
#[command(name = "tick-catchup")]
#[command(about = "Backfill historical forex ticks into Postgres", long_about = None)]
pub struct CatchupArgs {
    /// Instrument code, e.g. EURUSD
    #[arg(long)]
    pub symbol: String,

    /// Start of the range (ISO-8601, e.g. 2024-01-15T00:00:00Z)
    #[arg(long)]
    pub from: String,

    /// End of the range (ISO-8601). Defaults to now.
    #[arg(long)]
    pub to: Option<String>,

    /// Postgres connection string
    #[arg(long = "db-url", env = "DATABASE_URL")]
    pub db_url: Option<String>,

    /// Concurrent archive downloads
    #[arg(long)]
    pub workers: Option<usize>,

    /// Ticks per insert batch
    #[arg(long = "batch-size")]
    pub batch_size: Option<usize>,

    /// Optional TOML config file
    #[arg(long, env = "CATCHUP_CONFIG")]
    pub config: Option<PathBuf>,
}

impl CatchupArgs {
    /// Flags take precedence over every other config layer
    pub fn apply_overrides(&self, config: &mut CatchupConfig) {
        if let Some(url) = &self.db_url {
            config.database_url = url.clone();
        }
        if let Some(workers) = self.workers {
            config.max_workers = workers;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
    }

    /// Parse and validate the requested range against `now`
    pub fn time_window(&self, now: DateTime<Utc>, warn_after_days: i64) -> Result<TimeWindow> {
        let from = parse_boundary("from", &self.from)?;
        let to = match &self.to {
            Some(raw) => parse_boundary("to", raw)?,
            None => now,
        };
        validate_timerange(from, to, now, warn_after_days)
    }
}

/// 0 when anything was inserted, 1 otherwise
pub fn exit_code(stats: &IngestStats) -> u8 {
    if stats.ticks_inserted > 0 {
        0
    } else {
        1
    }
}
