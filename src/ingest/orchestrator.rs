/// Catchup orchestrator - plan, fetch, decode, persist, refresh
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::progress::ProgressTracker;
use super::refresh::CascadeRefreshTrigger;
use super::worker_pool::{FetchOutcome, FetchWorkerPool};
use crate::data::{decode, filter_to_window, BatchWriter, GapPlanner};
use crate::error::{CatchupError, Result};
use crate::events::EventSink;
use crate::storage::{AggregateRefresher, TickStore};
use crate::types::{normalize_symbol, CatchupConfig, IngestStats, TimeWindow};
use crate::utils::{Clock, ShutdownSignal, SystemClock};
use crate::vendor::ArchiveFetcher;

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Planning,
    Fetching,
    Decoding,
    Filtering,
    Buffering,
    Flushing,
    Draining,
    Refreshing,
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Planning => "planning",
            RunPhase::Fetching => "fetching",
            RunPhase::Decoding => "decoding",
            RunPhase::Filtering => "filtering",
            RunPhase::Buffering => "buffering",
            RunPhase::Flushing => "flushing",
            RunPhase::Draining => "draining",
            RunPhase::Refreshing => "refreshing",
            RunPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Run-level knobs taken from `CatchupConfig`
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub max_workers: usize,
    pub batch_size: usize,
    pub flush_on_shutdown: bool,
    pub refresh_chunk_days: i64,
}

impl From<&CatchupConfig> for RunSettings {
    fn from(config: &CatchupConfig) -> Self {
        RunSettings {
            max_workers: config.max_workers,
            batch_size: config.batch_size,
            flush_on_shutdown: config.flush_on_shutdown,
            refresh_chunk_days: config.refresh_chunk_days,
        }
    }
}

pub struct CatchupOrchestrator {
    fetcher: Arc<dyn ArchiveFetcher>,
    store: Arc<dyn TickStore>,
    refresher: Arc<dyn AggregateRefresher>,
    sink: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    shutdown: ShutdownSignal,
    settings: RunSettings,
}

impl CatchupOrchestrator {
    pub fn new(
        settings: RunSettings,
        fetcher: Arc<dyn ArchiveFetcher>,
        store: Arc<dyn TickStore>,
        refresher: Arc<dyn AggregateRefresher>,
        sink: Arc<dyn EventSink>,
        shutdown: ShutdownSignal,
    ) -> Self {
        CatchupOrchestrator {
            fetcher,
            store,
            refresher,
            sink,
            clock: Arc::new(SystemClock),
            shutdown,
            settings,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Backfill `symbol` over `window`. Emits progress events as units
    /// complete and exactly one terminal event on success.
    pub async fn run(&self, symbol: &str, window: TimeWindow) -> Result<IngestStats> {
        let symbol = normalize_symbol(symbol)?;
        let run_id = Uuid::new_v4();
        let span = info_span!("catchup", %run_id, symbol = %symbol);

        self.run_inner(&symbol, window).instrument(span).await
    }

    async fn run_inner(&self, symbol: &str, window: TimeWindow) -> Result<IngestStats> {
        let mut stats = IngestStats::default();

        // Step 1: Plan fetch units
        enter(RunPhase::Planning);
        let units = GapPlanner::plan(&window);
        let total_hours = GapPlanner::total_hours(&units);
        info!("📋 Fetching {} files ({} hours of data)", units.len(), total_hours);

        let progress = ProgressTracker::new(total_hours, self.clock.clone(), self.sink.clone());
        let mut writer = BatchWriter::new(self.store.clone(), self.settings.batch_size);

        // Step 2: Fetch concurrently, consume completions one at a time
        enter(RunPhase::Fetching);
        let pool = FetchWorkerPool::new(self.fetcher.clone(), self.settings.max_workers, self.shutdown.clone());
        let (mut completions, dispatcher) = pool.fetch_all(symbol, units);

        while let Some(outcome) = completions.recv().await {
            let unit = outcome.unit;
            if let Err(e) = self.process_outcome(symbol, &window, outcome, &mut writer, &progress).await {
                error!("Failed to process {} ({}): {}", unit, e.error_code(), e);
                progress.record(0, 0, Some(&unit.id()));
                stats.failed_units += 1;
            }
            stats.hours_processed += u64::from(unit.expected_hours);
        }

        match dispatcher.await {
            Ok(summary) => debug!("Dispatched {} units, skipped {}", summary.dispatched, summary.skipped),
            Err(e) => error!("Fetch dispatcher failed: {}", e),
        }

        stats.cancelled = self.shutdown.is_raised();

        // Step 3: Drain whatever is still buffered
        enter(RunPhase::Draining);
        if stats.cancelled && !self.settings.flush_on_shutdown {
            let dropped = writer.discard_remainder();
            warn!("🛑 Shutdown requested, {} buffered ticks not persisted", dropped);
        } else {
            writer.flush_remainder().await?;
        }
        stats.ticks_inserted = writer.inserted();

        // Step 4: Downstream refresh, only for a complete run that wrote something
        if !stats.cancelled && stats.ticks_inserted > 0 {
            enter(RunPhase::Refreshing);
            let trigger = CascadeRefreshTrigger::new(self.refresher.clone(), self.settings.refresh_chunk_days);
            let summary = trigger.trigger(symbol, &window).await;
            if summary.failed > 0 {
                warn!("{} of {} refresh calls failed", summary.failed, summary.requested);
            }
        }

        enter(RunPhase::Done);
        let report = progress.final_report(stats.ticks_inserted);
        info!(
            "✅ Catchup finished: {} ticks inserted, {} hours processed, status {:?}",
            stats.ticks_inserted, stats.hours_processed, report.status
        );

        Ok(stats)
    }

    async fn process_outcome(
        &self,
        symbol: &str,
        window: &TimeWindow,
        outcome: FetchOutcome,
        writer: &mut BatchWriter,
        progress: &ProgressTracker,
    ) -> Result<()> {
        let unit = outcome.unit;

        let ticks = match outcome.archive {
            Some(bytes) => {
                debug!("{} {}", RunPhase::Decoding, unit);
                let owned_symbol = symbol.to_string();
                let base_time = unit.base_time();
                let decoded = tokio::task::spawn_blocking(move || decode(&bytes, &owned_symbol, base_time))
                    .await
                    .map_err(|e| CatchupError::WorkerFailed(format!("decode task for {} failed: {}", unit, e)))?;

                debug!("{} {} ({} decoded)", RunPhase::Filtering, unit, decoded.len());
                filter_to_window(decoded, window)
            }
            None => Vec::new(),
        };

        debug!("{} {} ({} ticks)", RunPhase::Buffering, unit, ticks.len());
        let count = ticks.len() as u64;
        writer.accumulate(ticks);
        progress.record(u64::from(unit.expected_hours), count, None);

        debug!("{} check at {} buffered", RunPhase::Flushing, writer.buffered());
        writer.flush_if_full().await?;
        Ok(())
    }
}

fn enter(phase: RunPhase) {
    info!(%phase, "Entering {} phase", phase);
}
