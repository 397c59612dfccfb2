/// Main entry point for the tick catchup ingester
use chrono::Utc;
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

use tick_catchup::{
    cli::{exit_code, CatchupArgs},
    config::{load_config, validate_config},
    events::{CatchupEvent, EventSink, StdoutSink},
    storage::{postgres::lazy_pool, PgAggregateRefresher, PgTickStore},
    utils::{init_logging, spawn_signal_listener, ShutdownSignal},
    vendor::{HttpArchiveClient, RetryPolicy, RetryingFetcher},
    CatchupConfig, CatchupOrchestrator, RunSettings, TimeWindow,
};

/// Application state for one catchup run
struct CatchupApp {
    config: CatchupConfig,
    orchestrator: CatchupOrchestrator,
}

impl CatchupApp {
    fn new(config: CatchupConfig, sink: Arc<dyn EventSink>, shutdown: ShutdownSignal) -> anyhow::Result<Self> {
        // Archive source with retry
        let client = HttpArchiveClient::new(config.base_url.clone(), config.fetch_timeout_secs)?;
        let fetcher = RetryingFetcher::new(client, RetryPolicy::from_settings(&config.retry), shutdown.clone());

        // Persistence; the pool connects on first use
        let pool = lazy_pool(&config.database_url, config.db_pool_size)?;
        let store = PgTickStore::new(pool.clone(), config.tick_table.clone());
        let refresher = PgAggregateRefresher::new(pool, config.refresh_function.clone());

        let orchestrator = CatchupOrchestrator::new(
            RunSettings::from(&config),
            Arc::new(fetcher),
            Arc::new(store),
            Arc::new(refresher),
            sink,
            shutdown,
        );

        Ok(CatchupApp { config, orchestrator })
    }

    async fn run(&self, symbol: &str, window: TimeWindow) -> tick_catchup::Result<u8> {
        info!(
            "🚀 Starting catchup for {} from {} to {} ({} workers, batch {})",
            symbol, window.from, window.to, self.config.max_workers, self.config.batch_size
        );
        let stats = self.orchestrator.run(symbol, window).await?;
        Ok(exit_code(&stats))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CatchupArgs::parse();
    let sink: Arc<dyn EventSink> = Arc::new(StdoutSink);

    // Step 1: Configuration (defaults, file, env, then flags)
    let mut config = match load_config(args.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            sink.emit(&CatchupEvent::error(e.to_string()));
            return ExitCode::from(1);
        }
    };
    args.apply_overrides(&mut config);
    if let Err(e) = validate_config(&config) {
        sink.emit(&CatchupEvent::error(e.to_string()));
        return ExitCode::from(1);
    }

    // Step 2: Logging to stderr
    init_logging(&config);

    // Step 3: Validate the range before touching the network
    let window = match args.time_window(Utc::now(), config.large_range_warn_days) {
        Ok(window) => window,
        Err(e) => {
            error!("Invalid input ({}): {}", e.error_code(), e);
            sink.emit(&CatchupEvent::error(e.to_string()));
            return ExitCode::from(1);
        }
    };

    // Step 4: Wire up and run
    let shutdown = ShutdownSignal::new();
    spawn_signal_listener(shutdown.clone());

    let app = match CatchupApp::new(config, sink.clone(), shutdown) {
        Ok(app) => app,
        Err(e) => {
            error!("Startup failed: {:#}", e);
            sink.emit(&CatchupEvent::error(format!("Catchup failed: {}", e)));
            return ExitCode::from(1);
        }
    };

    match app.run(&args.symbol, window).await {
        Ok(code) => ExitCode::from(code),
        Err(e) if e.is_validation() => {
            sink.emit(&CatchupEvent::error(e.to_string()));
            ExitCode::from(1)
        }
        Err(e) => {
            error!("Catchup failed ({}): {}", e.error_code(), e);
            sink.emit(&CatchupEvent::error(format!("Catchup failed: {}", e)));
            ExitCode::from(1)
        }
    }
}
