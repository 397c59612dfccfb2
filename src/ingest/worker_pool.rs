/// Bounded fetch pool - downloads archives concurrently, hands results to one consumer
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::types::FetchUnit;
use crate::utils::ShutdownSignal;
use crate::vendor::{ArchiveFetcher, ArchiveRequest};

/// Completed retrieval for one unit. `None` means nothing to process.
#[derive(Debug)]
pub struct FetchOutcome {
    pub unit: FetchUnit,
    pub archive: Option<Vec<u8>>,
}

/// What the dispatcher did before it stopped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub dispatched: usize,
    pub skipped: usize,
}

pub struct FetchWorkerPool {
    fetcher: Arc<dyn ArchiveFetcher>,
    max_workers: usize,
    shutdown: ShutdownSignal,
}

impl FetchWorkerPool {
    pub fn new(fetcher: Arc<dyn ArchiveFetcher>, max_workers: usize, shutdown: ShutdownSignal) -> Self {
        FetchWorkerPool {
            fetcher,
            max_workers: max_workers.max(1),
            shutdown,
        }
    }

    /// Start fetching `units`. Outcomes arrive in completion order; the
    /// channel closes once every dispatched fetch has reported.
    pub fn fetch_all(
        &self,
        symbol: &str,
        units: Vec<FetchUnit>,
    ) -> (mpsc::Receiver<FetchOutcome>, JoinHandle<DispatchSummary>) {
        let (tx, rx) = mpsc::channel(self.max_workers * 2);
        let permits = Arc::new(Semaphore::new(self.max_workers));
        let fetcher = self.fetcher.clone();
        let shutdown = self.shutdown.clone();
        let symbol = symbol.to_uppercase();

        let dispatcher = tokio::spawn(async move {
            let total = units.len();
            let mut summary = DispatchSummary::default();

            for unit in units {
                if shutdown.is_raised() {
                    break;
                }

                let permit = tokio::select! {
                    permit = permits.clone().acquire_owned() => match permit {
                        Ok(p) => p,
                        Err(_) => break,
                    },
                    _ = shutdown.wait() => break,
                };
                if shutdown.is_raised() {
                    break;
                }

                let fetcher = fetcher.clone();
                let tx = tx.clone();
                let request = ArchiveRequest::for_unit(&symbol, &unit);
                summary.dispatched += 1;

                tokio::spawn(async move {
                    let fetched = AssertUnwindSafe(fetcher.fetch(&request)).catch_unwind().await;
                    let archive = match fetched {
                        Ok(Ok(archive)) => archive,
                        Ok(Err(e)) => {
                            error!("Failed to download {}: {}", fetcher.describe(&request), e);
                            None
                        }
                        Err(_) => {
                            error!("Fetch task for {} panicked", fetcher.describe(&request));
                            None
                        }
                    };

                    // Hold the permit until the consumer has room for the result
                    let _ = tx.send(FetchOutcome { unit, archive }).await;
                    drop(permit);
                });
            }

            summary.skipped = total - summary.dispatched;
            if summary.skipped > 0 {
                info!("🛑 Dispatch stopped, {} units not fetched", summary.skipped);
            } else {
                debug!("All {} units dispatched", total);
            }
            summary
        });

        (rx, dispatcher)
    }
}
