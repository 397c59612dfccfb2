pub mod orchestrator;
pub mod progress;
pub mod refresh;
pub mod worker_pool;

pub use orchestrator::{CatchupOrchestrator, RunPhase, RunSettings};
pub use progress::ProgressTracker;
pub use refresh::{CascadeRefreshTrigger, RefreshSummary};
pub use worker_pool::{DispatchSummary, FetchOutcome, FetchWorkerPool};
