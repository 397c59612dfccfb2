pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod ingest;
pub mod storage;
pub mod types;
pub mod utils;
pub mod vendor;

pub use error::{CatchupError, Result};
pub use ingest::{CatchupOrchestrator, RunSettings};
pub use types::*;
