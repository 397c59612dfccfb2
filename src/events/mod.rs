pub mod sink;
pub mod types;

pub use sink::{EventSink, MemorySink, StdoutSink};
pub use types::{CatchupEvent, CompleteEvent, ProgressEvent, RunStatus};
