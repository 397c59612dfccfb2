/// Event sinks - where progress and terminal events go
use parking_lot::Mutex;
use std::io::Write;
use tracing::error;

use super::types::CatchupEvent;

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &CatchupEvent);
}

/// Writes each event as one JSON line on stdout and flushes immediately
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl EventSink for StdoutSink {
    fn emit(&self, event: &CatchupEvent) {
        let line = match event.to_json_line() {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize event: {}", e);
                return;
            }
        };

        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
            error!("Failed to write event to stdout: {}", e);
        }
    }
}

/// Keeps events in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<CatchupEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CatchupEvent> {
        self.events.lock().clone()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &CatchupEvent) {
        self.events.lock().push(event.clone());
    }
}
