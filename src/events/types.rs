/// Machine-readable events written to stdout, one JSON object per line
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CatchupEvent {
    Progress(ProgressEvent),
    Complete(CompleteEvent),
    Error { message: String },
}

impl CatchupEvent {
    pub fn error(message: impl Into<String>) -> Self {
        CatchupEvent::Error {
            message: message.into(),
        }
    }

    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub current_hour: u64,
    pub total_hours: u64,
    pub progress_pct: f64,
    pub ticks_processed: u64,
    pub ticks_per_second: u64,
    pub memory_mb: u64,
    pub eta_seconds: u64,
    pub failed_hours: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Partial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteEvent {
    pub status: RunStatus,
    pub ticks_inserted: u64,
    pub ticks_processed: u64,
    pub hours_processed: u64,
    pub hours_failed: usize,
    pub elapsed_seconds: f64,
    pub ticks_per_second: u64,
}

/// Round for display, e.g. `round_to(12.345, 1) == 12.3`
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_error_event_shape() {
        let line = CatchupEvent::error("Cannot fetch future data").to_json_line().unwrap();
        assert_eq!(line, r#"{"type":"error","message":"Cannot fetch future data"}"#);
    }

    #[test]
    fn test_complete_event_shape() {
        let event = CatchupEvent::Complete(CompleteEvent {
            status: RunStatus::Partial,
            ticks_inserted: 10,
            ticks_processed: 12,
            hours_processed: 24,
            hours_failed: 1,
            elapsed_seconds: 1.25,
            ticks_per_second: 9,
        });
        let json: Value = serde_json::from_str(&event.to_json_line().unwrap()).unwrap();

        assert_eq!(json["type"], "complete");
        assert_eq!(json["status"], "partial");
        assert_eq!(json["hours_failed"], 1);
        assert_eq!(json["elapsed_seconds"], 1.25);
    }

    #[test]
    fn test_progress_event_tag() {
        let event = CatchupEvent::Progress(ProgressEvent {
            current_hour: 1,
            total_hours: 2,
            progress_pct: 50.0,
            ticks_processed: 0,
            ticks_per_second: 0,
            memory_mb: 12,
            eta_seconds: 3,
            failed_hours: 0,
        });
        let json: Value = serde_json::from_str(&event.to_json_line().unwrap()).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["progress_pct"], 50.0);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(33.333_3, 1), 33.3);
        assert_eq!(round_to(1.005_1, 2), 1.01);
    }
}
