/// Centralized error types for the catchup ingester
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatchupError {
    // Validation Errors
    #[error("Invalid {field} time format: {value}")]
    InvalidTimeFormat { field: &'static str, value: String },

    #[error("from_time must be before to_time")]
    InvertedRange,

    #[error("Cannot fetch future data")]
    FutureStart,

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    // Network Errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("HTTP status {status} for {url}")]
    HttpStatus { status: u16, url: String },

    // Data Errors
    #[error("Archive decompression failed: {0}")]
    Decompression(String),

    #[error("Serialization failed: {0}")]
    SerializationError(#[from] serde_json::Error),

    // Persistence Errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Failed to insert batch of {batch_len} ticks: {reason}")]
    FlushFailed { batch_len: usize, reason: String },

    #[error("Cascade refresh failed: {0}")]
    RefreshFailed(String),

    // Configuration Errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    // File I/O Errors
    #[error("File I/O error: {0}")]
    FileError(#[from] std::io::Error),

    // System Errors
    #[error("Worker failed: {0}")]
    WorkerFailed(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type Result<T> = std::result::Result<T, CatchupError>;

impl CatchupError {
    /// Check if error is a bad-input error reported before any work starts
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CatchupError::InvalidTimeFormat { .. }
                | CatchupError::InvertedRange
                | CatchupError::FutureStart
                | CatchupError::InvalidSymbol(_)
        )
    }

    /// Check if a transport error is worth another attempt.
    ///
    /// HTTP status codes are judged by the retry policy, not here.
    pub fn is_retryable(&self) -> bool {
        match self {
            CatchupError::HttpError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }

    /// Get error code for logging/monitoring
    pub fn error_code(&self) -> &str {
        match self {
            CatchupError::InvalidTimeFormat { .. } => "VAL_001",
            CatchupError::InvertedRange => "VAL_002",
            CatchupError::FutureStart => "VAL_003",
            CatchupError::InvalidSymbol(_) => "VAL_004",
            CatchupError::HttpError(_) => "NET_001",
            CatchupError::HttpStatus { .. } => "NET_002",
            CatchupError::Decompression(_) => "DATA_001",
            CatchupError::SerializationError(_) => "DATA_002",
            CatchupError::DatabaseError(_) => "DB_001",
            CatchupError::FlushFailed { .. } => "DB_002",
            CatchupError::RefreshFailed(_) => "DB_003",
            CatchupError::ConfigError(_) => "CFG_001",
            CatchupError::ConfigSource(_) => "CFG_002",
            CatchupError::FileError(_) => "FILE_001",
            CatchupError::WorkerFailed(_) => "SYS_001",
            CatchupError::InternalError(_) => "INT_001",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages_match_cli_contract() {
        let err = CatchupError::InvalidTimeFormat {
            field: "from",
            value: "yesterday".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid from time format: yesterday");
        assert!(err.is_validation());

        assert_eq!(CatchupError::InvertedRange.to_string(), "from_time must be before to_time");
        assert_eq!(CatchupError::FutureStart.to_string(), "Cannot fetch future data");
    }

    #[test]
    fn test_error_codes() {
        let err = CatchupError::FlushFailed {
            batch_len: 10,
            reason: "connection reset".to_string(),
        };
        assert_eq!(err.error_code(), "DB_002");
        assert!(!err.is_validation());
        assert!(!err.is_retryable());
    }
}
