/// Centralized error types for bar aggregation
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BarError {
    // Protocol Errors
    #[error("Untracked symbol: {0}")]
    UntrackedSymbol(String),

    #[error("Symbol mismatch: accumulator {expected}, trade {actual}")]
    SymbolMismatch { expected: String, actual: String },

    // Engine Errors
    #[error("Bar requested from empty bucket: {0}")]
    EmptyBucket(String),

    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),

    // Configuration Errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // File I/O Errors
    #[error("File I/O error: {0}")]
    FileError(#[from] std::io::Error),

    #[error("CSV write failed: {0}")]
    CsvError(#[from] csv::Error),

    // Network Errors
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    // Sink Errors
    #[error("Sink {sink} failed: {message}")]
    SinkFailed { sink: String, message: String },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, BarError>;

impl BarError {
    /// Check if error must stop the service
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BarError::EmptyBucket(_)
                | BarError::UntrackedSymbol(_)
                | BarError::ConfigError(_)
                | BarError::InvalidThreshold(_)
        )
    }

    /// Get error code for logging/monitoring
    pub fn error_code(&self) -> &str {
        match self {
            BarError::UntrackedSymbol(_) => "PROTO_001",
            BarError::SymbolMismatch { .. } => "PROTO_002",
            BarError::EmptyBucket(_) => "ENGINE_001",
            BarError::InvalidThreshold(_) => "CFG_002",
            BarError::ConfigError(_) => "CFG_001",
            BarError::FileError(_) => "FILE_001",
            BarError::CsvError(_) => "FILE_002",
            BarError::WebSocketError(_) => "NET_001",
            BarError::SinkFailed { .. } => "SINK_001",
            BarError::Other(_) => "GEN_001",
        }
    }
}
