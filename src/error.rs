//! Error types for hypostat

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HypoError {
    #[error("Invalid thresholds: expected very_low < low < high < very_high, got {very_low} / {low} / {high} / {very_high}")]
    InvalidThresholds {
        very_low: f64,
        low: f64,
        high: f64,
        very_high: f64,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid timestamp: {0}")]
    Timestamp(String),

    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),
}
