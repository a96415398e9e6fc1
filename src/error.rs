//! # Error Types
//!
//! Custom error types for Powerlog using `thiserror`.

use thiserror::Error;

/// Main error type for Powerlog
#[derive(Debug, Error)]
pub enum PowerlogError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read/write errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Current acquisition errors
    #[error("Acquisition error: {0}")]
    Acquisition(String),

    /// Archive upload errors
    #[error("Archive error: {0}")]
    Archive(String),

    /// Time-series sink errors
    #[error("Time-series sink error: {0}")]
    Sink(String),
}

/// Result type alias for Powerlog
pub type Result<T> = std::result::Result<T, PowerlogError>;
