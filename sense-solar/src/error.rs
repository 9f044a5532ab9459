//! Common error types for sense-solar.
//!
//! Driver-level failures live in [`crate::sensor::DriverError`]; this enum
//! covers everything around them (configuration and report encoding).

use thiserror::Error;

/// Main error type for sense-solar operations.
#[derive(Error, Debug)]
pub enum Error {
    /// JSON encoding or decoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience type alias for Results using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
