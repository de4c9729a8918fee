//! Error types for the f29-core library.

use thiserror::Error;

use crate::models::f29::{ExtractionMethod, F29Code};

/// Main error type for the f29 library.
#[derive(Error, Debug)]
pub enum F29Error {
    /// Form extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// JSON (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to F29 field extraction.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// Every strategy came back empty; there is nothing to build a result from.
    #[error("no strategy succeeded ({strategies} tried): no F29 code or identity field was recognised")]
    NoSignal { strategies: usize },

    /// A single strategy failed. Never returned from a full parse.
    #[error("strategy {strategy} failed: {reason}")]
    Strategy {
        strategy: ExtractionMethod,
        reason: String,
    },

    /// A fingerprint entry cannot be matched against bytes.
    #[error("invalid fingerprint for code {code}: {value}")]
    InvalidFingerprint { code: F29Code, value: u64 },
}

/// Result type for the f29 library.
pub type Result<T> = std::result::Result<T, F29Error>;
