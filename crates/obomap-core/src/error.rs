//! Error types for obomap.
//!
//! Only initialization failures and malformed inputs are errors. A concept
//! that maps to nothing is a normal outcome and never surfaces here.

use thiserror::Error;

/// Result type alias using obomap's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for obomap operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A clinical record or ontology class is missing a required field
    #[error("Input shape error: {0}")]
    InputShape(String),

    /// Similarity threshold, top-N, or another matcher bound is out of range
    #[error("Threshold configuration error: {0}")]
    ThresholdConfig(String),

    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// An ontology index has no usable classes
    #[error("Empty ontology index: {0}")]
    EmptyIndex(String),

    /// Invalid input (malformed table row, unknown domain, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl Error {
    /// Whether the error only invalidates a single record.
    ///
    /// Record-level errors are isolated and reported as diagnostics; all
    /// other errors abort initialization.
    pub fn is_record_level(&self) -> bool {
        matches!(self, Error::InputShape(_))
    }
}
