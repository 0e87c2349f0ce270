//! Common error types for facetag

use thiserror::Error;

/// Common result type for facetag operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across facetag crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted or transmitted JSON could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Face detection failed or produced nothing usable
    #[error(transparent)]
    Detection(#[from] DetectionError),

    /// Remote persistence endpoint failed
    #[error("Remote error: {0}")]
    Remote(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures of the detection pipeline
///
/// Every variant carries a message suitable for showing to the person who
/// started the detection; none of them are retried automatically.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectionError {
    /// No detection engine is configured or the model failed to load
    #[error("Face detection model unavailable: {0}")]
    ModelUnavailable(String),

    /// Nothing survived detection, retry and size filtering
    #[error("No faces detected, try manual tagging")]
    NoFacesFound,

    /// The image could not be decoded or has zero dimensions
    #[error("Image could not be used for detection: {0}")]
    InvalidImage(String),

    /// The detection attempt exceeded its time budget and was abandoned
    #[error("Face detection timed out after {0} seconds")]
    Timeout(u64),

    /// The engine itself reported a failure
    #[error("Face detection failed: {0}")]
    Engine(String),
}
