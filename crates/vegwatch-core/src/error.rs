//! Error types for VegWatch

use thiserror::Error;

/// Rejected client input, detected before any backend call is made
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid polygon: at least 3 points required, found {found}")]
    TooFewPoints { found: usize },

    #[error("Invalid polygon: point {index} {reason}")]
    InvalidCoordinate { index: usize, reason: String },

    #[error("Invalid polygon: ring is degenerate (zero area)")]
    DegenerateRing,

    #[error("Missing required date parameter: {field}")]
    MissingDate { field: &'static str },

    #[error("Invalid date format for {field}: '{value}'")]
    InvalidDate { field: &'static str, value: String },

    #[error("Invalid date range: {start_field} ({start}) is after {end_field} ({end})")]
    ReversedWindow {
        start_field: &'static str,
        end_field: &'static str,
        start: String,
        end: String,
    },

    #[error("Invalid request body: {0}")]
    MalformedBody(String),
}

#[derive(Debug, Error)]
pub enum VegwatchError {
    // Input errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // Data availability errors
    #[error(
        "Not enough cloud-free images available for analysis. \
         Period 1: {period1} images, Period 2: {period2} images"
    )]
    InsufficientData { period1: usize, period2: usize },

    #[error("No valid pixels inside the polygon for the selected periods")]
    NoValidPixels,

    // Backend errors
    #[error("Imagery backend error during {operation}: {reason}")]
    Backend { operation: String, reason: String },

    #[error("Imagery backend timed out during {operation} after {timeout_secs}s")]
    BackendTimeout {
        operation: String,
        timeout_secs: u64,
    },

    #[error("Imagery backend unavailable: {reason}")]
    BackendUnavailable { reason: String },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl VegwatchError {
    /// Build a backend error for the named operation
    pub fn backend(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Backend {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error was caused by client input or missing source data,
    /// as opposed to a failure of the system itself
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::InsufficientData { .. } | Self::NoValidPixels
        )
    }
}

pub type Result<T> = std::result::Result<T, VegwatchError>;
