// src/core/errors.rs
use thiserror::Error;

/// Coarse classification of [`ExplainError`] for the boundary layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotReady,
    SchemaMismatch,
    InvalidInput,
    AttributionFailure,
    Initialization,
    Timeout,
    Prediction,
    Config,
    Worker,
    Serialization,
}

#[derive(Debug, Error)]
pub enum ExplainError {
    /// Model or preprocessor artifacts are absent. Retry later.
    #[error("model not ready: {reason}")]
    NotReady { reason: String },

    /// Two components disagree on the encoded dimensionality.
    #[error("schema mismatch in {component}: expected {expected} encoded features, got {actual}")]
    SchemaMismatch {
        component: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid input for field '{field}': {reason}")]
    InvalidInput { field: String, reason: String },

    #[error(
        "attribution failed: {reason} (query length {query_len}, background {background_rows}x{background_cols})"
    )]
    AttributionFailure {
        reason: String,
        query_len: usize,
        background_rows: usize,
        background_cols: usize,
    },

    /// The background set could not be built. Not retried per request.
    #[error("initialization failed: {reason}")]
    Initialization { reason: String },

    #[error("explanation timed out after {waited_ms} ms")]
    Timeout { waited_ms: u64 },

    #[error("model prediction failed: {reason}")]
    Prediction { reason: String },

    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    /// The explanation worker thread could not run to completion.
    #[error("explanation worker failed: {reason}")]
    Worker { reason: String },

    #[error("failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("ndarray shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

impl ExplainError {
    #[must_use]
    pub fn not_ready(reason: impl Into<String>) -> Self {
        Self::NotReady {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn prediction(reason: impl Into<String>) -> Self {
        Self::Prediction {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotReady { .. } => ErrorKind::NotReady,
            Self::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::AttributionFailure { .. } | Self::Shape(_) => ErrorKind::AttributionFailure,
            Self::Initialization { .. } => ErrorKind::Initialization,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Prediction { .. } => ErrorKind::Prediction,
            Self::Config { .. } => ErrorKind::Config,
            Self::Worker { .. } => ErrorKind::Worker,
            Self::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NotReady { .. } | Self::Timeout { .. })
    }
}

// Convenience type alias for Result
pub type Result<T> = std::result::Result<T, ExplainError>;
