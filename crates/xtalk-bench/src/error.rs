//! Error types for the benchmark pipeline.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use xtalk_hal::HalError;
use xtalk_ir::IrError;

/// Problems with the experiment configuration file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// No configuration existed; a template was written in its place.
    #[error(
        "No configuration found; wrote a template to {} - fill in every field and run again",
        .path.display()
    )]
    TemplateWritten {
        /// Where the template was written.
        path: PathBuf,
    },

    /// The file is not valid JSON.
    #[error("Malformed configuration JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The document is not a JSON object.
    #[error("Configuration must be a JSON object")]
    NotAnObject,

    /// A required key is absent or null.
    #[error("Missing value for '{0}'")]
    MissingField(&'static str),

    /// A key holds a value outside its domain.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidField {
        /// Offending key.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// Reading or writing the configuration failed.
    #[error("Configuration I/O error on {}: {source}", .path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Failures while running a batch on a backend.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExecutionError {
    /// The backend kept failing.
    #[error("Backend failed after {attempts} attempt(s): {source}")]
    Backend {
        /// Attempts made.
        attempts: u32,
        /// Last error.
        #[source]
        source: HalError,
    },

    /// A circuit does not fit the backend.
    #[error("Circuit {index} ('{name}') rejected by backend: {}", .reasons.join("; "))]
    InvalidCircuit {
        /// Position in the batch.
        index: usize,
        /// Circuit name.
        name: String,
        /// Validation messages.
        reasons: Vec<String>,
    },

    /// Shot count outside backend limits.
    #[error("Invalid shot count {shots} (backend allows 1..={max})")]
    InvalidShots {
        /// Requested shots.
        shots: u32,
        /// Backend maximum.
        max: u32,
    },

    /// The backend returned a different number of results than circuits sent.
    #[error("Backend returned {returned} results for {submitted} circuits")]
    ResultMismatch {
        /// Circuits submitted.
        submitted: usize,
        /// Results received.
        returned: usize,
    },

    /// The run exceeded its deadline.
    #[error("Run aborted after {0:?} timeout")]
    Timeout(Duration),
}

/// Top-level error for an experiment run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExperimentError {
    /// Configuration is missing or invalid.
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// A layout does not match the experiment shape.
    #[error("Layout invariant violated: {0}")]
    LayoutInvariant(String),

    /// A circuit could not be constructed.
    #[error("Circuit construction failed: {0}")]
    Circuit(#[from] IrError),

    /// The backend run failed.
    #[error(transparent)]
    BackendExecution(#[from] ExecutionError),

    /// An operation was called out of order.
    #[error("Usage error: {0}")]
    UsageOrder(String),

    /// Persisting results failed.
    #[error("Result sink I/O error on {}: {source}", .path.display())]
    Sink {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
}

impl ExperimentError {
    pub(crate) fn usage(msg: impl Into<String>) -> Self {
        Self::UsageOrder(msg.into())
    }
}

/// Result type for benchmark operations.
pub type ExperimentResult<T> = Result<T, ExperimentError>;
