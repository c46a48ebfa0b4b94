//! Error types for the IBM Quantum adapter.

use thiserror::Error;
use xtalk_hal::HalError;

/// Result type for IBM operations.
pub type IbmResult<T> = Result<T, IbmError>;

/// Errors that can occur when talking to IBM Quantum.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IbmError {
    /// No credentials in the environment.
    #[error(
        "IBM Quantum credentials not found. Set IBM_API_KEY and IBM_SERVICE_CRN, or IBM_QUANTUM_TOKEN."
    )]
    MissingToken,

    /// Token cannot be used as a header value.
    #[error("Invalid IBM Quantum API token")]
    InvalidToken,

    /// IAM token exchange failed.
    #[error("IAM token exchange failed: {0}")]
    IamTokenExchange(String),

    /// API key given without a service CRN.
    #[error("IBM_SERVICE_CRN environment variable is required when using IBM_API_KEY")]
    MissingServiceCrn,

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API returned a non-success status.
    #[error("IBM Quantum API error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    ApiError {
        /// HTTP status code.
        status: Option<u16>,
        /// Error code from the API body.
        code: Option<String>,
        /// Error message.
        message: String,
    },

    /// Job not found.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Job failed.
    #[error("Job failed: {0}")]
    JobFailed(String),

    /// Job was cancelled.
    #[error("Job was cancelled: {0}")]
    JobCancelled(String),

    /// Circuit could not be emitted as OpenQASM.
    #[error("Circuit conversion error: {0}")]
    CircuitError(String),

    /// Backend offline or unknown.
    #[error("Backend not available: {0}")]
    BackendUnavailable(String),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Circuit addresses a qubit the device does not have.
    #[error("Circuit uses physical qubit {qubit} but backend only has {available}")]
    QubitOutOfRange {
        /// Highest physical qubit used.
        qubit: u32,
        /// Qubits available.
        available: usize,
    },

    /// Invalid parameter.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl From<IbmError> for HalError {
    fn from(e: IbmError) -> Self {
        match e {
            IbmError::MissingToken
            | IbmError::InvalidToken
            | IbmError::IamTokenExchange(_)
            | IbmError::MissingServiceCrn => HalError::AuthenticationFailed(e.to_string()),
            IbmError::HttpError(err) => HalError::Network(err),
            IbmError::ApiError {
                status: Some(429),
                message,
                ..
            } => HalError::RateLimited(message),
            IbmError::ApiError {
                status: Some(401 | 403),
                message,
                ..
            } => HalError::AuthenticationFailed(message),
            IbmError::ApiError {
                status: Some(500..=599),
                message,
                ..
            } => HalError::BackendUnavailable(message),
            IbmError::JobNotFound(id) => HalError::JobNotFound(id),
            IbmError::JobFailed(msg) => HalError::JobFailed(msg),
            IbmError::JobCancelled(_) => HalError::JobCancelled,
            IbmError::BackendUnavailable(msg) => HalError::BackendUnavailable(msg),
            IbmError::CircuitError(msg) => HalError::InvalidCircuit(msg),
            IbmError::QubitOutOfRange { .. } => HalError::CircuitTooLarge(e.to_string()),
            IbmError::JsonError(err) => HalError::Serialization(err),
            _ => HalError::Backend(e.to_string()),
        }
    }
}
