//! Backend trait and configuration.
//!
//! The [`Backend`] trait defines the lifecycle of a batched job:
//!
//! ```text
//!   capabilities() ──→ validate() ──→ submit() ──→ status() ──→ result()
//!    (sync, &ref)       (async)       (async)      (async)      (async)
//! ```
//!
//! A job always carries a whole batch of circuits, each already placed on
//! physical qubits. Results come back in submission order.
//!
//! | Method | Kind | Required | Returns |
//! |--------|------|----------|---------|
//! | `name()` | sync | yes | `&str` |
//! | `capabilities()` | sync | yes | `&Capabilities` |
//! | `availability()` | async | yes | `HalResult<BackendAvailability>` |
//! | `validate()` | async | provided | `HalResult<ValidationResult>` |
//! | `submit()` | async | yes | `HalResult<JobId>` |
//! | `status()` | async | yes | `HalResult<JobStatus>` |
//! | `result()` | async | yes | `HalResult<BatchResult>` |
//! | `cancel()` | async | yes | `HalResult<()>` |
//! | `wait()` | async | provided | `HalResult<BatchResult>` |

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use xtalk_ir::{Circuit, Layout};

use crate::capability::Capabilities;
use crate::error::{HalError, HalResult};
use crate::job::{JobId, JobStatus};
use crate::result::BatchResult;

/// Configuration for a backend instance.
#[derive(Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Name of the backend.
    pub name: String,
    /// API endpoint URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Authentication token.
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// Additional configuration.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl BackendConfig {
    /// Create a new backend configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: None,
            token: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Set the endpoint URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the authentication token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Add extra configuration.
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("token", &"[REDACTED]")
            .field("extra", &self.extra)
            .finish()
    }
}

/// A circuit together with the physical qubits it must run on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedCircuit {
    /// The logical circuit.
    pub circuit: Circuit,
    /// Logical → physical assignment, one entry per circuit qubit.
    pub layout: Layout,
}

impl PlacedCircuit {
    /// Pair a circuit with its layout.
    pub fn new(circuit: Circuit, layout: Layout) -> Self {
        Self { circuit, layout }
    }
}

/// Trait for quantum backends executing batches of placed circuits.
///
/// - `capabilities()` is synchronous and infallible; implementations cache
///   it at construction time.
/// - `submit()` returns a job whose initial status is `Queued`.
/// - `result()` is only valid once `status()` reports `Completed`, and holds
///   exactly one entry per submitted circuit in submission order.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Get the name of this backend.
    fn name(&self) -> &str;

    /// Get the capabilities of this backend.
    fn capabilities(&self) -> &Capabilities;

    /// Check backend availability.
    async fn availability(&self) -> HalResult<BackendAvailability>;

    /// Validate a placed circuit against backend constraints.
    async fn validate(&self, placed: &PlacedCircuit) -> HalResult<ValidationResult> {
        Ok(validate_against(self.capabilities(), placed))
    }

    /// Submit a batch for execution as a single job.
    async fn submit(&self, batch: &[PlacedCircuit], shots: u32) -> HalResult<JobId>;

    /// Get the status of a job.
    async fn status(&self, job_id: &JobId) -> HalResult<JobStatus>;

    /// Get the results of a completed job.
    async fn result(&self, job_id: &JobId) -> HalResult<BatchResult>;

    /// Cancel a running job.
    async fn cancel(&self, job_id: &JobId) -> HalResult<()>;

    /// Interval between status polls in [`Backend::wait`].
    fn poll_interval(&self) -> Duration {
        Duration::from_millis(500)
    }

    /// Wait for a job to reach a terminal state and return its results.
    ///
    /// Polls until the job finishes; callers bound the wait with
    /// `tokio::time::timeout`.
    async fn wait(&self, job_id: &JobId) -> HalResult<BatchResult> {
        let poll_interval = self.poll_interval();
        loop {
            match self.status(job_id).await? {
                JobStatus::Completed => return self.result(job_id).await,
                JobStatus::Failed(msg) => return Err(HalError::JobFailed(msg)),
                JobStatus::Cancelled => return Err(HalError::JobCancelled),
                status @ (JobStatus::Queued | JobStatus::Running) => {
                    debug!(job_id = %job_id, %status, "Job pending");
                    tokio::time::sleep(poll_interval).await;
                }
            }
        }
    }
}

/// Check a placed circuit against `caps`.
pub fn validate_against(caps: &Capabilities, placed: &PlacedCircuit) -> ValidationResult {
    let mut reasons = Vec::new();
    let circuit = &placed.circuit;

    if placed.layout.len() != circuit.num_qubits() {
        reasons.push(format!(
            "layout maps {} qubits but circuit '{}' has {}",
            placed.layout.len(),
            circuit.name(),
            circuit.num_qubits()
        ));
    }

    if let Some(max) = placed.layout.max_physical() {
        if max >= caps.num_qubits {
            reasons.push(format!(
                "physical qubit {max} out of range for {} ({} qubits)",
                caps.name, caps.num_qubits
            ));
        }
    }

    let mut unsupported: Vec<&str> = circuit
        .instructions()
        .iter()
        .filter_map(|inst| inst.as_gate())
        .map(|gate| gate.name())
        .filter(|name| !caps.gate_set.contains(name))
        .collect();
    unsupported.sort_unstable();
    unsupported.dedup();
    for name in unsupported {
        reasons.push(format!("gate '{name}' not supported by {}", caps.name));
    }

    if reasons.is_empty() {
        ValidationResult::Valid
    } else {
        ValidationResult::Invalid { reasons }
    }
}

/// Backend availability information.
#[derive(Debug, Clone)]
pub struct BackendAvailability {
    /// Whether the backend is currently accepting jobs.
    pub is_available: bool,
    /// Number of jobs currently in queue (if known).
    pub queue_depth: Option<u32>,
    /// Human-readable status message.
    pub status_message: Option<String>,
}

impl BackendAvailability {
    /// Availability for a backend that is always up.
    pub fn always_available() -> Self {
        Self {
            is_available: true,
            queue_depth: Some(0),
            status_message: None,
        }
    }

    /// Availability for an offline backend.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            is_available: false,
            queue_depth: None,
            status_message: Some(reason.into()),
        }
    }
}

/// Result of circuit validation against backend constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Circuit can be submitted as-is.
    Valid,
    /// Circuit cannot run on this backend.
    Invalid {
        /// Reasons the circuit is invalid.
        reasons: Vec<String>,
    },
}

impl ValidationResult {
    /// Check if the circuit is valid.
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}

/// Trait for creating backends from configuration.
pub trait BackendFactory: Backend + Sized {
    /// Create a backend from configuration.
    fn from_config(config: BackendConfig) -> HalResult<Self>;
}
