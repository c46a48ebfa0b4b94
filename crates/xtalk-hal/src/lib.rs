//! xtalk Hardware Abstraction Layer
//!
//! A narrow interface over quantum execution services. The benchmark
//! submits whole batches of circuits that are already placed on physical
//! qubits, so the HAL deals in [`PlacedCircuit`] slices and returns
//! order-preserving [`BatchResult`]s.
//!
//! - [`Backend`] trait for batched job submission and management
//! - [`Capabilities`] to describe qubit count, gate set, batch limits and timing
//! - [`Counts`], [`ExecutionResult`] and [`BatchResult`] for measurement data
//! - [`HalError::is_transient`] to decide whether a failure is worth retrying
//!
//! # Supported Backends
//!
//! | Backend | Crate | Authentication |
//! |---------|-------|----------------|
//! | IBM Quantum | `xtalk-adapter-ibm` | `IBM_API_KEY` + `IBM_SERVICE_CRN`, or `IBM_QUANTUM_TOKEN` |

pub mod backend;
pub mod capability;
pub mod error;
pub mod job;
pub mod result;

pub use backend::{
    Backend, BackendAvailability, BackendConfig, BackendFactory, PlacedCircuit, ValidationResult,
    validate_against,
};
pub use capability::{Capabilities, GateSet, IBM_HERON_BASIS};
pub use error::{HalError, HalResult};
pub use job::{JobId, JobStatus};
pub use result::{BatchResult, Counts, ExecutionResult};
