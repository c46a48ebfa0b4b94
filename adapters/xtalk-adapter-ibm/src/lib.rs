//! IBM Quantum backend for xtalk.
//!
//! Submits whole circuit batches to the Qiskit Runtime Sampler. Circuits are
//! emitted as OpenQASM 3 on physical qubits (`$n`) with explicit `delay`s,
//! and the runtime is asked not to add its own decoupling, so the idle
//! windows reach the hardware unchanged.
//!
//! # Authentication
//!
//! | Variables | API |
//! |-----------|-----|
//! | `IBM_API_KEY` + `IBM_SERVICE_CRN` | IBM Cloud (`quantum.cloud.ibm.com`), Sampler V2 |
//! | `IBM_QUANTUM_TOKEN` | legacy (`api.quantum-computing.ibm.com`), Sampler V1 |
//!
//! ```ignore
//! use xtalk_adapter_ibm::IbmBackend;
//!
//! let backend = IbmBackend::connect("ibm_torino").await?;
//! ```

pub mod api;
pub mod backend;
pub mod error;

pub use api::{DEFAULT_ENDPOINT, IbmClient, LEGACY_ENDPOINT};
pub use backend::{DEFAULT_BACKEND, IbmBackend};
pub use error::{IbmError, IbmResult};
