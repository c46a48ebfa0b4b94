//! Crosstalk and dynamical-decoupling benchmark.
//!
//! A three-qubit data register is held idle next to attacker pairs that
//! drive CX gates. Six scenario families measure how much of the prepared
//! state survives, with and without decoupling pulses and physical spacing:
//!
//! | Kind | Attack | DD | Buffer | Circuits |
//! |------|--------|----|--------|----------|
//! | `no_attack` | | | | 1 |
//! | `no_attack_with_dd` | | ✓ | | 1 |
//! | `attack_no_mitigation` | ✓ | | | 45 |
//! | `attack_with_dd` | ✓ | ✓ | | 45 |
//! | `attack_with_spacing` | ✓ | | ✓ | 45 |
//! | `attack_with_dd_and_spacing` | ✓ | ✓ | ✓ | 45 |
//!
//! The pipeline is [`ExperimentConfig`] → [`ResolvedLayouts`] →
//! [`ScenarioBuilder`] → [`CircuitBatch`] → [`ExecutionEngine`] →
//! [`RawResult`] → [`FidelityEvaluator`] → [`FidelityVector`], driven by a
//! [`Session`] and optionally persisted through a [`JsonlSink`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use xtalk_bench::{ExecutionEngine, ExperimentConfig, Session};
//!
//! let config = ExperimentConfig::load_or_bootstrap("config.json".as_ref())?;
//! let mut session = Session::new(config)?;
//! session.enable_all()?;
//! session.run(&ExecutionEngine::new(Arc::new(backend))).await?;
//! let fidelities = session.calculate_fidelity_of_data_qubits()?;
//! ```

pub mod builder;
pub mod config;
pub mod dd;
pub mod error;
pub mod executor;
pub mod fidelity;
pub mod layout;
pub mod scenario;
pub mod session;
pub mod sink;

pub use builder::{CircuitBatch, CircuitDescriptor, ScenarioBlock, ScenarioBuilder};
pub use config::{DATA_QUBITS, DdSequence, ExperimentConfig, InitialState};
pub use error::{ConfigError, ExecutionError, ExperimentError, ExperimentResult};
pub use executor::{ExecutionEngine, ExecutionOptions, RawResult, RetryPolicy};
pub use fidelity::{FidelityEvaluator, FidelityVector, hellinger_fidelity};
pub use layout::{AttackGroup, QubitRoles, ResolvedLayouts};
pub use scenario::{SWEEP_LENGTH, ScenarioKind, SweepParameter};
pub use session::{ScenarioSelection, Session};
pub use sink::JsonlSink;
