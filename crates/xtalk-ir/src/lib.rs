//! xtalk circuit representation
//!
//! The crosstalk benchmark only needs a narrow slice of a full circuit IR:
//! a handful of Clifford gates, barriers, explicit delays and measurements,
//! laid onto a fixed set of physical qubits. This crate provides exactly
//! that, plus a timing model used to reason about idle windows.
//!
//! # Core Components
//!
//! - **Qubits and Classical Bits**: [`QubitId`], [`ClbitId`]
//! - **Gates**: [`StandardGate`] for the gates the benchmark emits
//! - **Instructions**: [`Instruction`] combining an operation with its operands
//! - **Circuit**: [`Circuit`], an ordered instruction list with a fluent builder
//! - **Layout**: [`Layout`], logical → physical qubit assignment
//! - **Timing**: [`InstructionDurations`] and [`Schedule`] (ASAP, in units of `dt`)
//! - **Basis translation**: [`BasisTranslator`], lowering onto a device's native gates
//!
//! # Example
//!
//! ```rust
//! use xtalk_ir::{Circuit, InstructionDurations, QubitId};
//!
//! let mut circuit = Circuit::with_size("idle", 2, 2);
//! circuit.x(QubitId(0)).unwrap();
//! circuit.barrier_all().unwrap();
//! circuit.delay(QubitId(0), 800).unwrap();
//! circuit.delay(QubitId(1), 800).unwrap();
//! circuit.measure_all().unwrap();
//!
//! let durations = InstructionDurations::default();
//! let schedule = durations.schedule(&circuit);
//! assert!(schedule.total() >= 800);
//! ```

pub mod basis;
pub mod circuit;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod layout;
pub mod qubit;
pub mod timing;

pub use basis::{BasisTranslator, Entangler};
pub use circuit::Circuit;
pub use error::{IrError, IrResult};
pub use gate::{StandardGate, ZAngle};
pub use instruction::{Instruction, InstructionKind};
pub use layout::Layout;
pub use qubit::{ClbitId, QubitId};
pub use timing::{InstructionDurations, Schedule};
