//! Error types for the IR crate.

use crate::qubit::{ClbitId, QubitId};
use thiserror::Error;

/// Errors that can occur while building, laying out or scheduling circuits.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Qubit not found in circuit.
    #[error("Qubit {qubit} not found in circuit{}", format_op_context(.op))]
    QubitNotFound {
        /// The qubit that was not found.
        qubit: QubitId,
        /// Operation that referenced it.
        op: Option<String>,
    },

    /// Classical bit not found in circuit.
    #[error("Classical bit {clbit} not found in circuit{}", format_op_context(.op))]
    ClbitNotFound {
        /// The classical bit that was not found.
        clbit: ClbitId,
        /// Operation that referenced it.
        op: Option<String>,
    },

    /// Gate requires a different number of qubits.
    #[error("Gate '{gate_name}' requires {expected} qubits, got {got}")]
    QubitCountMismatch {
        /// Name of the gate.
        gate_name: String,
        /// Expected number of qubits.
        expected: u32,
        /// Actual number of qubits provided.
        got: u32,
    },

    /// The same qubit appears twice in one operation.
    #[error("Duplicate qubit {qubit} in operation{}", format_op_context(.op))]
    DuplicateQubit {
        /// The duplicate qubit.
        qubit: QubitId,
        /// Operation that referenced it.
        op: Option<String>,
    },

    /// Measurement operands are unbalanced.
    #[error("Measurement has {qubits} qubits but {clbits} classical bits")]
    MeasureArity {
        /// Number of measured qubits.
        qubits: usize,
        /// Number of target classical bits.
        clbits: usize,
    },

    /// A physical qubit was assigned to two logical qubits.
    #[error("Physical qubit {physical} is assigned more than once")]
    DuplicatePhysicalQubit {
        /// The repeated physical index.
        physical: u32,
    },

    /// Layout does not cover the circuit.
    #[error("Layout maps {layout} qubits but circuit has {circuit}")]
    LayoutSizeMismatch {
        /// Size of the layout.
        layout: usize,
        /// Width of the circuit.
        circuit: usize,
    },

    /// A gate has no lowering onto the target basis.
    #[error("Gate '{gate}' cannot be expressed in basis {basis}")]
    UnsupportedGate {
        /// The offending gate.
        gate: String,
        /// The target basis.
        basis: String,
    },

    /// A requested interval cannot hold the operations placed inside it.
    #[error("Cannot fit {required} dt of operations into a {available} dt window")]
    WindowTooShort {
        /// Time the operations need.
        required: u64,
        /// Time available.
        available: u64,
    },
}

#[allow(clippy::ref_option)]
fn format_op_context(op: &Option<String>) -> String {
    match op {
        Some(name) => format!(" (op: {name})"),
        None => String::new(),
    }
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
