//! Error types for QASM emission.

use thiserror::Error;

/// Errors that can occur while emitting OpenQASM.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EmitError {
    /// The layout and the circuit disagree on width.
    #[error("Layout maps {layout} qubits but circuit '{circuit}' has {width}")]
    LayoutWidth {
        /// Circuit name.
        circuit: String,
        /// Circuit width.
        width: usize,
        /// Layout size.
        layout: usize,
    },

    /// A logical qubit has no physical assignment.
    #[error("Logical qubit {0} has no physical assignment")]
    Unmapped(u32),
}

/// Result type for emission.
pub type EmitResult<T> = Result<T, EmitError>;
