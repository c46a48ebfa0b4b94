//! Gate set used by the benchmark circuits.
//!
//! The logical gates (`x`, `y`, `h`, `cx`, ...) are what circuits are built
//! from. `rz`, `cz` and `ecr` only appear after a circuit has been lowered
//! onto a device basis (see [`crate::basis`]).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard gates with known semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StandardGate {
    /// Identity gate.
    I,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,
    /// Hadamard gate.
    H,
    /// sqrt(X) gate.
    SX,
    /// Controlled-X (CNOT) gate.
    CX,
    /// Rotation about Z by a multiple of pi/2. Implemented as a frame change.
    RZ(ZAngle),
    /// Controlled-Z gate.
    CZ,
    /// Echoed cross-resonance gate.
    ECR,
}

/// Angles a lowered `rz` can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZAngle {
    /// pi/2
    HalfPi,
    /// pi
    Pi,
    /// -pi/2
    MinusHalfPi,
}

impl ZAngle {
    /// OpenQASM expression for the angle.
    pub fn qasm(&self) -> &'static str {
        match self {
            ZAngle::HalfPi => "pi/2",
            ZAngle::Pi => "pi",
            ZAngle::MinusHalfPi => "-pi/2",
        }
    }

    /// Angle in radians.
    pub fn radians(&self) -> f64 {
        match self {
            ZAngle::HalfPi => std::f64::consts::FRAC_PI_2,
            ZAngle::Pi => std::f64::consts::PI,
            ZAngle::MinusHalfPi => -std::f64::consts::FRAC_PI_2,
        }
    }
}

impl StandardGate {
    /// OpenQASM name of the gate.
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::I => "id",
            StandardGate::X => "x",
            StandardGate::Y => "y",
            StandardGate::Z => "z",
            StandardGate::H => "h",
            StandardGate::SX => "sx",
            StandardGate::CX => "cx",
            StandardGate::RZ(_) => "rz",
            StandardGate::CZ => "cz",
            StandardGate::ECR => "ecr",
        }
    }

    /// Angle parameter, for the one parameterized gate.
    pub fn angle(&self) -> Option<ZAngle> {
        match self {
            StandardGate::RZ(angle) => Some(*angle),
            _ => None,
        }
    }

    /// Number of qubits the gate acts on.
    pub fn num_qubits(&self) -> u32 {
        match self {
            StandardGate::CX | StandardGate::CZ | StandardGate::ECR => 2,
            _ => 1,
        }
    }

    /// Whether the gate is a Pauli (usable as a decoupling pulse).
    pub fn is_pauli(&self) -> bool {
        matches!(
            self,
            StandardGate::I | StandardGate::X | StandardGate::Y | StandardGate::Z
        )
    }

    /// Whether the gate takes no time on hardware.
    pub fn is_virtual(&self) -> bool {
        matches!(self, StandardGate::RZ(_))
    }
}

impl fmt::Display for StandardGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.angle() {
            Some(angle) => write!(f, "{}({})", self.name(), angle.qasm()),
            None => f.write_str(self.name()),
        }
    }
}
