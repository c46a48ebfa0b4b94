//! Lowering of logical circuits onto a device's native gate set.
//!
//! Every rule is duration-preserving with respect to the logical timing
//! model: each logical single-qubit gate becomes exactly one physical pulse
//! (`x` or `sx`) dressed with frame changes, and a lowered `cx` occupies both
//! of its qubits for [`BasisTranslator::logical_durations`]' two-qubit length.
//! Delays computed against the logical model therefore still line up once
//! the circuit is lowered.
//!
//! Supported lowerings, in circuit order:
//!
//! | gate | lowered to |
//! |------|------------|
//! | `y`  | `rz(pi)`, `x` |
//! | `z`  | `rz(pi)` |
//! | `h`  | `rz(pi/2)`, `sx`, `rz(pi/2)` |
//! | `cx` via `ecr` | `x` on control and `sx` on target, `ecr`, `rz(pi/2)` on control |
//! | `cx` via `cz`  | barrier, `h` on target, `cz`, `h` on target, barrier |

use std::fmt;

use rustc_hash::FxHashSet;

use crate::circuit::Circuit;
use crate::error::{IrError, IrResult};
use crate::gate::{StandardGate, ZAngle};
use crate::instruction::{Instruction, InstructionKind};
use crate::qubit::QubitId;
use crate::timing::InstructionDurations;

/// Native entangling gate a `cx` is lowered onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entangler {
    /// `cx` is native.
    Cx,
    /// Echoed cross-resonance.
    Ecr,
    /// Controlled-Z.
    Cz,
}

impl Entangler {
    /// Single-qubit pulse layers a lowered `cx` adds around the native gate.
    fn dressing_layers(self) -> u64 {
        match self {
            Entangler::Cx => 0,
            Entangler::Ecr => 1,
            Entangler::Cz => 2,
        }
    }
}

/// Rewrites circuits so that every gate is in a device basis.
#[derive(Debug, Clone)]
pub struct BasisTranslator {
    basis: Vec<String>,
    native: FxHashSet<String>,
    entangler: Option<Entangler>,
}

impl BasisTranslator {
    /// Translator targeting the given native gate names.
    pub fn new<S: AsRef<str>>(basis: impl IntoIterator<Item = S>) -> Self {
        let basis: Vec<String> = basis.into_iter().map(|g| g.as_ref().to_string()).collect();
        let native: FxHashSet<String> = basis.iter().cloned().collect();

        let has = |g: &str| native.contains(g);
        let entangler = if has("cx") {
            Some(Entangler::Cx)
        } else if has("ecr") && has("x") && has("sx") && has("rz") {
            Some(Entangler::Ecr)
        } else if has("cz") && has("sx") && has("rz") {
            Some(Entangler::Cz)
        } else {
            None
        };

        Self {
            basis,
            native,
            entangler,
        }
    }

    /// Native gate names, in the order given.
    pub fn basis(&self) -> &[String] {
        &self.basis
    }

    /// Entangling gate used for `cx`, if any.
    pub fn entangler(&self) -> Option<Entangler> {
        self.entangler
    }

    /// Whether `name` is native.
    pub fn is_native(&self, name: &str) -> bool {
        self.native.contains(name)
    }

    /// Whether `gate` is native or can be lowered.
    pub fn supports(&self, gate: StandardGate) -> bool {
        if self.is_native(gate.name()) {
            return true;
        }
        let has = |g: &str| self.native.contains(g);
        match gate {
            StandardGate::Y => has("rz") && has("x"),
            StandardGate::Z => has("rz"),
            StandardGate::H => has("rz") && has("sx"),
            StandardGate::CX => self.entangler.is_some(),
            _ => false,
        }
    }

    /// Names of the logical gates this translator accepts.
    pub fn accepted(&self) -> Vec<String> {
        let mut names = self.basis.clone();
        for gate in [
            StandardGate::I,
            StandardGate::X,
            StandardGate::Y,
            StandardGate::Z,
            StandardGate::H,
            StandardGate::SX,
            StandardGate::CX,
        ] {
            if self.supports(gate) && !names.iter().any(|n| n == gate.name()) {
                names.push(gate.name().to_string());
            }
        }
        names
    }

    /// Logical gate durations once lowered, given the native pulse lengths.
    ///
    /// `native.single_qubit` is the `x`/`sx` length and `native.two_qubit`
    /// the entangler's. Only the two-qubit entry changes.
    pub fn logical_durations(&self, native: InstructionDurations) -> InstructionDurations {
        let layers = self.entangler.map_or(0, Entangler::dressing_layers);
        InstructionDurations {
            two_qubit: native.two_qubit + layers * native.single_qubit,
            ..native
        }
    }

    /// Lower every gate of `circuit` onto the basis.
    pub fn translate(&self, circuit: &Circuit) -> IrResult<Circuit> {
        let mut out = Circuit::with_size(
            circuit.name(),
            circuit.num_qubits() as u32,
            circuit.num_clbits() as u32,
        );
        for inst in circuit.instructions() {
            match &inst.kind {
                InstructionKind::Gate(gate) if !self.is_native(gate.name()) => {
                    for lowered in self.lower(*gate, &inst.qubits)? {
                        out.apply(lowered)?;
                    }
                }
                _ => {
                    out.apply(inst.clone())?;
                }
            }
        }
        Ok(out)
    }

    fn lower(&self, gate: StandardGate, qubits: &[QubitId]) -> IrResult<Vec<Instruction>> {
        if !self.supports(gate) {
            return Err(self.unsupported(gate));
        }
        let rz = |angle, q| Instruction::single_qubit_gate(StandardGate::RZ(angle), q);
        let one = |g, q| Instruction::single_qubit_gate(g, q);
        let h = |q| {
            [
                rz(ZAngle::HalfPi, q),
                one(StandardGate::SX, q),
                rz(ZAngle::HalfPi, q),
            ]
        };

        Ok(match (gate, qubits) {
            (StandardGate::Y, &[q]) => vec![rz(ZAngle::Pi, q), one(StandardGate::X, q)],
            (StandardGate::Z, &[q]) => vec![rz(ZAngle::Pi, q)],
            (StandardGate::H, &[q]) => h(q).to_vec(),
            (StandardGate::CX, &[c, t]) => match self.entangler {
                Some(Entangler::Ecr) => vec![
                    one(StandardGate::X, c),
                    one(StandardGate::SX, t),
                    Instruction::two_qubit_gate(StandardGate::ECR, c, t),
                    rz(ZAngle::HalfPi, c),
                ],
                Some(Entangler::Cz) => {
                    let mut seq = vec![Instruction::barrier([c, t])];
                    seq.extend(h(t));
                    seq.push(Instruction::two_qubit_gate(StandardGate::CZ, c, t));
                    seq.extend(h(t));
                    seq.push(Instruction::barrier([c, t]));
                    seq
                }
                Some(Entangler::Cx) | None => return Err(self.unsupported(gate)),
            },
            (gate, qubits) => {
                return Err(IrError::QubitCountMismatch {
                    gate_name: gate.name().to_string(),
                    expected: gate.num_qubits(),
                    got: qubits.len() as u32,
                });
            }
        })
    }

    fn unsupported(&self, gate: StandardGate) -> IrError {
        IrError::UnsupportedGate {
            gate: gate.to_string(),
            basis: self.to_string(),
        }
    }
}

impl fmt::Display for BasisTranslator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.basis.join(", "))
    }
}
