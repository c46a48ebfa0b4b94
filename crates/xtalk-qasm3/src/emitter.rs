//! QASM3 emitter for serializing circuits.

use xtalk_ir::{Circuit, Instruction, InstructionKind, Layout, QubitId};

use crate::error::{EmitError, EmitResult};

/// Emit a circuit as QASM3 over a virtual qubit register.
pub fn emit(circuit: &Circuit) -> EmitResult<String> {
    let mut emitter = Emitter::new(Addressing::Virtual);
    emitter.emit_circuit(circuit)
}

/// Emit a circuit as QASM3 addressing physical qubits through `layout`.
pub fn emit_physical(circuit: &Circuit, layout: &Layout) -> EmitResult<String> {
    if layout.len() != circuit.num_qubits() {
        return Err(EmitError::LayoutWidth {
            circuit: circuit.name().to_string(),
            width: circuit.num_qubits(),
            layout: layout.len(),
        });
    }
    let mut emitter = Emitter::new(Addressing::Physical(layout));
    emitter.emit_circuit(circuit)
}

enum Addressing<'a> {
    Virtual,
    Physical(&'a Layout),
}

struct Emitter<'a> {
    output: String,
    addressing: Addressing<'a>,
}

impl<'a> Emitter<'a> {
    fn new(addressing: Addressing<'a>) -> Self {
        Self {
            output: String::new(),
            addressing,
        }
    }

    fn emit_circuit(&mut self, circuit: &Circuit) -> EmitResult<String> {
        self.writeln("OPENQASM 3.0;");
        self.writeln("include \"stdgates.inc\";");
        self.writeln("");

        let num_qubits = circuit.num_qubits();
        if num_qubits > 0 && matches!(self.addressing, Addressing::Virtual) {
            self.writeln(&format!("qubit[{num_qubits}] q;"));
        }

        let num_clbits = circuit.num_clbits();
        if num_clbits > 0 {
            self.writeln(&format!("bit[{num_clbits}] c;"));
        }

        if num_qubits > 0 || num_clbits > 0 {
            self.writeln("");
        }

        for instruction in circuit.instructions() {
            self.emit_instruction(instruction)?;
        }

        Ok(std::mem::take(&mut self.output))
    }

    fn emit_instruction(&mut self, instruction: &Instruction) -> EmitResult<()> {
        let qubits = self.emit_qubits(&instruction.qubits)?;
        match &instruction.kind {
            InstructionKind::Gate(gate) => {
                self.writeln(&format!("{gate} {};", qubits.join(", ")));
            }

            InstructionKind::Measure => {
                for (q, c) in qubits.iter().zip(&instruction.clbits) {
                    self.writeln(&format!("c[{}] = measure {q};", c.0));
                }
            }

            InstructionKind::Barrier => {
                if qubits.is_empty() {
                    self.writeln("barrier;");
                } else {
                    self.writeln(&format!("barrier {};", qubits.join(", ")));
                }
            }

            InstructionKind::Delay { duration } => {
                self.writeln(&format!("delay[{duration}dt] {};", qubits.join(", ")));
            }
        }

        Ok(())
    }

    fn emit_qubits(&self, qubits: &[QubitId]) -> EmitResult<Vec<String>> {
        qubits.iter().map(|&q| self.qubit_ref(q)).collect()
    }

    fn qubit_ref(&self, qubit: QubitId) -> EmitResult<String> {
        match self.addressing {
            Addressing::Virtual => Ok(format!("q[{}]", qubit.0)),
            Addressing::Physical(layout) => layout
                .get_physical(qubit)
                .map(|p| format!("${p}"))
                .ok_or(EmitError::Unmapped(qubit.0)),
        }
    }

    fn writeln(&mut self, line: &str) {
        self.output.push_str(line);
        self.output.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Circuit {
        let mut circuit = Circuit::with_size("sample", 2, 2);
        circuit.h(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.barrier_all().unwrap();
        circuit.delay(QubitId(1), 320).unwrap();
        circuit.measure_all().unwrap();
        circuit
    }

    #[test]
    fn test_emit_virtual() {
        let qasm = emit(&sample()).unwrap();
        assert!(qasm.starts_with("OPENQASM 3.0;\ninclude \"stdgates.inc\";\n"));
        assert!(qasm.contains("qubit[2] q;"));
        assert!(qasm.contains("bit[2] c;"));
        assert!(qasm.contains("h q[0];"));
        assert!(qasm.contains("cx q[0], q[1];"));
        assert!(qasm.contains("barrier q[0], q[1];"));
        assert!(qasm.contains("delay[320dt] q[1];"));
        assert!(qasm.contains("c[1] = measure q[1];"));
    }

    #[test]
    fn test_emit_physical() {
        let layout = Layout::from_physical([15, 22]).unwrap();
        let qasm = emit_physical(&sample(), &layout).unwrap();
        assert!(!qasm.contains("qubit["));
        assert!(qasm.contains("cx $15, $22;"));
        assert!(qasm.contains("delay[320dt] $22;"));
        assert!(qasm.contains("c[0] = measure $15;"));
    }

    #[test]
    fn test_emit_lowered_gates() {
        let lowered = xtalk_ir::BasisTranslator::new(["cz", "rz", "sx", "x"])
            .translate(&sample())
            .unwrap();
        let layout = Layout::from_physical([4, 5]).unwrap();
        let qasm = emit_physical(&lowered, &layout).unwrap();
        assert!(qasm.contains("rz(pi/2) $4;"));
        assert!(qasm.contains("sx $4;"));
        assert!(qasm.contains("cz $4, $5;"));
        assert!(!qasm.contains("h $4;"));
        assert!(!qasm.contains("cx "));
    }

    #[test]
    fn test_emit_physical_width_mismatch() {
        let layout = Layout::from_physical([1, 2, 3]).unwrap();
        let err = emit_physical(&sample(), &layout).unwrap_err();
        assert!(matches!(err, EmitError::LayoutWidth { width: 2, layout: 3, .. }));
    }
}
