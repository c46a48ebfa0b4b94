//! Backend capability introspection.
//!
//! Describes what a backend accepts: qubit count, gates, shot and batch
//! limits, and the timing model needed to lay out idle windows.

use serde::{Deserialize, Serialize};
use xtalk_ir::{BasisTranslator, InstructionDurations};

/// Native gates of IBM Heron devices.
pub const IBM_HERON_BASIS: [&str; 5] = ["cz", "id", "rz", "sx", "x"];

/// Hardware capabilities of a quantum backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capabilities {
    /// Name of the backend.
    pub name: String,
    /// Number of physical qubits.
    pub num_qubits: u32,
    /// Gates accepted in submitted circuits (OpenQASM 3 naming).
    pub gate_set: GateSet,
    /// Maximum number of shots per circuit.
    pub max_shots: u32,
    /// Maximum circuits in a single job. `None` means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_circuits_per_job: Option<usize>,
    /// Whether this is a simulator.
    pub is_simulator: bool,
    /// Gate and measurement durations.
    pub durations: InstructionDurations,
}

impl Capabilities {
    /// Create capabilities for an IBM device, assuming the Heron basis
    /// until the real one is known.
    pub fn ibm(name: impl Into<String>, num_qubits: u32) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            gate_set: GateSet::ibm(),
            max_shots: 100_000,
            max_circuits_per_job: Some(300),
            is_simulator: false,
            durations: BasisTranslator::new(IBM_HERON_BASIS)
                .logical_durations(InstructionDurations::default()),
        }
    }

    /// Create capabilities for an ideal test device.
    pub fn ideal(name: impl Into<String>, num_qubits: u32) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            gate_set: GateSet::universal(),
            max_shots: u32::MAX,
            max_circuits_per_job: None,
            is_simulator: true,
            durations: InstructionDurations::default(),
        }
    }

    /// Set the batch limit.
    pub fn with_max_circuits_per_job(mut self, limit: usize) -> Self {
        self.max_circuits_per_job = Some(limit);
        self
    }

    /// Target a native basis.
    ///
    /// `native` holds the pulse lengths of the basis gates. The stored
    /// durations are those of the logical gates once lowered onto it.
    pub fn with_basis<S: AsRef<str>>(
        mut self,
        basis: impl IntoIterator<Item = S>,
        native: InstructionDurations,
    ) -> Self {
        let translator = BasisTranslator::new(basis);
        self.gate_set = GateSet::from_translator(&translator);
        self.durations = translator.logical_durations(native);
        self
    }

    /// Set the timing model.
    pub fn with_durations(mut self, durations: InstructionDurations) -> Self {
        self.durations = durations;
        self
    }
}

/// Set of supported gates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateSet {
    /// Single-qubit gates supported.
    pub single_qubit: Vec<String>,
    /// Two-qubit gates supported.
    pub two_qubit: Vec<String>,
    /// Native gates (execute without decomposition).
    pub native: Vec<String>,
}

impl GateSet {
    /// IBM Heron gate set: the native basis plus every gate that lowers onto it.
    pub fn ibm() -> Self {
        Self::from_basis(IBM_HERON_BASIS)
    }

    /// Gate set of a device with the given native gates.
    pub fn from_basis<S: AsRef<str>>(basis: impl IntoIterator<Item = S>) -> Self {
        Self::from_translator(&BasisTranslator::new(basis))
    }

    /// Gates accepted by `translator`, split by arity.
    pub fn from_translator(translator: &BasisTranslator) -> Self {
        let (two_qubit, single_qubit) = translator
            .accepted()
            .into_iter()
            .partition(|name| is_two_qubit_name(name));
        Self {
            single_qubit,
            two_qubit,
            native: translator.basis().to_vec(),
        }
    }

    /// Translator lowering onto the native gates.
    pub fn translator(&self) -> BasisTranslator {
        BasisTranslator::new(&self.native)
    }

    /// Every gate the benchmark emits, all native.
    pub fn universal() -> Self {
        let single: Vec<String> = ["id", "x", "y", "z", "h", "sx"].map(String::from).to_vec();
        let two = vec!["cx".to_string()];
        let native = single.iter().chain(&two).cloned().collect();
        Self {
            single_qubit: single,
            two_qubit: two,
            native,
        }
    }

    /// Check whether a gate is accepted.
    pub fn contains(&self, gate: &str) -> bool {
        self.single_qubit.iter().any(|g| g == gate) || self.two_qubit.iter().any(|g| g == gate)
    }

    /// Check whether a gate runs without decomposition.
    pub fn is_native(&self, gate: &str) -> bool {
        self.native.iter().any(|g| g == gate)
    }
}

fn is_two_qubit_name(name: &str) -> bool {
    matches!(
        name,
        "cx" | "cy" | "cz" | "ch" | "cp" | "crz" | "ecr" | "rzz" | "rxx" | "ryy" | "swap" | "iswap"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ibm_capabilities() {
        let caps = Capabilities::ibm("ibm_fez", 156);
        assert_eq!(caps.num_qubits, 156);
        assert!(caps.gate_set.contains("cx"));
        assert!(caps.gate_set.contains("y"));
        assert!(!caps.gate_set.is_native("h"));
        assert!(!caps.gate_set.is_native("cx"));
        assert!(caps.gate_set.is_native("cz"));
        assert_eq!(caps.max_circuits_per_job, Some(300));

        // cx lowers to h·cz·h on the target
        let native = InstructionDurations::default();
        assert_eq!(
            caps.durations.two_qubit,
            native.two_qubit + 2 * native.single_qubit
        );
        assert_eq!(caps.durations.single_qubit, native.single_qubit);
    }

    #[test]
    fn test_gate_set_from_basis() {
        let gates = GateSet::from_basis(["cz", "id", "rx", "rz", "rzz", "sx", "x"]);
        assert!(gates.two_qubit.iter().any(|g| g == "rzz"));
        assert!(gates.single_qubit.iter().any(|g| g == "rx"));
        for g in ["h", "y", "cx"] {
            assert!(gates.contains(g));
            assert!(!gates.is_native(g));
        }

        // without rz, neither h nor y can be lowered
        let gates = GateSet::from_basis(["ecr", "sx", "x"]);
        assert!(!gates.contains("h"));
        assert!(!gates.contains("y"));
        assert!(!gates.contains("cx"));
        assert!(gates.contains("ecr"));
    }

    #[test]
    fn test_with_basis_durations() {
        let native = InstructionDurations {
            dt_ns: 0.5,
            ..Default::default()
        };
        let caps = Capabilities::ideal("dev", 5).with_basis(["ecr", "rz", "sx", "x"], native);
        assert_eq!(caps.durations.dt_ns, 0.5);
        assert_eq!(
            caps.durations.two_qubit,
            native.two_qubit + native.single_qubit
        );
        assert_eq!(caps.gate_set.translator().basis(), caps.gate_set.native.as_slice());
    }

    #[test]
    fn test_universal_gate_set() {
        let gates = GateSet::universal();
        for g in ["x", "y", "h", "cx"] {
            assert!(gates.contains(g));
            assert!(gates.is_native(g));
        }
        assert!(!gates.contains("ecr"));
    }
}
