//! Logical → physical qubit assignment.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::qubit::QubitId;

/// A mapping from logical qubits to physical qubits.
///
/// Logical qubit `i` maps to `physical[i]`. Physical indices are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct Layout {
    physical: Vec<u32>,
    #[serde(skip)]
    physical_to_logical: FxHashMap<u32, QubitId>,
}

impl Layout {
    /// Create an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a layout from an ordered list of physical qubits.
    pub fn from_physical(physical: impl IntoIterator<Item = u32>) -> IrResult<Self> {
        let mut layout = Self::new();
        for p in physical {
            layout.push(p)?;
        }
        Ok(layout)
    }

    /// Create a trivial layout (logical qubit i -> physical qubit i).
    pub fn trivial(num_qubits: u32) -> Self {
        Self {
            physical: (0..num_qubits).collect(),
            physical_to_logical: (0..num_qubits).map(|i| (i, QubitId(i))).collect(),
        }
    }

    /// Map the next logical qubit onto `physical`.
    pub fn push(&mut self, physical: u32) -> IrResult<QubitId> {
        if self.physical_to_logical.contains_key(&physical) {
            return Err(IrError::DuplicatePhysicalQubit { physical });
        }
        let logical = QubitId(self.physical.len() as u32);
        self.physical.push(physical);
        self.physical_to_logical.insert(physical, logical);
        Ok(logical)
    }

    /// Get the physical qubit for a logical qubit.
    pub fn get_physical(&self, logical: QubitId) -> Option<u32> {
        self.physical.get(logical.index()).copied()
    }

    /// Get the logical qubit for a physical qubit.
    pub fn get_logical(&self, physical: u32) -> Option<QubitId> {
        self.physical_to_logical.get(&physical).copied()
    }

    /// Physical qubits in logical order.
    pub fn physical_qubits(&self) -> &[u32] {
        &self.physical
    }

    /// Largest physical index in use.
    pub fn max_physical(&self) -> Option<u32> {
        self.physical.iter().copied().max()
    }

    /// Get the number of mapped qubits.
    pub fn len(&self) -> usize {
        self.physical.len()
    }

    /// Check if the layout is empty.
    pub fn is_empty(&self) -> bool {
        self.physical.is_empty()
    }

    /// Iterate over (logical, physical) pairs in logical order.
    pub fn iter(&self) -> impl Iterator<Item = (QubitId, u32)> + '_ {
        self.physical
            .iter()
            .enumerate()
            .map(|(i, &p)| (QubitId(i as u32), p))
    }

    /// Check that the layout covers exactly `num_qubits` logical qubits.
    pub fn check_width(&self, num_qubits: usize) -> IrResult<()> {
        if self.len() != num_qubits {
            return Err(IrError::LayoutSizeMismatch {
                layout: self.len(),
                circuit: num_qubits,
            });
        }
        Ok(())
    }
}

impl TryFrom<Vec<u32>> for Layout {
    type Error = IrError;

    fn try_from(physical: Vec<u32>) -> IrResult<Self> {
        Self::from_physical(physical)
    }
}

impl From<Layout> for Vec<u32> {
    fn from(layout: Layout) -> Self {
        layout.physical
    }
}
