//! Reduction of raw counts to per-circuit fidelities.

use std::ops::{Index, Range};

use serde::{Deserialize, Serialize};
use xtalk_hal::Counts;

use crate::builder::ScenarioBlock;
use crate::config::{DATA_QUBITS, InitialState};
use crate::executor::RawResult;
use crate::scenario::ScenarioKind;

/// Hellinger fidelity between two count distributions.
///
/// Defined as `(1 − h²)²` with `h` the Hellinger distance, which equals the
/// squared Bhattacharyya coefficient `(Σ √(p·q))²`. Either distribution
/// being empty gives `0.0`.
pub fn hellinger_fidelity(a: &Counts, b: &Counts) -> f64 {
    let total_a = a.total_shots();
    let total_b = b.total_shots();
    if total_a == 0 || total_b == 0 {
        return 0.0;
    }
    let overlap: f64 = a
        .iter()
        .map(|(bits, na)| {
            let nb = b.get(bits);
            ((na as f64 / total_a as f64) * (nb as f64 / total_b as f64)).sqrt()
        })
        .sum();
    (overlap * overlap).clamp(0.0, 1.0)
}

/// Scores each circuit by how well the data register kept its state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FidelityEvaluator {
    reference: Counts,
    data_bits: Vec<usize>,
}

impl FidelityEvaluator {
    /// Evaluator against the ideal outcome of `state`.
    ///
    /// The ideal outcome is deterministic, so the score is the fraction of
    /// shots whose data bits match it exactly.
    pub fn for_state(state: InitialState) -> Self {
        let ideal: String = std::iter::repeat_n(state.expected_bit(), DATA_QUBITS).collect();
        let mut reference = Counts::new();
        reference.insert(ideal, 1);
        Self::with_reference(reference)
    }

    /// Evaluator against a custom reference distribution over the data bits.
    pub fn with_reference(reference: Counts) -> Self {
        Self {
            reference,
            data_bits: (0..DATA_QUBITS).collect(),
        }
    }

    /// Reference distribution.
    pub fn reference(&self) -> &Counts {
        &self.reference
    }

    /// Fidelity of a single distribution.
    pub fn score(&self, counts: &Counts) -> f64 {
        if counts.total_shots() == 0 {
            return 0.0;
        }
        hellinger_fidelity(&counts.marginal(&self.data_bits), &self.reference)
    }

    /// Score every distribution, preserving order.
    pub fn evaluate(&self, raw: &RawResult) -> Vec<f64> {
        raw.iter().map(|counts| self.score(counts)).collect()
    }
}

/// Ordered fidelities, one per circuit, with their scenario blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FidelityVector {
    values: Vec<f64>,
    blocks: Vec<ScenarioBlock>,
}

impl FidelityVector {
    /// Pair fidelities with the block structure of their batch.
    pub fn new(values: Vec<f64>, blocks: Vec<ScenarioBlock>) -> Self {
        Self { values, blocks }
    }

    /// All values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check whether there are no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Scenario ranges, in order.
    pub fn blocks(&self) -> &[ScenarioBlock] {
        &self.blocks
    }

    /// Index range of `kind`, if it was run.
    pub fn range_of(&self, kind: ScenarioKind) -> Option<Range<usize>> {
        self.blocks
            .iter()
            .find(|b| b.kind == kind)
            .map(|b| b.range.clone())
    }

    /// Values of `kind`, if it was run.
    pub fn block(&self, kind: ScenarioKind) -> Option<&[f64]> {
        self.range_of(kind).and_then(|r| self.values.get(r))
    }
}

impl Index<usize> for FidelityVector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.values[index]
    }
}
