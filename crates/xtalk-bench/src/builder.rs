//! Circuit construction for every scenario kind.
//!
//! Every circuit has the same shape:
//!
//! 1. preparation layer, one single-qubit slot long: data qubits get the
//!    initial-state gate, attackers of attack scenarios get `X`, every other
//!    qubit idles for the same slot
//! 2. barrier
//! 3. idle window of the reference length on every qubit: data qubits idle
//!    or carry a decoupling cycle, attacker pairs run their rounds and then
//!    idle, buffers idle
//! 4. barrier
//! 5. `H` on the data register when the state is read out in the X basis
//! 6. measurement of qubit `i` into classical bit `i`
//!
//! The reference window is the longest attack of the whole sweep, so every
//! circuit of a batch has the same duration.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::debug;
use xtalk_hal::PlacedCircuit;
use xtalk_ir::{Circuit, InstructionDurations, Layout};

use crate::config::ExperimentConfig;
use crate::dd;
use crate::error::{ExperimentError, ExperimentResult};
use crate::layout::ResolvedLayouts;
use crate::scenario::{ScenarioKind, SweepParameter};

/// One constructed circuit and the scenario point it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitDescriptor {
    /// Scenario family.
    pub kind: ScenarioKind,
    /// Sweep position, `None` for non-attack kinds.
    pub sweep: Option<SweepParameter>,
    /// The circuit and its physical layout.
    pub placed: PlacedCircuit,
}

impl CircuitDescriptor {
    /// Circuit name.
    pub fn name(&self) -> &str {
        self.placed.circuit.name()
    }

    /// The logical circuit.
    pub fn circuit(&self) -> &Circuit {
        &self.placed.circuit
    }

    /// Physical layout.
    pub fn layout(&self) -> &Layout {
        &self.placed.layout
    }

    /// Scenario tag.
    pub fn tag(&self) -> (ScenarioKind, Option<SweepParameter>) {
        (self.kind, self.sweep)
    }
}

/// Contiguous range of a batch produced by one scenario kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioBlock {
    /// Scenario family.
    pub kind: ScenarioKind,
    /// Indices within the batch.
    pub range: Range<usize>,
}

/// Ordered circuits submitted together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBatch {
    circuits: Vec<CircuitDescriptor>,
}

impl CircuitBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append all circuits of `other`, keeping their order.
    pub fn extend(&mut self, other: CircuitBatch) {
        self.circuits.extend(other.circuits);
    }

    /// Number of circuits.
    pub fn len(&self) -> usize {
        self.circuits.len()
    }

    /// Check whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.circuits.is_empty()
    }

    /// Circuit at `index`.
    pub fn get(&self, index: usize) -> Option<&CircuitDescriptor> {
        self.circuits.get(index)
    }

    /// Iterate in batch order.
    pub fn iter(&self) -> std::slice::Iter<'_, CircuitDescriptor> {
        self.circuits.iter()
    }

    /// Circuits as a slice.
    pub fn as_slice(&self) -> &[CircuitDescriptor] {
        &self.circuits
    }

    /// Whether any circuit belongs to `kind`.
    pub fn contains_kind(&self, kind: ScenarioKind) -> bool {
        self.circuits.iter().any(|c| c.kind == kind)
    }

    /// Contiguous per-kind ranges, in batch order.
    pub fn blocks(&self) -> Vec<ScenarioBlock> {
        let mut blocks: Vec<ScenarioBlock> = Vec::new();
        for (i, c) in self.circuits.iter().enumerate() {
            match blocks.last_mut() {
                Some(block) if block.kind == c.kind => block.range.end = i + 1,
                _ => blocks.push(ScenarioBlock {
                    kind: c.kind,
                    range: i..i + 1,
                }),
            }
        }
        blocks
    }
}

impl<'a> IntoIterator for &'a CircuitBatch {
    type Item = &'a CircuitDescriptor;
    type IntoIter = std::slice::Iter<'a, CircuitDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.circuits.iter()
    }
}

/// Builds the circuits of each scenario kind for one configuration.
#[derive(Debug, Clone)]
pub struct ScenarioBuilder<'a> {
    config: &'a ExperimentConfig,
    layouts: &'a ResolvedLayouts,
    durations: InstructionDurations,
    window: u64,
}

impl<'a> ScenarioBuilder<'a> {
    /// Create a builder using `durations` as the timing model.
    pub fn new(
        config: &'a ExperimentConfig,
        layouts: &'a ResolvedLayouts,
        durations: InstructionDurations,
    ) -> Self {
        let longest_attack = SweepParameter::all()
            .map(|s| attack_span(s, &durations))
            .max()
            .unwrap_or(0);
        let window = durations
            .align_up(longest_attack.max(dd::min_window(config.dd_sequence(), &durations)));
        debug!(
            window_dt = window,
            window_us = durations.dt_to_us(window),
            "Reference idle window"
        );
        Self {
            config,
            layouts,
            durations,
            window,
        }
    }

    /// Length of the idle window in `dt`.
    pub fn reference_window(&self) -> u64 {
        self.window
    }

    /// Timing model in use.
    pub fn durations(&self) -> &InstructionDurations {
        &self.durations
    }

    /// Build every circuit of `kind`.
    pub fn build(&self, kind: ScenarioKind) -> ExperimentResult<CircuitBatch> {
        let circuits = kind
            .sweep()
            .into_iter()
            .map(|sweep| self.build_point(kind, sweep))
            .collect::<ExperimentResult<Vec<_>>>()?;
        debug!(scenario = %kind, circuits = circuits.len(), "Built scenario");
        Ok(CircuitBatch { circuits })
    }

    /// Baseline without attack or mitigation.
    pub fn no_attack(&self) -> ExperimentResult<CircuitBatch> {
        self.build(ScenarioKind::NoAttack)
    }

    /// Baseline with decoupling.
    pub fn no_attack_with_dd(&self) -> ExperimentResult<CircuitBatch> {
        self.build(ScenarioKind::NoAttackWithDd)
    }

    /// Attack sweep without mitigation.
    pub fn attack_no_mitigation(&self) -> ExperimentResult<CircuitBatch> {
        self.build(ScenarioKind::AttackNoMitigation)
    }

    /// Attack sweep with decoupling.
    pub fn attack_with_dd(&self) -> ExperimentResult<CircuitBatch> {
        self.build(ScenarioKind::AttackWithDd)
    }

    /// Attack sweep on the buffered layout.
    pub fn attack_with_spacing(&self) -> ExperimentResult<CircuitBatch> {
        self.build(ScenarioKind::AttackWithSpacing)
    }

    /// Attack sweep on the buffered layout with decoupling.
    pub fn attack_with_dd_and_spacing(&self) -> ExperimentResult<CircuitBatch> {
        self.build(ScenarioKind::AttackWithDdAndSpacing)
    }

    /// Build a single scenario point.
    pub fn build_point(
        &self,
        kind: ScenarioKind,
        sweep: Option<SweepParameter>,
    ) -> ExperimentResult<CircuitDescriptor> {
        if kind.has_attack() != sweep.is_some() {
            return Err(ExperimentError::usage(format!(
                "scenario {kind} {} a sweep parameter",
                if kind.has_attack() { "requires" } else { "does not take" }
            )));
        }

        let roles = self.layouts.select(kind.uses_buffer());
        let width = roles.num_qubits() as u32;
        let name = match sweep {
            Some(s) => format!("{kind}_{:02}", s.index()),
            None => kind.to_string(),
        };
        let mut circuit = Circuit::with_size(name, width, width);
        let d = &self.durations;
        let slot = d.single_qubit;
        let state = self.config.initial_state();

        for &q in roles.data() {
            match state.prep_gate() {
                Some(gate) => circuit.gate(gate, [q])?,
                None => circuit.delay(q, slot)?,
            };
        }
        for group in roles.attacks() {
            if kind.has_attack() {
                circuit.x(group.attacker)?;
            } else {
                circuit.delay(group.attacker, slot)?;
            }
            circuit.delay(group.partner, slot)?;
            if let Some(buffer) = group.buffer {
                circuit.delay(buffer, slot)?;
            }
        }
        circuit.barrier_all()?;

        for &q in roles.data() {
            if kind.uses_dd() {
                dd::pad_window(&mut circuit, q, self.window, self.config.dd_sequence(), d)?;
            } else {
                circuit.delay(q, self.window)?;
            }
        }
        for group in roles.attacks() {
            let mut used = 0;
            if let Some(s) = sweep {
                let gap = d.us_to_dt(s.gap_us());
                for _ in 0..s.rounds() {
                    circuit.cx(group.attacker, group.partner)?;
                    circuit.delay(group.attacker, gap)?;
                    circuit.delay(group.partner, gap)?;
                }
                used = attack_span(s, d);
            }
            let rest = self.window - used;
            circuit.delay(group.attacker, rest)?;
            circuit.delay(group.partner, rest)?;
            if let Some(buffer) = group.buffer {
                circuit.delay(buffer, self.window)?;
            }
        }
        circuit.barrier_all()?;

        if state.measured_in_x_basis() {
            for &q in roles.data() {
                circuit.h(q)?;
            }
        }
        circuit.measure_all()?;

        Ok(CircuitDescriptor {
            kind,
            sweep,
            placed: PlacedCircuit::new(circuit, roles.layout().clone()),
        })
    }
}

/// Time taken by the attack rounds of sweep point `sweep`.
pub fn attack_span(sweep: SweepParameter, durations: &InstructionDurations) -> u64 {
    let round = durations.two_qubit + durations.us_to_dt(sweep.gap_us());
    sweep.rounds() as u64 * round
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DdSequence, InitialState};
    use xtalk_ir::{QubitId, StandardGate};

    fn config(state: InitialState, dd: DdSequence) -> ExperimentConfig {
        ExperimentConfig::new(
            2,
            vec![4, 3, 5, 15, 22, 2, 1],
            vec![4, 3, 5, 22, 23, 24, 1, 0, 14],
            state,
            dd,
        )
        .unwrap()
    }

    #[test]
    fn test_block_sizes() {
        let config = config(InitialState::Zero, DdSequence::Xyxy);
        let layouts = ResolvedLayouts::from_config(&config).unwrap();
        let builder = ScenarioBuilder::new(&config, &layouts, InstructionDurations::default());
        assert_eq!(builder.no_attack().unwrap().len(), 1);
        assert_eq!(builder.no_attack_with_dd().unwrap().len(), 1);
        assert_eq!(builder.attack_no_mitigation().unwrap().len(), 45);
        assert_eq!(builder.attack_with_dd().unwrap().len(), 45);
        assert_eq!(builder.attack_with_spacing().unwrap().len(), 45);
        assert_eq!(builder.attack_with_dd_and_spacing().unwrap().len(), 45);
    }

    #[test]
    fn test_attack_rounds_follow_sweep() {
        let config = config(InitialState::Zero, DdSequence::Xx);
        let layouts = ResolvedLayouts::from_config(&config).unwrap();
        let builder = ScenarioBuilder::new(&config, &layouts, InstructionDurations::default());
        let batch = builder.attack_no_mitigation().unwrap();
        for (i, desc) in batch.iter().enumerate() {
            let cx = desc.circuit().count_ops().get("cx").copied().unwrap_or(0);
            // two attacker pairs, i rounds each
            assert_eq!(cx, 2 * i);
            assert_eq!(desc.sweep.map(SweepParameter::index), Some(i));
        }
    }

    #[test]
    fn test_dd_only_on_data_register() {
        let config = config(InitialState::One, DdSequence::Xyxy);
        let layouts = ResolvedLayouts::from_config(&config).unwrap();
        let builder = ScenarioBuilder::new(&config, &layouts, InstructionDurations::default());
        let desc = builder.build_point(ScenarioKind::NoAttackWithDd, None).unwrap();
        for q in 0..3 {
            let ys = desc
                .circuit()
                .ops_on(QubitId(q))
                .filter(|i| i.as_gate() == Some(StandardGate::Y))
                .count();
            assert_eq!(ys, 2);
        }
        for q in 3..7 {
            let gates = desc.circuit().ops_on(QubitId(q)).filter(|i| i.is_gate()).count();
            assert_eq!(gates, 0);
        }
    }

    #[test]
    fn test_spacing_uses_buffered_layout() {
        let config = config(InitialState::Zero, DdSequence::Xyxy);
        let layouts = ResolvedLayouts::from_config(&config).unwrap();
        let builder = ScenarioBuilder::new(&config, &layouts, InstructionDurations::default());
        let spaced = builder.build_point(ScenarioKind::AttackWithSpacing, SweepParameter::new(3)).unwrap();
        let plain = builder.build_point(ScenarioKind::AttackNoMitigation, SweepParameter::new(3)).unwrap();
        assert_eq!(spaced.circuit().num_qubits(), 9);
        assert_eq!(spaced.layout().physical_qubits(), &[4, 3, 5, 22, 23, 24, 1, 0, 14]);
        assert_eq!(plain.circuit().num_qubits(), 7);
        // buffers never see a gate
        for buffer in layouts.buffered.buffers() {
            assert_eq!(spaced.circuit().ops_on(buffer).filter(|i| i.is_gate()).count(), 0);
        }
    }

    #[test]
    fn test_plus_state_basis_change() {
        let config = config(InitialState::Plus, DdSequence::Xx);
        let layouts = ResolvedLayouts::from_config(&config).unwrap();
        let builder = ScenarioBuilder::new(&config, &layouts, InstructionDurations::default());
        let desc = builder.no_attack().unwrap();
        let hs = desc.get(0).unwrap().circuit().count_ops()["h"];
        assert_eq!(hs, 6);
    }

    #[test]
    fn test_sweep_mismatch_is_usage_error() {
        let config = config(InitialState::Zero, DdSequence::Xx);
        let layouts = ResolvedLayouts::from_config(&config).unwrap();
        let builder = ScenarioBuilder::new(&config, &layouts, InstructionDurations::default());
        assert!(matches!(
            builder.build_point(ScenarioKind::AttackWithDd, None),
            Err(ExperimentError::UsageOrder(_))
        ));
        assert!(matches!(
            builder.build_point(ScenarioKind::NoAttack, SweepParameter::new(0)),
            Err(ExperimentError::UsageOrder(_))
        ));
    }

    #[test]
    fn test_window_covers_longest_attack() {
        let config = config(InitialState::Zero, DdSequence::Xx);
        let layouts = ResolvedLayouts::from_config(&config).unwrap();
        let durations = InstructionDurations::default();
        let builder = ScenarioBuilder::new(&config, &layouts, durations);
        for s in SweepParameter::all() {
            assert!(attack_span(s, &durations) <= builder.reference_window());
        }
        assert_eq!(builder.reference_window() % durations.pulse_alignment, 0);
    }

    #[test]
    fn test_blocks() {
        let config = config(InitialState::Zero, DdSequence::Xx);
        let layouts = ResolvedLayouts::from_config(&config).unwrap();
        let builder = ScenarioBuilder::new(&config, &layouts, InstructionDurations::default());
        let mut batch = builder.no_attack().unwrap();
        batch.extend(builder.attack_with_dd().unwrap());
        let blocks = batch.blocks();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].range, 0..1);
        assert_eq!(blocks[1].kind, ScenarioKind::AttackWithDd);
        assert_eq!(blocks[1].range, 1..46);
        assert!(batch.contains_kind(ScenarioKind::NoAttack));
        assert!(!batch.contains_kind(ScenarioKind::AttackWithSpacing));
    }
}
