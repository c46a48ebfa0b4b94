//! Explicit experiment state: selection, batch, raw counts and fidelities.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use xtalk_hal::Counts;
use xtalk_ir::InstructionDurations;

use crate::builder::{CircuitBatch, ScenarioBlock, ScenarioBuilder};
use crate::config::ExperimentConfig;
use crate::error::{ExperimentError, ExperimentResult};
use crate::executor::{ExecutionEngine, RawResult};
use crate::fidelity::{FidelityEvaluator, FidelityVector};
use crate::layout::ResolvedLayouts;
use crate::scenario::ScenarioKind;

/// A set of scenario kinds, always iterated in canonical order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioSelection {
    kinds: BTreeSet<ScenarioKind>,
}

impl ScenarioSelection {
    /// Empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every scenario kind.
    pub fn all() -> Self {
        ScenarioKind::ALL.into_iter().collect()
    }

    /// Add `kind`; returns `false` if it was already selected.
    pub fn insert(&mut self, kind: ScenarioKind) -> bool {
        self.kinds.insert(kind)
    }

    /// Whether `kind` is selected.
    pub fn contains(&self, kind: ScenarioKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Number of selected kinds.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Check whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Selected kinds in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = ScenarioKind> + '_ {
        self.kinds.iter().copied()
    }

    /// Total circuits the selection produces.
    pub fn num_circuits(&self) -> usize {
        self.iter().map(ScenarioKind::sweep_len).sum()
    }

    /// Batch ranges the selection produces, without building anything.
    pub fn blocks(&self) -> Vec<ScenarioBlock> {
        let mut start = 0;
        self.iter()
            .map(|kind| {
                let end = start + kind.sweep_len();
                let block = ScenarioBlock {
                    kind,
                    range: start..end,
                };
                start = end;
                block
            })
            .collect()
    }
}

impl FromIterator<ScenarioKind> for ScenarioSelection {
    fn from_iter<I: IntoIterator<Item = ScenarioKind>>(iter: I) -> Self {
        Self {
            kinds: iter.into_iter().collect(),
        }
    }
}

/// One experiment: configuration, enabled scenarios and the results of
/// each stage.
///
/// Stages run in order: [`enable`](Self::enable) scenarios,
/// [`build`](Self::build) the batch, [`run`](Self::run) it, then
/// [`calculate_fidelity_of_data_qubits`](Self::calculate_fidelity_of_data_qubits).
/// Accessing a stage's output before it has run is a
/// [`ExperimentError::UsageOrder`] error. Changing the selection discards
/// everything derived from the previous one.
#[derive(Debug, Clone)]
pub struct Session {
    config: ExperimentConfig,
    layouts: ResolvedLayouts,
    durations: InstructionDurations,
    evaluator: FidelityEvaluator,
    selection: ScenarioSelection,
    batch: Option<CircuitBatch>,
    raw: Option<RawResult>,
    fidelities: Option<FidelityVector>,
}

impl Session {
    /// Start a session, resolving both layouts up front.
    pub fn new(config: ExperimentConfig) -> ExperimentResult<Self> {
        let layouts = ResolvedLayouts::from_config(&config)?;
        let evaluator = FidelityEvaluator::for_state(config.initial_state());
        Ok(Self {
            config,
            layouts,
            durations: InstructionDurations::default(),
            evaluator,
            selection: ScenarioSelection::new(),
            batch: None,
            raw: None,
            fidelities: None,
        })
    }

    /// Use a different timing model (typically the backend's).
    pub fn with_durations(mut self, durations: InstructionDurations) -> Self {
        self.durations = durations;
        self.invalidate();
        self
    }

    /// Score against a custom reference distribution.
    pub fn with_reference(mut self, reference: Counts) -> Self {
        self.evaluator = FidelityEvaluator::with_reference(reference);
        self.fidelities = None;
        self
    }

    /// Experiment configuration.
    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Resolved qubit roles.
    pub fn layouts(&self) -> &ResolvedLayouts {
        &self.layouts
    }

    /// Timing model.
    pub fn durations(&self) -> &InstructionDurations {
        &self.durations
    }

    /// Fidelity evaluator.
    pub fn evaluator(&self) -> &FidelityEvaluator {
        &self.evaluator
    }

    /// Currently enabled scenarios.
    pub fn selection(&self) -> &ScenarioSelection {
        &self.selection
    }

    /// Enable one scenario kind.
    pub fn enable(&mut self, kind: ScenarioKind) -> ExperimentResult<()> {
        if !self.selection.insert(kind) {
            return Err(ExperimentError::usage(format!(
                "scenario {kind} is already enabled"
            )));
        }
        self.invalidate();
        Ok(())
    }

    /// Enable every kind in `selection`.
    pub fn enable_selection(&mut self, selection: &ScenarioSelection) -> ExperimentResult<()> {
        selection.iter().try_for_each(|kind| self.enable(kind))
    }

    /// Enable every scenario kind.
    pub fn enable_all(&mut self) -> ExperimentResult<()> {
        self.enable_selection(&ScenarioSelection::all())
    }

    /// Build the batch for the enabled scenarios, in canonical order.
    pub fn build(&mut self) -> ExperimentResult<&CircuitBatch> {
        let builder = ScenarioBuilder::new(&self.config, &self.layouts, self.durations);
        let mut batch = CircuitBatch::new();
        for kind in self.selection.iter() {
            batch.extend(builder.build(kind)?);
        }
        info!(
            scenarios = self.selection.len(),
            circuits = batch.len(),
            window_dt = builder.reference_window(),
            "Built circuit batch"
        );
        self.raw = None;
        self.fidelities = None;
        Ok(self.batch.insert(batch))
    }

    /// The built batch.
    pub fn batch(&self) -> ExperimentResult<&CircuitBatch> {
        self.batch
            .as_ref()
            .ok_or_else(|| ExperimentError::usage("the batch has not been built yet"))
    }

    /// Execute the batch, building it first if needed.
    #[instrument(skip_all, fields(scenarios = self.selection.len()))]
    pub async fn run(&mut self, engine: &ExecutionEngine) -> ExperimentResult<&RawResult> {
        if self.batch.is_none() {
            self.build()?;
        }
        let batch = self.batch()?;
        let raw = engine.execute(batch).await?;
        self.fidelities = None;
        Ok(self.raw.insert(raw))
    }

    /// Raw counts of the most recent run.
    pub fn result(&self) -> ExperimentResult<&RawResult> {
        self.raw
            .as_ref()
            .ok_or_else(|| ExperimentError::usage("no result available; run the experiment first"))
    }

    /// Reduce the most recent result to data-qubit fidelities.
    pub fn calculate_fidelity_of_data_qubits(&mut self) -> ExperimentResult<&FidelityVector> {
        let raw = self.result()?;
        let batch = self.batch()?;
        let fidelities = evaluate(&self.evaluator, raw, batch.blocks());
        info!(values = fidelities.len(), "Computed data-qubit fidelities");
        Ok(self.fidelities.insert(fidelities))
    }

    /// Fidelities computed by
    /// [`calculate_fidelity_of_data_qubits`](Self::calculate_fidelity_of_data_qubits).
    pub fn fidelities(&self) -> ExperimentResult<&FidelityVector> {
        self.fidelities.as_ref().ok_or_else(|| {
            ExperimentError::usage("fidelities have not been calculated; call calculate_fidelity_of_data_qubits first")
        })
    }

    fn invalidate(&mut self) {
        self.batch = None;
        self.raw = None;
        self.fidelities = None;
    }
}

/// Score `raw` and attach `blocks`.
pub fn evaluate(
    evaluator: &FidelityEvaluator,
    raw: &RawResult,
    blocks: Vec<ScenarioBlock>,
) -> FidelityVector {
    FidelityVector::new(evaluator.evaluate(raw), blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DdSequence, InitialState};

    fn session() -> Session {
        let config = ExperimentConfig::new(
            1,
            vec![0, 1, 2, 3, 4],
            vec![0, 1, 2, 5, 6, 7],
            InitialState::Zero,
            DdSequence::Xyxy,
        )
        .unwrap();
        Session::new(config).unwrap()
    }

    #[test]
    fn test_selection_blocks() {
        let selection: ScenarioSelection = [ScenarioKind::AttackWithDd, ScenarioKind::NoAttack]
            .into_iter()
            .collect();
        let blocks = selection.blocks();
        assert_eq!(blocks[0].kind, ScenarioKind::NoAttack);
        assert_eq!(blocks[0].range, 0..1);
        assert_eq!(blocks[1].range, 1..46);
        assert_eq!(selection.num_circuits(), 46);
        assert_eq!(ScenarioSelection::all().num_circuits(), 182);
    }

    #[test]
    fn test_duplicate_enable_is_usage_error() {
        let mut s = session();
        s.enable(ScenarioKind::NoAttack).unwrap();
        let err = s.enable(ScenarioKind::NoAttack).unwrap_err();
        assert!(matches!(err, ExperimentError::UsageOrder(_)));
    }

    #[test]
    fn test_accessors_before_stages() {
        let mut s = session();
        assert!(matches!(s.batch(), Err(ExperimentError::UsageOrder(_))));
        assert!(matches!(s.result(), Err(ExperimentError::UsageOrder(_))));
        assert!(matches!(s.fidelities(), Err(ExperimentError::UsageOrder(_))));
        assert!(matches!(
            s.calculate_fidelity_of_data_qubits(),
            Err(ExperimentError::UsageOrder(_))
        ));
    }

    #[test]
    fn test_build_uses_canonical_order() {
        let mut s = session();
        s.enable(ScenarioKind::AttackWithSpacing).unwrap();
        s.enable(ScenarioKind::NoAttackWithDd).unwrap();
        let batch = s.build().unwrap();
        assert_eq!(batch.len(), 46);
        assert_eq!(batch.get(0).unwrap().kind, ScenarioKind::NoAttackWithDd);
        assert_eq!(batch.get(1).unwrap().kind, ScenarioKind::AttackWithSpacing);
    }

    #[test]
    fn test_enable_discards_stale_batch() {
        let mut s = session();
        s.enable(ScenarioKind::NoAttack).unwrap();
        s.build().unwrap();
        s.enable(ScenarioKind::AttackWithDd).unwrap();
        assert!(s.batch().is_err());
    }
}
