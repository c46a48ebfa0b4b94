//! Evaluate command implementation.

use std::path::Path;

use anyhow::Result;
use console::style;

use xtalk_bench::{
    FidelityEvaluator, FidelityVector, JsonlSink, RawResult, ScenarioSelection, session,
};

use super::common::{load_config, print_fidelities, resolve_selection};
use crate::SelectionArgs;

/// Execute the evaluate command.
pub fn execute(
    config: &Path,
    output: &Path,
    run: Option<usize>,
    save: bool,
    selection: &SelectionArgs,
) -> Result<()> {
    let sink = JsonlSink::in_dir(output);
    println!(
        "{} Scoring {}",
        style("→").cyan().bold(),
        style(sink.counts_path().display()).green()
    );

    let config = load_config(config)?;
    let selection = resolve_selection(selection)?;
    let runs = sink.read_counts()?;
    let raw = pick_run(&runs, run)?;

    let evaluator = FidelityEvaluator::for_state(config.initial_state());
    let fidelities = score(&evaluator, raw, &selection)?;
    print_fidelities(&fidelities);

    if save {
        sink.append_fidelities(&fidelities)?;
        println!(
            "\n  Appended to {}",
            style(sink.fidelities_path().display()).green()
        );
    }
    Ok(())
}

/// Select run `index`, or the most recent one.
pub fn pick_run(runs: &[RawResult], index: Option<usize>) -> Result<&RawResult> {
    match index {
        Some(i) => runs
            .get(i)
            .ok_or_else(|| anyhow::anyhow!("Run {i} not found ({} run(s) recorded)", runs.len())),
        None => runs
            .last()
            .ok_or_else(|| anyhow::anyhow!("No runs recorded yet")),
    }
}

/// Score `raw`, checking it was produced by `selection`.
pub fn score(
    evaluator: &FidelityEvaluator,
    raw: &RawResult,
    selection: &ScenarioSelection,
) -> Result<FidelityVector> {
    let expected = selection.num_circuits();
    if raw.len() != expected {
        anyhow::bail!(
            "Stored run has {} distributions but the selected scenarios produce {expected}",
            raw.len()
        );
    }
    Ok(session::evaluate(evaluator, raw, selection.blocks()))
}
