//! Shared helpers for CLI commands.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use xtalk_adapter_ibm::{DEFAULT_BACKEND, IbmBackend};
use xtalk_bench::{ExperimentConfig, FidelityVector, ScenarioKind, ScenarioSelection};
use xtalk_hal::Backend;

use crate::SelectionArgs;

/// Load the experiment configuration, bootstrapping a template if absent.
pub fn load_config(path: &Path) -> Result<ExperimentConfig> {
    let config = ExperimentConfig::load_or_bootstrap(path)?;
    println!(
        "  Config: {} attack pair(s), state {}, DD {}",
        config.num_of_attacks(),
        style(config.initial_state()).cyan(),
        style(config.dd_sequence()).cyan()
    );
    Ok(config)
}

/// Turn the selection flags into a [`ScenarioSelection`].
///
/// Without `--scenario` or `--all`, every kind is offered on stdin.
pub fn resolve_selection(args: &SelectionArgs) -> Result<ScenarioSelection> {
    if args.all {
        return Ok(ScenarioSelection::all());
    }
    if !args.scenarios.is_empty() {
        return Ok(args.scenarios.iter().copied().collect());
    }
    let stdin = io::stdin();
    let stdout = io::stdout();
    prompt_selection(&mut stdin.lock(), &mut stdout.lock())
}

/// Interpret a yes/no answer.
pub fn parse_answer(answer: &str) -> Option<bool> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Ask about each scenario kind in canonical order.
///
/// Anything other than yes/no skips the kind with a warning. End of input
/// skips every remaining kind.
pub fn prompt_selection<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> Result<ScenarioSelection> {
    let mut selection = ScenarioSelection::new();
    let mut line = String::new();
    for kind in ScenarioKind::ALL {
        write!(output, "Run {} ({})? [y/n] ", kind, kind.description())?;
        output.flush()?;
        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        match parse_answer(&line) {
            Some(true) => {
                selection.insert(kind);
            }
            Some(false) => {}
            None => {
                warn!(scenario = %kind, answer = line.trim(), "Unrecognized answer; skipping");
                writeln!(
                    output,
                    "{} unrecognized answer '{}', skipping {kind}",
                    style("warning:").yellow().bold(),
                    line.trim()
                )?;
            }
        }
    }
    Ok(selection)
}

/// Connect to the named backend.
pub async fn connect_backend(name: &str) -> Result<Arc<dyn Backend>> {
    let target = match name.to_lowercase().as_str() {
        "ibm" | "ibmq" => DEFAULT_BACKEND.to_string(),
        other if other.starts_with("ibm_") => other.to_string(),
        other => {
            anyhow::bail!("Unknown backend: '{other}'. Available: ibm, ibm_<device>");
        }
    };
    println!("  Connecting to IBM Quantum ({})...", style(&target).yellow());
    let backend = IbmBackend::connect(target).await.with_context(|| {
        "Failed to connect to IBM Quantum. Set IBM_API_KEY + IBM_SERVICE_CRN (or IBM_QUANTUM_TOKEN)"
    })?;
    Ok(Arc::new(backend))
}

/// Spinner shown during a backend round-trip.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(template);
    }
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Print per-scenario fidelity summaries.
pub fn print_fidelities(fidelities: &FidelityVector) {
    println!(
        "\n{} Data-qubit fidelities ({} circuits):",
        style("✓").green().bold(),
        fidelities.len()
    );
    for block in fidelities.blocks() {
        let values = fidelities.block(block.kind).unwrap_or_default();
        let Some(summary) = summarize(values) else {
            continue;
        };
        if values.len() == 1 {
            println!(
                "  {:<28} {}",
                style(block.kind).cyan(),
                style(format!("{:.4}", summary.mean)).green()
            );
        } else {
            println!(
                "  {:<28} mean {}  min {:.4}  max {:.4}  [{}..{}]",
                style(block.kind).cyan(),
                style(format!("{:.4}", summary.mean)).green(),
                summary.min,
                summary.max,
                block.range.start,
                block.range.end
            );
        }
    }
}

/// Mean, minimum and maximum of a block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Summarize `values`, `None` when empty.
pub fn summarize(values: &[f64]) -> Option<Summary> {
    if values.is_empty() {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some(Summary { mean, min, max })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("y\n"), Some(true));
        assert_eq!(parse_answer(" YES "), Some(true));
        assert_eq!(parse_answer("n"), Some(false));
        assert_eq!(parse_answer("No"), Some(false));
        assert_eq!(parse_answer("maybe"), None);
        assert_eq!(parse_answer(""), None);
    }

    #[test]
    fn test_prompt_selection_skips_unrecognized() {
        let mut input = io::Cursor::new("y\nperhaps\nn\ny\n");
        let mut output = Vec::new();
        let selection = prompt_selection(&mut input, &mut output).unwrap();
        assert!(selection.contains(ScenarioKind::NoAttack));
        assert!(!selection.contains(ScenarioKind::NoAttackWithDd));
        assert!(!selection.contains(ScenarioKind::AttackNoMitigation));
        assert!(selection.contains(ScenarioKind::AttackWithDd));
        assert_eq!(selection.len(), 2);
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("unrecognized answer 'perhaps'"));
    }

    #[test]
    fn test_resolve_selection_flags() {
        let args = SelectionArgs {
            all: true,
            ..SelectionArgs::default()
        };
        assert_eq!(resolve_selection(&args).unwrap().num_circuits(), 182);

        let args = SelectionArgs {
            scenarios: vec![ScenarioKind::NoAttackWithDd, ScenarioKind::NoAttack],
            ..SelectionArgs::default()
        };
        assert_eq!(resolve_selection(&args).unwrap().num_circuits(), 2);
    }

    #[test]
    fn test_summarize() {
        let s = summarize(&[1.0, 0.5, 0.75]).unwrap();
        assert!((s.mean - 0.75).abs() < 1e-12);
        assert_eq!(s.min, 0.5);
        assert_eq!(s.max, 1.0);
        assert!(summarize(&[]).is_none());
    }

    #[tokio::test]
    async fn test_unknown_backend() {
        let err = connect_backend("quantum_computer_9000").await.err().expect("expected error for unknown backend");
        assert!(err.to_string().contains("Unknown backend"));
    }
}
