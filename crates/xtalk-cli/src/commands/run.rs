//! Run command implementation.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use console::style;
use tracing::info;
use uuid::Uuid;

use xtalk_bench::{ExecutionEngine, ExecutionOptions, JsonlSink, Session};

use super::common::{connect_backend, load_config, print_fidelities, resolve_selection, spinner};
use crate::SelectionArgs;

/// Arguments of the run command.
pub struct RunArgs {
    pub config: PathBuf,
    pub backend: String,
    pub shots: u32,
    pub timeout: Option<u64>,
    pub output: PathBuf,
    pub save: bool,
    pub selection: SelectionArgs,
}

/// Execute the run command.
pub async fn execute(args: RunArgs) -> Result<()> {
    let run_id = Uuid::new_v4();
    println!(
        "{} Run {} on {} ({} shots)",
        style("→").cyan().bold(),
        style(run_id).dim(),
        style(&args.backend).yellow(),
        args.shots
    );

    let config = load_config(&args.config)?;
    let selection = resolve_selection(&args.selection)?;
    if selection.is_empty() {
        println!("  No scenarios selected; nothing to do.");
        return Ok(());
    }

    let backend = connect_backend(&args.backend).await?;
    let avail = backend.availability().await?;
    if !avail.is_available {
        anyhow::bail!(
            "Backend '{}' is not available{}",
            backend.name(),
            avail
                .status_message
                .map(|m| format!(": {m}"))
                .unwrap_or_default()
        );
    }

    let mut session = Session::new(config)?.with_durations(backend.capabilities().durations);
    session.enable_selection(&selection)?;
    let circuits = session.build()?.len();
    println!(
        "  Built {} circuits for {} scenario(s)",
        style(circuits).yellow(),
        selection.len()
    );
    info!(%run_id, circuits, backend = backend.name(), "Starting run");

    let engine = ExecutionEngine::new(backend).with_options(ExecutionOptions {
        shots: args.shots,
        timeout: args.timeout.map(Duration::from_secs),
        ..ExecutionOptions::default()
    });

    let progress = spinner(format!("Executing {circuits} circuits..."));
    let outcome = session.run(&engine).await;
    progress.finish_and_clear();
    outcome?;

    let fidelities = session.calculate_fidelity_of_data_qubits()?;
    print_fidelities(fidelities);

    if args.save {
        let sink = JsonlSink::in_dir(&args.output);
        sink.append_counts(session.result()?)?;
        sink.append_fidelities(session.fidelities()?)?;
        println!(
            "\n  Appended to {} and {}",
            style(sink.counts_path().display()).green(),
            style(sink.fidelities_path().display()).green()
        );
    }

    Ok(())
}
