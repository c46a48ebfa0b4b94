//! Build command implementation: a dry run writing the generated circuits.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use console::style;

use xtalk_bench::{CircuitBatch, Session};
use xtalk_qasm3::emit_physical;

use super::common::{load_config, resolve_selection};
use crate::SelectionArgs;

/// Execute the build command.
pub fn execute(config: &Path, output: &Path, selection: &SelectionArgs) -> Result<()> {
    println!(
        "{} Building circuits into {}",
        style("→").cyan().bold(),
        style(output.display()).green()
    );

    let config = load_config(config)?;
    let selection = resolve_selection(selection)?;

    let mut session = Session::new(config)?;
    session.enable_selection(&selection)?;
    let batch = session.build()?;
    let written = write_batch(batch, output)?;

    println!(
        "\n{} Wrote {} circuit(s)",
        style("✓").green().bold(),
        written.len()
    );
    for block in batch.blocks() {
        println!(
            "  {:<28} {:>3} circuit(s)",
            style(block.kind).cyan(),
            block.range.len()
        );
    }
    Ok(())
}

/// Emit every circuit of `batch` as `<index>_<name>.qasm` under `dir`.
pub fn write_batch(batch: &CircuitBatch, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    batch
        .iter()
        .enumerate()
        .map(|(index, descriptor)| {
            let source = emit_physical(descriptor.circuit(), descriptor.layout())
                .with_context(|| format!("Failed to emit circuit '{}'", descriptor.name()))?;
            let path = dir.join(format!("{index:03}_{}.qasm", descriptor.name()));
            fs::write(&path, source)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Ok(path)
        })
        .collect()
}
