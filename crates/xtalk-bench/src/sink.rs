//! Append-only JSON-lines persistence of counts and fidelities.
//!
//! Each run appends one line to each file: the counts file receives an array
//! of bitstring-to-count objects, the fidelities file an array of floats.
//! Files are created on first use and never truncated.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ExperimentError, ExperimentResult};
use crate::executor::RawResult;
use crate::fidelity::FidelityVector;

/// Default counts file name.
pub const COUNTS_FILE: &str = "counts.jsonl";
/// Default fidelities file name.
pub const FIDELITIES_FILE: &str = "fidelities.jsonl";

/// Pair of JSON-lines files receiving run outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonlSink {
    counts_path: PathBuf,
    fidelities_path: PathBuf,
}

impl JsonlSink {
    /// Sink writing to explicit paths.
    pub fn new(counts_path: impl Into<PathBuf>, fidelities_path: impl Into<PathBuf>) -> Self {
        Self {
            counts_path: counts_path.into(),
            fidelities_path: fidelities_path.into(),
        }
    }

    /// Sink using the default file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join(COUNTS_FILE), dir.join(FIDELITIES_FILE))
    }

    /// Counts file.
    pub fn counts_path(&self) -> &Path {
        &self.counts_path
    }

    /// Fidelities file.
    pub fn fidelities_path(&self) -> &Path {
        &self.fidelities_path
    }

    /// Append one run's raw counts.
    pub fn append_counts(&self, raw: &RawResult) -> ExperimentResult<()> {
        append_line(&self.counts_path, raw)
    }

    /// Append one run's fidelities.
    pub fn append_fidelities(&self, fidelities: &FidelityVector) -> ExperimentResult<()> {
        append_line(&self.fidelities_path, fidelities.values())
    }

    /// Every run recorded in the counts file, oldest first.
    pub fn read_counts(&self) -> ExperimentResult<Vec<RawResult>> {
        read_lines(&self.counts_path)
    }

    /// Every run recorded in the fidelities file, oldest first.
    pub fn read_fidelities(&self) -> ExperimentResult<Vec<Vec<f64>>> {
        read_lines(&self.fidelities_path)
    }
}

fn sink_error(path: &Path, source: io::Error) -> ExperimentError {
    ExperimentError::Sink {
        path: path.to_path_buf(),
        source,
    }
}

fn append_line<T: Serialize + ?Sized>(path: &Path, value: &T) -> ExperimentResult<()> {
    let line = serde_json::to_string(value).map_err(|e| sink_error(path, e.into()))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| sink_error(path, e))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| sink_error(path, e))?;
    writeln!(file, "{line}").map_err(|e| sink_error(path, e))?;
    debug!(path = %path.display(), bytes = line.len(), "Appended result line");
    Ok(())
}

fn read_lines<T: DeserializeOwned>(path: &Path) -> ExperimentResult<Vec<T>> {
    let file = File::open(path).map_err(|e| sink_error(path, e))?;
    let mut out = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| sink_error(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        out.push(serde_json::from_str(&line).map_err(|e| sink_error(path, e.into()))?);
    }
    Ok(out)
}
