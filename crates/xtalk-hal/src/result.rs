//! Measurement results.
//!
//! Bitstrings follow the usual convention for superconducting backends:
//! classical bit 0 is the right-most character.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::JobId;

/// Measurement counts: bitstring → number of shots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Counts {
    counts: BTreeMap<String, u64>,
}

impl Counts {
    /// Create empty counts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` shots for `bitstring`, accumulating with any existing entry.
    pub fn insert(&mut self, bitstring: impl Into<String>, count: u64) {
        *self.counts.entry(bitstring.into()).or_insert(0) += count;
    }

    /// Shots observed for `bitstring`.
    pub fn get(&self, bitstring: &str) -> u64 {
        self.counts.get(bitstring).copied().unwrap_or(0)
    }

    /// Total number of shots.
    pub fn total_shots(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Number of distinct bitstrings.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Check whether no outcome was recorded.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Iterate over (bitstring, count) in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.counts.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// Outcomes sorted by descending count.
    pub fn sorted(&self) -> Vec<(&str, u64)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }

    /// The most frequent outcome.
    pub fn most_frequent(&self) -> Option<(&str, u64)> {
        self.sorted().into_iter().next()
    }

    /// Empirical probability of every outcome.
    pub fn probabilities(&self) -> BTreeMap<String, f64> {
        let total = self.total_shots();
        if total == 0 {
            return BTreeMap::new();
        }
        self.counts
            .iter()
            .map(|(k, &v)| (k.clone(), v as f64 / total as f64))
            .collect()
    }

    /// Keep only the classical bits at `indices`.
    ///
    /// The output bitstring lists the kept bits with the smallest index
    /// right-most. Register separators (spaces) are ignored and bits past the
    /// end of a short bitstring read as `0`.
    pub fn marginal(&self, indices: &[usize]) -> Counts {
        let mut keep = indices.to_vec();
        keep.sort_unstable();
        keep.dedup();

        let mut out = Counts::new();
        for (bitstring, count) in self.iter() {
            let bits: Vec<char> = bitstring.chars().filter(|c| *c != ' ').collect();
            let key: String = keep
                .iter()
                .rev()
                .map(|&i| {
                    bits.len()
                        .checked_sub(i + 1)
                        .and_then(|pos| bits.get(pos).copied())
                        .unwrap_or('0')
                })
                .collect();
            out.insert(key, count);
        }
        out
    }
}

impl FromIterator<(String, u64)> for Counts {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        let mut counts = Counts::new();
        for (k, v) in iter {
            counts.insert(k, v);
        }
        counts
    }
}

/// Outcome of one circuit of a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Measurement counts.
    pub counts: Counts,
    /// Shots requested.
    pub shots: u32,
    /// Wall-clock execution time reported by the backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
    /// Error reported by the backend for this circuit only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Backend-specific metadata.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ExecutionResult {
    /// Create a result from counts.
    pub fn new(counts: Counts, shots: u32) -> Self {
        Self {
            counts,
            shots,
            ..Default::default()
        }
    }

    /// Create a result for a circuit the backend could not run.
    pub fn failed(shots: u32, error: impl Into<String>) -> Self {
        Self {
            shots,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Set execution time.
    pub fn with_execution_time(mut self, ms: u64) -> Self {
        self.execution_time_ms = Some(ms);
        self
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Whether the backend reported an error for this circuit.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Ordered results of a submitted batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Job that produced the results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    /// One entry per submitted circuit, in submission order.
    pub results: Vec<ExecutionResult>,
    /// Completion timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl BatchResult {
    /// Create a batch result stamped with the current time.
    pub fn new(job_id: JobId, results: Vec<ExecutionResult>) -> Self {
        Self {
            job_id: Some(job_id),
            results,
            completed_at: Some(Utc::now()),
        }
    }

    /// Number of circuit results.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Check whether there are no results.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl IntoIterator for BatchResult {
    type Item = ExecutionResult;
    type IntoIter = std::vec::IntoIter<ExecutionResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}
