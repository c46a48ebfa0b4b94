//! Batched execution with retry, chunking and a run deadline.

use std::future::Future;
use std::ops::Index;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{info, instrument, warn};
use xtalk_hal::{
    Backend, BatchResult, Counts, HalError, PlacedCircuit, ValidationResult, validate_against,
};

use crate::builder::CircuitBatch;
use crate::error::ExecutionError;

/// Count distributions in batch order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawResult {
    distributions: Vec<Counts>,
}

impl RawResult {
    /// Wrap ordered distributions.
    pub fn new(distributions: Vec<Counts>) -> Self {
        Self { distributions }
    }

    /// Number of distributions.
    pub fn len(&self) -> usize {
        self.distributions.len()
    }

    /// Check whether there are none.
    pub fn is_empty(&self) -> bool {
        self.distributions.is_empty()
    }

    /// Distribution at `index`.
    pub fn get(&self, index: usize) -> Option<&Counts> {
        self.distributions.get(index)
    }

    /// Iterate in batch order.
    pub fn iter(&self) -> std::slice::Iter<'_, Counts> {
        self.distributions.iter()
    }

    /// Distributions as a slice.
    pub fn as_slice(&self) -> &[Counts] {
        &self.distributions
    }
}

impl Index<usize> for RawResult {
    type Output = Counts;

    fn index(&self, index: usize) -> &Counts {
        &self.distributions[index]
    }
}

/// Exponential backoff for transient backend failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Backoff unit; attempt `n` waits `base * 2^n`.
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Wait before attempt number `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff.saturating_mul(1u32 << attempt.min(16))
    }
}

/// Knobs for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOptions {
    /// Shots per circuit.
    pub shots: u32,
    /// Retry behaviour.
    pub retry: RetryPolicy,
    /// Deadline for the whole run, across all jobs and retries.
    pub timeout: Option<Duration>,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            shots: 1024,
            retry: RetryPolicy::default(),
            timeout: None,
        }
    }
}

enum RunError {
    Hal(HalError),
    Deadline,
}

/// Submits circuit batches to a backend and collects ordered counts.
///
/// Jobs of one run are strictly sequential. If the backend limits the
/// number of circuits per job, the batch is split into the fewest chunks
/// that fit and the results are concatenated in order.
#[derive(Clone)]
pub struct ExecutionEngine {
    backend: Arc<dyn Backend>,
    options: ExecutionOptions,
}

impl ExecutionEngine {
    /// Create an engine with default options.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            options: ExecutionOptions::default(),
        }
    }

    /// Replace the options.
    pub fn with_options(mut self, options: ExecutionOptions) -> Self {
        self.options = options;
        self
    }

    /// The backend in use.
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Current options.
    pub fn options(&self) -> &ExecutionOptions {
        &self.options
    }

    /// Run `batch` and return one distribution per circuit.
    ///
    /// Circuits the backend reports as failed yield an empty distribution at
    /// their position. An empty batch returns immediately without contacting
    /// the backend.
    #[instrument(skip_all, fields(backend = %self.backend.name(), circuits = batch.len()))]
    pub async fn execute(&self, batch: &CircuitBatch) -> Result<RawResult, ExecutionError> {
        if batch.is_empty() {
            info!("Empty batch; nothing to submit");
            return Ok(RawResult::default());
        }
        self.preflight(batch)?;

        let deadline = self.options.timeout.map(|t| Instant::now() + t);
        let placed: Vec<PlacedCircuit> = batch.iter().map(|c| c.placed.clone()).collect();
        let chunk_size = self
            .backend
            .capabilities()
            .max_circuits_per_job
            .unwrap_or(placed.len())
            .max(1);
        let num_jobs = placed.len().div_ceil(chunk_size);

        let mut distributions = Vec::with_capacity(placed.len());
        for (job_index, chunk) in placed.chunks(chunk_size).enumerate() {
            info!(
                job = job_index + 1,
                of = num_jobs,
                circuits = chunk.len(),
                shots = self.options.shots,
                "Submitting batch"
            );
            let result = self.run_with_retry(chunk, deadline).await?;
            if result.len() != chunk.len() {
                return Err(ExecutionError::ResultMismatch {
                    submitted: chunk.len(),
                    returned: result.len(),
                });
            }

            let base = job_index * chunk_size;
            for (offset, outcome) in result.into_iter().enumerate() {
                match outcome.error {
                    Some(msg) => {
                        warn!(
                            index = base + offset,
                            error = %msg,
                            "Circuit failed on backend; recording empty distribution"
                        );
                        distributions.push(Counts::new());
                    }
                    None => distributions.push(outcome.counts),
                }
            }
        }

        info!(results = distributions.len(), "Batch complete");
        Ok(RawResult::new(distributions))
    }

    fn preflight(&self, batch: &CircuitBatch) -> Result<(), ExecutionError> {
        let caps = self.backend.capabilities();
        let shots = self.options.shots;
        if shots == 0 || shots > caps.max_shots {
            return Err(ExecutionError::InvalidShots {
                shots,
                max: caps.max_shots,
            });
        }
        for (index, desc) in batch.iter().enumerate() {
            if let ValidationResult::Invalid { reasons } = validate_against(caps, &desc.placed) {
                return Err(ExecutionError::InvalidCircuit {
                    index,
                    name: desc.name().to_string(),
                    reasons,
                });
            }
        }
        Ok(())
    }

    async fn run_with_retry(
        &self,
        chunk: &[PlacedCircuit],
        deadline: Option<Instant>,
    ) -> Result<BatchResult, ExecutionError> {
        let retry = self.options.retry;
        let max_attempts = retry.max_attempts.max(1);

        for attempt in 0..max_attempts {
            if attempt > 0 {
                let backoff = retry.backoff(attempt);
                warn!(
                    attempt = attempt + 1,
                    "Retrying after transient failure (backoff {:?})", backoff
                );
                if bounded(deadline, tokio::time::sleep(backoff)).await.is_none() {
                    return Err(self.deadline_error());
                }
            }

            match self.run_once(chunk, deadline).await {
                Ok(result) => return Ok(result),
                Err(RunError::Deadline) => return Err(self.deadline_error()),
                Err(RunError::Hal(e)) if e.is_transient() && attempt + 1 < max_attempts => {
                    warn!(error = %e, "Transient backend failure");
                }
                Err(RunError::Hal(e)) => {
                    return Err(ExecutionError::Backend {
                        attempts: attempt + 1,
                        source: e,
                    });
                }
            }
        }

        unreachable!("the final attempt always returns")
    }

    async fn run_once(
        &self,
        chunk: &[PlacedCircuit],
        deadline: Option<Instant>,
    ) -> Result<BatchResult, RunError> {
        let job_id = bounded(deadline, self.backend.submit(chunk, self.options.shots))
            .await
            .ok_or(RunError::Deadline)?
            .map_err(RunError::Hal)?;
        info!(job_id = %job_id, "Job submitted");

        match bounded(deadline, self.backend.wait(&job_id)).await {
            Some(result) => result.map_err(RunError::Hal),
            None => {
                warn!(job_id = %job_id, "Run deadline reached; cancelling job");
                if let Err(e) = self.backend.cancel(&job_id).await {
                    warn!(job_id = %job_id, error = %e, "Failed to cancel job");
                }
                Err(RunError::Deadline)
            }
        }
    }

    fn deadline_error(&self) -> ExecutionError {
        ExecutionError::Timeout(self.options.timeout.unwrap_or_default())
    }
}

async fn bounded<F: Future>(deadline: Option<Instant>, fut: F) -> Option<F::Output> {
    match deadline {
        Some(at) => tokio::time::timeout_at(at, fut).await.ok(),
        None => Some(fut.await),
    }
}
