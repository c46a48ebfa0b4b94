//! Scripted backend shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use xtalk_bench::{DdSequence, ExperimentConfig, InitialState};
use xtalk_hal::{
    Backend, BackendAvailability, BatchResult, Capabilities, Counts, ExecutionResult, HalError,
    HalResult, JobId, JobStatus, PlacedCircuit,
};

type Responder = Box<dyn Fn(&PlacedCircuit) -> ExecutionResult + Send + Sync>;

/// Backend answering each circuit through a closure.
pub struct ScriptedBackend {
    caps: Capabilities,
    responder: Responder,
    submit_failures: Mutex<VecDeque<HalError>>,
    never_completes: bool,
    drop_last_result: bool,
    jobs: Mutex<HashMap<String, Vec<ExecutionResult>>>,
    submissions: Mutex<Vec<usize>>,
    attempts: AtomicU32,
    cancels: AtomicU32,
}

impl ScriptedBackend {
    pub fn new(responder: impl Fn(&PlacedCircuit) -> ExecutionResult + Send + Sync + 'static) -> Self {
        Self {
            caps: Capabilities::ideal("scripted", 127),
            responder: Box::new(responder),
            submit_failures: Mutex::new(VecDeque::new()),
            never_completes: false,
            drop_last_result: false,
            jobs: Mutex::new(HashMap::new()),
            submissions: Mutex::new(Vec::new()),
            attempts: AtomicU32::new(0),
            cancels: AtomicU32::new(0),
        }
    }

    /// Every data qubit reads back its ideal value.
    pub fn perfect() -> Self {
        Self::new(|_| ExecutionResult::new(counts(&[("000", 1024)]), 1024))
    }

    pub fn with_capabilities(mut self, caps: Capabilities) -> Self {
        self.caps = caps;
        self
    }

    pub fn failing_submits(self, errors: impl IntoIterator<Item = HalError>) -> Self {
        self.submit_failures.lock().unwrap().extend(errors);
        self
    }

    pub fn never_completing(mut self) -> Self {
        self.never_completes = true;
        self
    }

    pub fn dropping_last_result(mut self) -> Self {
        self.drop_last_result = true;
        self
    }

    /// Circuit count of every accepted submission, in order.
    pub fn submissions(&self) -> Vec<usize> {
        self.submissions.lock().unwrap().clone()
    }

    /// Submit calls, including failed ones.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn cancels(&self) -> u32 {
        self.cancels.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    async fn availability(&self) -> HalResult<BackendAvailability> {
        Ok(BackendAvailability::always_available())
    }

    async fn submit(&self, batch: &[PlacedCircuit], _shots: u32) -> HalResult<JobId> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.submit_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        let mut results: Vec<ExecutionResult> = batch.iter().map(|p| (self.responder)(p)).collect();
        if self.drop_last_result {
            results.pop();
        }
        let mut submissions = self.submissions.lock().unwrap();
        submissions.push(batch.len());
        let id = format!("job-{}", submissions.len());
        self.jobs.lock().unwrap().insert(id.clone(), results);
        Ok(JobId::new(id))
    }

    async fn status(&self, _job_id: &JobId) -> HalResult<JobStatus> {
        Ok(if self.never_completes {
            JobStatus::Running
        } else {
            JobStatus::Completed
        })
    }

    async fn result(&self, job_id: &JobId) -> HalResult<BatchResult> {
        let results = self
            .jobs
            .lock()
            .unwrap()
            .remove(&job_id.0)
            .ok_or_else(|| HalError::JobNotFound(job_id.0.clone()))?;
        Ok(BatchResult::new(job_id.clone(), results))
    }

    async fn cancel(&self, _job_id: &JobId) -> HalResult<()> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn counts(entries: &[(&str, u64)]) -> Counts {
    entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

/// Two attacks on a heavy-hex patch.
pub fn config(state: InitialState) -> ExperimentConfig {
    ExperimentConfig::new(
        2,
        vec![4, 3, 5, 15, 22, 2, 1],
        vec![4, 3, 5, 22, 23, 24, 1, 0, 14],
        state,
        DdSequence::Xyxy,
    )
    .unwrap()
}
