//! IBM Quantum backend implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};
use xtalk_hal::{
    Backend, BackendAvailability, BackendConfig, BackendFactory, BatchResult, Capabilities,
    Counts, ExecutionResult, HalError, HalResult, JobId, JobStatus, PlacedCircuit,
};
use xtalk_ir::{BasisTranslator, InstructionDurations};
use xtalk_qasm3::emit_physical;

use crate::api::{
    BackendInfo, IbmClient, JobResultResponse, JobStatusResponse, LEGACY_ENDPOINT, SamplerResult,
};
use crate::error::{IbmError, IbmResult};

/// Default IBM Quantum backend.
pub const DEFAULT_BACKEND: &str = "ibm_torino";

/// How long to cache backend info before refreshing from the API.
const BACKEND_INFO_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
struct JobMeta {
    /// Classical bits per circuit, in submission order.
    widths: Vec<usize>,
    shots: u32,
}

/// IBM Quantum backend adapter.
pub struct IbmBackend {
    client: Arc<IbmClient>,
    target: String,
    capabilities: Capabilities,
    backend_info: Arc<RwLock<Option<(BackendInfo, Instant)>>>,
    jobs: RwLock<HashMap<String, JobMeta>>,
}

impl IbmBackend {
    fn from_client(client: IbmClient, target: String, num_qubits: u32) -> Self {
        Self {
            client: Arc::new(client),
            capabilities: Capabilities::ibm(&target, num_qubits),
            target,
            backend_info: Arc::new(RwLock::new(None)),
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Connect to `target` using credentials from the environment.
    ///
    /// `IBM_API_KEY` + `IBM_SERVICE_CRN` select the Cloud API; otherwise
    /// `IBM_QUANTUM_TOKEN` selects the legacy endpoint. Capabilities are
    /// refreshed from the device configuration when it can be fetched.
    pub async fn connect(target: impl Into<String>) -> IbmResult<Self> {
        let target = target.into();

        let mut backend = if let Ok(api_key) = std::env::var("IBM_API_KEY") {
            let service_crn =
                std::env::var("IBM_SERVICE_CRN").map_err(|_| IbmError::MissingServiceCrn)?;
            info!("Connecting to IBM Cloud API (IAM key exchange)");
            let client = IbmClient::connect(&api_key, &service_crn).await?;
            Self::from_client(client, target, 133)
        } else if let Ok(token) = std::env::var("IBM_QUANTUM_TOKEN") {
            info!("Falling back to legacy IBM Quantum token");
            let client = IbmClient::new(LEGACY_ENDPOINT, &token)?;
            Self::from_client(client, target, 127)
        } else {
            return Err(IbmError::MissingToken);
        };

        match backend.get_backend_info().await {
            Ok(info) => backend.capabilities = capabilities_from_info(&backend.target, &info),
            Err(e) => warn!(
                target = %backend.target,
                error = %e,
                "Could not fetch backend configuration; using default capabilities"
            ),
        }
        Ok(backend)
    }

    /// Create a backend from explicit configuration (legacy token mode).
    ///
    /// Recognized `extra` keys: `backend` (device name) and `instance`
    /// (hub/group/project).
    pub fn with_config(config: BackendConfig) -> IbmResult<Self> {
        let endpoint = config.endpoint.as_deref().unwrap_or(LEGACY_ENDPOINT);
        let token = config.token.as_ref().ok_or(IbmError::MissingToken)?;
        let target = config
            .extra
            .get("backend")
            .and_then(|v| v.as_str())
            .unwrap_or(DEFAULT_BACKEND);

        let mut client = IbmClient::new(endpoint, token)?;
        if let Some(instance) = config.extra.get("instance").and_then(|v| v.as_str()) {
            client = client.with_instance(instance);
        }
        Ok(Self::from_client(client, target.to_string(), 127))
    }

    /// Target device name.
    pub fn target(&self) -> &str {
        &self.target
    }

    async fn get_backend_info(&self) -> IbmResult<BackendInfo> {
        {
            let cached = self.backend_info.read().await;
            if let Some((ref info, fetched_at)) = *cached {
                if fetched_at.elapsed() < BACKEND_INFO_TTL {
                    return Ok(info.clone());
                }
            }
        }

        let info = self.client.get_backend(&self.target).await?;
        *self.backend_info.write().await = Some((info.clone(), Instant::now()));
        Ok(info)
    }
}

/// Capabilities of a device from its configuration.
///
/// Only `dt` comes from the device; the `x`/`sx` and entangler lengths keep
/// their representative sample counts. Gate durations are those of the
/// logical gates once lowered onto `basis_gates`.
fn capabilities_from_info(target: &str, info: &BackendInfo) -> Capabilities {
    let mut caps = Capabilities::ibm(target, u32::try_from(info.num_qubits).unwrap_or(u32::MAX));
    caps.is_simulator = info.simulator;
    if let Some(max_shots) = info.max_shots {
        caps.max_shots = max_shots;
    }
    if let Some(max) = info.max_experiments {
        caps.max_circuits_per_job = Some(max);
    }

    let mut native = InstructionDurations::default();
    if let Some(dt) = info.dt {
        native.dt_ns = dt * 1e9;
    }
    if info.basis_gates.is_empty() {
        let basis = caps.gate_set.native.clone();
        caps.with_basis(basis, native)
    } else {
        caps.with_basis(&info.basis_gates, native)
    }
}

/// OpenQASM 3 program for one circuit, lowered onto the device basis.
fn isa_program(placed: &PlacedCircuit, translator: &BasisTranslator) -> IbmResult<String> {
    let name = placed.circuit.name();
    let lowered = translator
        .translate(&placed.circuit)
        .map_err(|e| IbmError::CircuitError(format!("{name}: {e}")))?;
    emit_physical(&lowered, &placed.layout)
        .map_err(|e| IbmError::CircuitError(format!("{name}: {e}")))
}

fn map_status(status: &JobStatusResponse) -> JobStatus {
    match status.status.to_uppercase().as_str() {
        "QUEUED" => JobStatus::Queued,
        "COMPLETED" => JobStatus::Completed,
        "FAILED" | "ERROR" => JobStatus::Failed(
            status
                .error_message()
                .unwrap_or_else(|| "Unknown error".to_string()),
        ),
        "CANCELLED" => JobStatus::Cancelled,
        // VALIDATING, RUNNING and anything new
        _ => JobStatus::Running,
    }
}

/// Counts of one circuit, `None` if the result carries no measurement data.
///
/// `width` is the circuit's classical register size, used to left-pad the
/// bitstrings.
fn results_to_counts(result: &SamplerResult, width: usize, shots: u32) -> Option<Counts> {
    if let Some(data) = &result.data {
        let register = data.get("c").or_else(|| data.values().next())?;
        let mut counts = Counts::new();
        for sample in &register.samples {
            counts.insert(hex_to_binary(sample, width), 1);
        }
        return Some(counts);
    }

    if let Some(raw) = &result.counts {
        return Some(
            raw.iter()
                .map(|(bits, &n)| (hex_to_binary(bits, width), n))
                .collect(),
        );
    }

    let dist = result.quasi_dists.as_ref()?.first()?;
    let effective_shots = result
        .metadata
        .as_ref()
        .and_then(|m| m.get("shots"))
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(u64::from(shots)) as f64;
    Some(
        dist.iter()
            .filter_map(|(bits, &p)| {
                let n = (p * effective_shots).max(0.0).round() as u64;
                (n > 0).then(|| (hex_to_binary(bits, width), n))
            })
            .collect(),
    )
}

fn batch_from_response(
    job_id: &JobId,
    response: &JobResultResponse,
    meta: Option<&JobMeta>,
) -> BatchResult {
    let shots = meta.map_or(0, |m| m.shots);
    let results = response
        .results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let width = meta.and_then(|m| m.widths.get(i)).copied().unwrap_or(0);
            match results_to_counts(r, width, shots) {
                Some(counts) => {
                    let recorded = if shots > 0 {
                        shots
                    } else {
                        u32::try_from(counts.total_shots()).unwrap_or(u32::MAX)
                    };
                    ExecutionResult::new(counts, recorded)
                }
                None => ExecutionResult::failed(shots, "no measurement data in result"),
            }
        })
        .collect();
    BatchResult::new(job_id.clone(), results)
}

/// Convert a hex string to a binary string of `width` bits.
///
/// Decoded one digit at a time, so any register width works. With
/// `width == 0` the width falls back to 4 bits per hex digit. Excess
/// leading zeros are dropped; a value that needs more than `width` bits is
/// kept whole.
fn hex_to_binary(hex: &str, width: usize) -> String {
    let digits = hex.strip_prefix("0x").unwrap_or(hex);
    let mut bits = String::with_capacity(digits.len() * 4);
    for c in digits.chars() {
        let Some(d) = c.to_digit(16) else {
            // not hex: already a bitstring
            return digits.to_string();
        };
        for shift in (0..4).rev() {
            bits.push(if (d >> shift) & 1 == 1 { '1' } else { '0' });
        }
    }

    if width == 0 {
        return bits;
    }
    if bits.len() < width {
        return format!("{bits:0>width$}");
    }
    let excess = bits.len() - width;
    if bits[..excess].contains('1') {
        bits
    } else {
        bits.split_off(excess)
    }
}

#[async_trait]
impl Backend for IbmBackend {
    fn name(&self) -> &str {
        &self.target
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn availability(&self) -> HalResult<BackendAvailability> {
        match self.get_backend_info().await {
            Ok(info) if info.status.operational => Ok(BackendAvailability {
                is_available: true,
                queue_depth: info.status.pending_jobs,
                status_message: info.status.status_msg,
            }),
            Ok(info) => Ok(BackendAvailability::unavailable(
                info.status
                    .status_msg
                    .unwrap_or_else(|| "backend offline".to_string()),
            )),
            Err(e) => {
                warn!(error = %e, "IBM backend availability check failed");
                Ok(BackendAvailability::unavailable("failed to query backend"))
            }
        }
    }

    #[instrument(skip_all, fields(target = %self.target, circuits = batch.len(), shots = shots))]
    async fn submit(&self, batch: &[PlacedCircuit], shots: u32) -> HalResult<JobId> {
        let info = self.get_backend_info().await?;
        if !info.status.operational {
            return Err(HalError::BackendUnavailable(
                info.status
                    .status_msg
                    .unwrap_or_else(|| "backend offline".to_string()),
            ));
        }

        let translator = if info.basis_gates.is_empty() {
            self.capabilities.gate_set.translator()
        } else {
            BasisTranslator::new(&info.basis_gates)
        };

        let mut programs = Vec::with_capacity(batch.len());
        let mut widths = Vec::with_capacity(batch.len());
        for placed in batch {
            if let Some(max) = placed.layout.max_physical() {
                if max as usize >= info.num_qubits {
                    return Err(IbmError::QubitOutOfRange {
                        qubit: max,
                        available: info.num_qubits,
                    }
                    .into());
                }
            }
            programs.push(isa_program(placed, &translator)?);
            widths.push(placed.circuit.num_clbits());
        }

        let response = self
            .client
            .submit_sampler_job(&self.target, programs, shots)
            .await?;
        info!(job_id = %response.id, basis = %translator, "Submitted sampler job");

        self.jobs
            .write()
            .await
            .insert(response.id.clone(), JobMeta { widths, shots });
        Ok(JobId::new(response.id))
    }

    async fn status(&self, job_id: &JobId) -> HalResult<JobStatus> {
        let status = self.client.get_job_status(&job_id.0).await?;
        Ok(map_status(&status))
    }

    #[instrument(skip(self), fields(target = %self.target))]
    async fn result(&self, job_id: &JobId) -> HalResult<BatchResult> {
        let status = self.client.get_job_status(&job_id.0).await?;
        if !status.is_completed() {
            if status.is_failed() {
                return Err(HalError::JobFailed(
                    status
                        .error_message()
                        .unwrap_or_else(|| "Job failed".to_string()),
                ));
            }
            if status.is_cancelled() {
                return Err(HalError::JobCancelled);
            }
            return Err(HalError::Backend(format!(
                "Job {} not yet completed",
                job_id.0
            )));
        }

        let response = self.client.get_job_results(&job_id.0).await?;
        let meta = self.jobs.read().await.get(&job_id.0).cloned();
        if meta.is_none() {
            warn!(job_id = %job_id, "Job was not submitted by this session; bit widths inferred");
        }
        Ok(batch_from_response(job_id, &response, meta.as_ref()))
    }

    async fn cancel(&self, job_id: &JobId) -> HalResult<()> {
        self.client.cancel_job(&job_id.0).await?;
        info!(job_id = %job_id, "Cancelled job");
        Ok(())
    }
}

impl BackendFactory for IbmBackend {
    fn from_config(config: BackendConfig) -> HalResult<Self> {
        Ok(Self::with_config(config)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ClassicalRegisterData, JobState};

    fn v2(samples: &[&str]) -> SamplerResult {
        let mut data = HashMap::new();
        data.insert(
            "c".to_string(),
            ClassicalRegisterData {
                samples: samples.iter().map(|s| s.to_string()).collect(),
            },
        );
        SamplerResult {
            data: Some(data),
            quasi_dists: None,
            counts: None,
            metadata: None,
        }
    }

    #[test]
    fn test_hex_to_binary() {
        assert_eq!(hex_to_binary("0x0", 0), "0000");
        assert_eq!(hex_to_binary("0xff", 0), "11111111");
        assert_eq!(hex_to_binary("0x1", 5), "00001");
        assert_eq!(hex_to_binary("0x7", 9), "000000111");
        assert_eq!(hex_to_binary("0101", 0), "0000000100000001");
        assert_eq!(hex_to_binary("0x", 3), "000");
        // value wider than the register is kept whole
        assert_eq!(hex_to_binary("0x1ff", 3), "111111111");
    }

    #[test]
    fn test_hex_to_binary_wide_register() {
        let hex = format!("0x1{}7", "0".repeat(31));
        let bits = hex_to_binary(&hex, 129);
        assert_eq!(bits.len(), 129);
        assert_eq!(bits, format!("1{}111", "0".repeat(125)));

        let bits = hex_to_binary("0x5", 200);
        assert_eq!(bits.len(), 200);
        assert!(bits.ends_with("101"));
    }

    #[test]
    fn test_v2_samples_use_register_width() {
        let counts = results_to_counts(&v2(&["0x7", "0x7", "0x3", "0x107"]), 9, 4).unwrap();
        assert_eq!(counts.get("000000111"), 2);
        assert_eq!(counts.get("000000011"), 1);
        assert_eq!(counts.get("100000111"), 1);
        assert_eq!(counts.total_shots(), 4);
    }

    #[test]
    fn test_v1_counts_and_quasi_dists() {
        let mut raw = HashMap::new();
        raw.insert("0x0".to_string(), 600u64);
        raw.insert("0x5".to_string(), 400u64);
        let v1 = SamplerResult {
            data: None,
            quasi_dists: None,
            counts: Some(raw),
            metadata: None,
        };
        let counts = results_to_counts(&v1, 3, 1000).unwrap();
        assert_eq!(counts.get("101"), 400);

        let mut dist = HashMap::new();
        dist.insert("0x0".to_string(), 0.75);
        dist.insert("0x1".to_string(), 0.25);
        let quasi = SamplerResult {
            data: None,
            quasi_dists: Some(vec![dist]),
            counts: None,
            metadata: None,
        };
        let counts = results_to_counts(&quasi, 3, 400).unwrap();
        assert_eq!(counts.get("000"), 300);
        assert_eq!(counts.get("001"), 100);
    }

    #[test]
    fn test_missing_data_marks_circuit_failed() {
        let empty = SamplerResult {
            data: None,
            quasi_dists: None,
            counts: None,
            metadata: None,
        };
        let response = JobResultResponse {
            id: None,
            results: vec![v2(&["0x0"]), empty],
        };
        let meta = JobMeta {
            widths: vec![3, 3],
            shots: 1,
        };
        let batch = batch_from_response(&JobId::new("j"), &response, Some(&meta));
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.results[0].counts.get("000"), 1);
        assert!(batch.results[1].is_error());
    }

    #[test]
    fn test_status_mapping() {
        let mut s = JobStatusResponse {
            id: "j".into(),
            status: "Validating".into(),
            error: None,
            state: None,
        };
        assert_eq!(map_status(&s), JobStatus::Running);
        s.status = "Queued".into();
        assert_eq!(map_status(&s), JobStatus::Queued);
        s.status = "Failed".into();
        s.state = Some(JobState {
            status: "Failed".into(),
            reason: Some("bad pulse alignment".into()),
            reason_code: None,
        });
        assert_eq!(map_status(&s), JobStatus::Failed("bad pulse alignment".into()));
    }

    #[test]
    fn test_capabilities_from_info() {
        let info: BackendInfo = serde_json::from_value(serde_json::json!({
            "name": "ibm_torino",
            "num_qubits": 133,
            "status": {"operational": true},
            "max_experiments": 300,
            "basis_gates": ["ecr", "id", "rz", "sx", "x"],
            "dt": 4.0e-9
        }))
        .unwrap();
        let caps = capabilities_from_info("ibm_torino", &info);
        assert_eq!(caps.num_qubits, 133);
        assert_eq!(caps.max_circuits_per_job, Some(300));
        assert!((caps.durations.dt_ns - 4.0).abs() < 1e-9);

        assert_eq!(caps.gate_set.native, info.basis_gates);
        assert!(caps.gate_set.contains("h"));
        assert!(!caps.gate_set.is_native("cx"));
        // cx lowers to one dressing layer plus ecr
        let native = InstructionDurations::default();
        assert_eq!(
            caps.durations.two_qubit,
            native.two_qubit + native.single_qubit
        );
    }

    fn fez_info() -> BackendInfo {
        serde_json::from_value(serde_json::json!({
            "name": "ibm_fez",
            "num_qubits": 156,
            "status": {"operational": true},
            "basis_gates": ["cz", "id", "rx", "rz", "rzz", "sx", "x"],
            "dt": 2.2222222222222221e-10
        }))
        .unwrap()
    }

    fn full_batch(caps: &Capabilities) -> Vec<PlacedCircuit> {
        use xtalk_bench::{DdSequence, ExperimentConfig, InitialState, Session};

        let config = ExperimentConfig::new(
            2,
            (0..7).collect(),
            (20..29).collect(),
            InitialState::Plus,
            DdSequence::Xyxy,
        )
        .unwrap();
        let mut session = Session::new(config)
            .unwrap()
            .with_durations(caps.durations);
        session.enable_all().unwrap();
        session
            .build()
            .unwrap()
            .iter()
            .map(|c| c.placed.clone())
            .collect()
    }

    /// Gate names used by every statement of an emitted program.
    fn gate_names(qasm: &str) -> Vec<&str> {
        qasm.lines()
            .map(str::trim)
            .filter(|l| l.ends_with(';'))
            .filter(|l| {
                !["OPENQASM", "include", "bit[", "barrier", "delay[", "c["]
                    .iter()
                    .any(|p| l.starts_with(p))
            })
            .filter_map(|l| l.split([' ', '(']).next())
            .collect()
    }

    #[test]
    fn test_full_batch_emits_only_basis_gates() {
        let info = fez_info();
        let caps = capabilities_from_info("ibm_fez", &info);
        let batch = full_batch(&caps);
        assert_eq!(batch.len(), 182);

        let translator = BasisTranslator::new(&info.basis_gates);
        let mut seen_cz = false;
        for placed in &batch {
            assert!(xtalk_hal::validate_against(&caps, placed).is_valid());
            let qasm = isa_program(placed, &translator).unwrap();
            for name in gate_names(&qasm) {
                assert!(
                    info.basis_gates.iter().any(|g| g == name),
                    "{} emits '{name}' outside the basis",
                    placed.circuit.name()
                );
                seen_cz |= name == "cz";
            }
        }
        assert!(seen_cz);
    }

    #[test]
    fn test_isa_program_rejects_unsupported_gate() {
        let mut circuit = xtalk_ir::Circuit::with_size("plus", 1, 1);
        circuit.h(xtalk_ir::QubitId(0)).unwrap();
        circuit.measure_all().unwrap();
        let placed = PlacedCircuit::new(circuit, xtalk_ir::Layout::from_physical([3]).unwrap());

        let err = isa_program(&placed, &BasisTranslator::new(["ecr", "x"])).unwrap_err();
        assert!(matches!(err, IbmError::CircuitError(ref m) if m.contains("plus")));

        let qasm = isa_program(&placed, &BasisTranslator::new(["rz", "sx"])).unwrap();
        assert!(qasm.contains("rz(pi/2) $3;"));
        assert!(!qasm.contains("h $3;"));
    }

    #[test]
    fn test_factory_requires_token() {
        let err = IbmBackend::from_config(BackendConfig::new("ibm")).err().unwrap();
        assert!(matches!(err, HalError::AuthenticationFailed(_)));

        let config = BackendConfig::new("ibm")
            .with_token("t")
            .with_extra("backend", serde_json::json!("ibm_kyiv"));
        let backend = IbmBackend::from_config(config).unwrap();
        assert_eq!(backend.target(), "ibm_kyiv");
        assert_eq!(backend.name(), "ibm_kyiv");
    }
}
