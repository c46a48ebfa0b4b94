//! IBM Quantum Platform REST client.
//!
//! Covers what a batched sampler run needs:
//! - authentication via IAM key exchange (Cloud API) or a direct token (legacy)
//! - backend configuration and status
//! - Sampler job submission, status polling, results and cancellation
//!
//! Cloud API jobs use the Sampler V2 PUB format, one `[qasm, {}, shots]`
//! entry per circuit. Legacy jobs send the V1 `circuits` list.

// Response fields are deserialized as part of the API contract even where unused.
#![allow(dead_code)]

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use reqwest::{Client, Response, header};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::{IbmError, IbmResult};

/// IBM Quantum Cloud API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://quantum.cloud.ibm.com/api";

/// Legacy IBM Quantum API endpoint.
pub const LEGACY_ENDPOINT: &str = "https://api.quantum-computing.ibm.com";

const IAM_TOKEN_URL: &str = "https://iam.cloud.ibm.com/identity/token";

const IBM_API_VERSION: &str = "2026-02-01";

const USER_AGENT: &str = concat!("xtalk/", env!("CARGO_PKG_VERSION"));

/// IBM Quantum API client.
pub struct IbmClient {
    client: Client,
    endpoint: String,
    /// Selected instance (hub/group/project), legacy mode only.
    instance: Option<String>,
    cloud_api: bool,
}

impl fmt::Debug for IbmClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IbmClient")
            .field("endpoint", &self.endpoint)
            .field("token", &"[REDACTED]")
            .field("instance", &self.instance)
            .field("cloud_api", &self.cloud_api)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct IamTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

fn base_headers(bearer: &str) -> IbmResult<header::HeaderMap> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {bearer}"))
            .map_err(|_| IbmError::InvalidToken)?,
    );
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::ACCEPT,
        header::HeaderValue::from_static("application/json"),
    );
    Ok(headers)
}

fn http_client(headers: header::HeaderMap) -> IbmResult<Client> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(Duration::from_secs(60))
        .connect_timeout(Duration::from_secs(10))
        .build()?)
}

/// Turn a non-success response into an [`IbmError::ApiError`].
async fn api_error(response: Response, context: &str) -> IbmError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "no body".to_string());
    match serde_json::from_str::<ApiErrorResponse>(&body) {
        Ok(parsed) if !parsed.message.is_empty() => IbmError::ApiError {
            status: Some(status.as_u16()),
            code: parsed.code,
            message: format!("{context}: {}", parsed.message),
        },
        _ => IbmError::ApiError {
            status: Some(status.as_u16()),
            code: None,
            message: format!("{context}: {body}"),
        },
    }
}

impl IbmClient {
    /// Client for the legacy endpoint with a direct bearer token.
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> IbmResult<Self> {
        let client = http_client(base_headers(&token.into())?)?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            instance: None,
            cloud_api: false,
        })
    }

    /// Client for the Cloud API.
    ///
    /// Exchanges `api_key` for an IAM bearer token and sets the
    /// `Service-CRN` header every Cloud API request requires.
    pub async fn connect(api_key: &str, service_crn: &str) -> IbmResult<Self> {
        let iam_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let iam_response = iam_client
            .post(IAM_TOKEN_URL)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(format!(
                "grant_type=urn:ibm:params:oauth:grant-type:apikey&apikey={api_key}"
            ))
            .send()
            .await
            .map_err(|e| IbmError::IamTokenExchange(e.to_string()))?;

        if !iam_response.status().is_success() {
            let status = iam_response.status();
            let body = iam_response
                .text()
                .await
                .unwrap_or_else(|_| "no body".to_string());
            return Err(IbmError::IamTokenExchange(format!(
                "IAM returned {status}: {body}"
            )));
        }

        let iam_token: IamTokenResponse = iam_response.json().await.map_err(|e| {
            IbmError::IamTokenExchange(format!("failed to parse IAM response: {e}"))
        })?;
        debug!(expires_in = ?iam_token.expires_in, "IAM token obtained");

        let mut headers = base_headers(&iam_token.access_token)?;
        headers.insert(
            header::HeaderName::from_static("service-crn"),
            header::HeaderValue::from_str(service_crn)
                .map_err(|_| IbmError::InvalidParameter("invalid Service-CRN value".into()))?,
        );
        headers.insert(
            header::HeaderName::from_static("ibm-api-version"),
            header::HeaderValue::from_static(IBM_API_VERSION),
        );

        Ok(Self {
            client: http_client(headers)?,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            instance: None,
            cloud_api: true,
        })
    }

    /// Set the instance (hub/group/project) for legacy job submission.
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Whether this client uses the Cloud API.
    pub fn is_cloud_api(&self) -> bool {
        self.cloud_api
    }

    /// Details for one backend.
    pub async fn get_backend(&self, name: &str) -> IbmResult<BackendInfo> {
        if self.cloud_api {
            self.get_backend_cloud(name).await
        } else {
            self.get_backend_legacy(name).await
        }
    }

    async fn get_backend_cloud(&self, name: &str) -> IbmResult<BackendInfo> {
        let config_url = format!("{}/v1/backends/{}/configuration", self.endpoint, name);
        let config_response = self.client.get(&config_url).send().await?;
        if config_response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(IbmError::BackendUnavailable(name.to_string()));
        }
        if !config_response.status().is_success() {
            return Err(api_error(config_response, &format!("configuration of {name}")).await);
        }
        let config: BackendConfigResponse = config_response.json().await?;

        let status_url = format!("{}/v1/backends/{}/status", self.endpoint, name);
        let status_response = self.client.get(&status_url).send().await?;
        let status = if status_response.status().is_success() {
            let s: BackendStatusResponse = status_response.json().await?;
            BackendStatus {
                operational: s.state,
                status_msg: Some(s.status),
                pending_jobs: Some(u32::try_from(s.length_queue).unwrap_or(u32::MAX)),
            }
        } else {
            warn!(backend = name, "Status query failed; assuming operational");
            BackendStatus {
                operational: true,
                status_msg: None,
                pending_jobs: None,
            }
        };

        Ok(BackendInfo {
            name: config.backend_name,
            num_qubits: config.n_qubits,
            status,
            basis_gates: config.basis_gates,
            simulator: config.simulator.unwrap_or(false),
            max_shots: config.max_shots,
            max_experiments: config.max_experiments,
            dt: config.dt,
        })
    }

    async fn get_backend_legacy(&self, name: &str) -> IbmResult<BackendInfo> {
        let url = format!("{}/v1/backends/{}", self.endpoint, name);
        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(IbmError::BackendUnavailable(name.to_string()));
        }
        if !response.status().is_success() {
            return Err(api_error(response, &format!("backend {name}")).await);
        }
        response.json().await.map_err(IbmError::from)
    }

    /// Submit a batch of OpenQASM 3 programs to the Sampler primitive.
    pub async fn submit_sampler_job(
        &self,
        backend: &str,
        circuits: Vec<String>,
        shots: u32,
    ) -> IbmResult<SubmitResponse> {
        let url = format!("{}/v1/jobs", self.endpoint);
        let body = sampler_request(
            backend,
            circuits,
            shots,
            self.cloud_api,
            self.instance.as_deref(),
        );

        let response = self.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response, "job submission failed").await);
        }
        response.json().await.map_err(IbmError::from)
    }

    /// Job status.
    pub async fn get_job_status(&self, job_id: &str) -> IbmResult<JobStatusResponse> {
        let url = format!("{}/v1/jobs/{}", self.endpoint, job_id);
        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(IbmError::JobNotFound(job_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(api_error(response, "job status").await);
        }
        response.json().await.map_err(IbmError::from)
    }

    /// Job results, one entry per submitted circuit.
    pub async fn get_job_results(&self, job_id: &str) -> IbmResult<JobResultResponse> {
        let url = format!("{}/v1/jobs/{}/results", self.endpoint, job_id);
        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(IbmError::JobNotFound(job_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(api_error(response, "job results").await);
        }
        response.json().await.map_err(IbmError::from)
    }

    /// Cancel a job.
    pub async fn cancel_job(&self, job_id: &str) -> IbmResult<()> {
        let url = format!("{}/v1/jobs/{}/cancel", self.endpoint, job_id);
        let response = self.client.post(&url).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response, "cancel").await);
        }
        Ok(())
    }
}

/// Body of a Sampler job request.
///
/// The V2 Sampler only accepts ISA circuits: every circuit must already be
/// lowered onto the device basis and laid out on physical qubits. The runtime
/// must neither re-route them nor insert its own decoupling.
pub(crate) fn sampler_request(
    backend: &str,
    circuits: Vec<String>,
    shots: u32,
    cloud_api: bool,
    instance: Option<&str>,
) -> Value {
    if cloud_api {
        let pubs: Vec<Value> = circuits.into_iter().map(|c| json!([c, {}, shots])).collect();
        json!({
            "program_id": "sampler",
            "backend": backend,
            "params": {
                "version": 2,
                "pubs": pubs,
                "options": {
                    "dynamical_decoupling": { "enable": false },
                },
            },
        })
    } else {
        let mut request = json!({
            "program_id": "sampler",
            "backend": backend,
            "params": {
                "circuits": circuits,
                "shots": shots,
                "skip_transpilation": true,
            },
        });
        if let Some(hub) = instance {
            request["hub"] = json!(hub);
        }
        request
    }
}

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: String,
}

/// Cloud API configuration from `/backends/{name}/configuration`.
#[derive(Debug, Deserialize)]
struct BackendConfigResponse {
    backend_name: String,
    n_qubits: usize,
    #[serde(default)]
    basis_gates: Vec<String>,
    #[serde(default)]
    simulator: Option<bool>,
    #[serde(default)]
    max_shots: Option<u32>,
    #[serde(default)]
    max_experiments: Option<usize>,
    /// Sample time in seconds.
    #[serde(default)]
    dt: Option<f64>,
}

/// Cloud API status from `/backends/{name}/status`.
#[derive(Debug, Deserialize)]
struct BackendStatusResponse {
    state: bool,
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    length_queue: u64,
}

/// Backend information.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendInfo {
    /// Backend name.
    pub name: String,
    /// Number of qubits.
    pub num_qubits: usize,
    /// Backend status.
    pub status: BackendStatus,
    /// Basis gates.
    #[serde(default)]
    pub basis_gates: Vec<String>,
    /// Whether this is a simulator.
    #[serde(default)]
    pub simulator: bool,
    /// Maximum shots per circuit.
    #[serde(default)]
    pub max_shots: Option<u32>,
    /// Maximum circuits per job.
    #[serde(default)]
    pub max_experiments: Option<usize>,
    /// Sample time in seconds.
    #[serde(default)]
    pub dt: Option<f64>,
}

/// Backend status.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendStatus {
    /// Whether the backend is operational.
    pub operational: bool,
    /// Status message.
    #[serde(default)]
    pub status_msg: Option<String>,
    /// Jobs ahead in the queue.
    #[serde(default)]
    pub pending_jobs: Option<u32>,
}

/// Job submission response.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    /// Job ID.
    pub id: String,
    /// Initial status.
    #[serde(default)]
    pub status: String,
}

/// Job status response.
#[derive(Debug, Clone, Deserialize)]
pub struct JobStatusResponse {
    /// Job ID.
    pub id: String,
    /// Status, mixed case on the Cloud API.
    pub status: String,
    /// Error information (legacy API).
    #[serde(default)]
    pub error: Option<JobError>,
    /// State with failure reason (Cloud API).
    #[serde(default)]
    pub state: Option<JobState>,
}

/// Job error information (legacy API).
#[derive(Debug, Clone, Deserialize)]
pub struct JobError {
    /// Error code.
    #[serde(default)]
    pub code: Option<String>,
    /// Error message.
    pub message: String,
}

/// Job state with reason (Cloud API).
#[derive(Debug, Clone, Deserialize)]
pub struct JobState {
    /// Status string.
    #[serde(default)]
    pub status: String,
    /// Reason for failure.
    #[serde(default)]
    pub reason: Option<String>,
    /// Reason code.
    #[serde(default)]
    pub reason_code: Option<u32>,
}

impl JobStatusResponse {
    fn normalized_status(&self) -> String {
        self.status.to_uppercase()
    }

    /// Check if the job completed successfully.
    pub fn is_completed(&self) -> bool {
        self.normalized_status() == "COMPLETED"
    }

    /// Check if the job failed.
    pub fn is_failed(&self) -> bool {
        matches!(self.normalized_status().as_str(), "FAILED" | "ERROR")
    }

    /// Check if the job was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.normalized_status() == "CANCELLED"
    }

    /// Failure reason, preferring the Cloud API state.
    pub fn error_message(&self) -> Option<String> {
        self.state
            .as_ref()
            .and_then(|s| s.reason.clone())
            .or_else(|| self.error.as_ref().map(|e| e.message.clone()))
    }
}

/// Job result response.
#[derive(Debug, Deserialize)]
pub struct JobResultResponse {
    /// Job ID (absent on the V2 results endpoint).
    #[serde(default)]
    pub id: Option<String>,
    /// One entry per circuit, in submission order.
    pub results: Vec<SamplerResult>,
}

/// Sampler result for one circuit.
#[derive(Debug, Deserialize)]
pub struct SamplerResult {
    /// V2 data: classical register name to per-shot samples.
    #[serde(default)]
    pub data: Option<HashMap<String, ClassicalRegisterData>>,
    /// V1 quasi-probability distributions.
    #[serde(default)]
    pub quasi_dists: Option<Vec<HashMap<String, f64>>>,
    /// V1 counts.
    #[serde(default)]
    pub counts: Option<HashMap<String, u64>>,
    /// Metadata.
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// Classical register data from V2 Sampler results.
#[derive(Debug, Deserialize)]
pub struct ClassicalRegisterData {
    /// Per-shot samples as hex strings (`"0x5"`).
    pub samples: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: &str, reason: Option<&str>) -> JobStatusResponse {
        JobStatusResponse {
            id: "job".into(),
            status: status.into(),
            error: None,
            state: reason.map(|r| JobState {
                status: status.into(),
                reason: Some(r.into()),
                reason_code: Some(1513),
            }),
        }
    }

    #[test]
    fn test_job_status_mixed_case() {
        let failed = status("Failed", Some("circuit too deep"));
        assert!(failed.is_failed());
        assert_eq!(failed.error_message().as_deref(), Some("circuit too deep"));
        assert!(status("Completed", None).is_completed());
        assert!(status("CANCELLED", None).is_cancelled());
    }

    #[test]
    fn test_legacy_error_message() {
        let mut s = status("ERROR", None);
        s.error = Some(JobError {
            code: None,
            message: "calibration expired".into(),
        });
        assert!(s.is_failed());
        assert_eq!(s.error_message().as_deref(), Some("calibration expired"));
    }

    #[test]
    fn test_cloud_request_uses_pubs() {
        let body = sampler_request(
            "ibm_torino",
            vec!["OPENQASM 3.0;".into(), "OPENQASM 3.0; // b".into()],
            4096,
            true,
            None,
        );
        let pubs = body["params"]["pubs"].as_array().unwrap();
        assert_eq!(pubs.len(), 2);
        assert_eq!(pubs[1][0], "OPENQASM 3.0; // b");
        assert_eq!(pubs[1][2], 4096);
        assert_eq!(body["params"]["version"], 2);
        assert_eq!(body["params"]["options"]["dynamical_decoupling"]["enable"], false);
        assert!(body.get("hub").is_none());
    }

    #[test]
    fn test_legacy_request_skips_transpilation() {
        let body = sampler_request("ibm_kyiv", vec!["q".into()], 100, false, Some("hub/grp/prj"));
        assert_eq!(body["params"]["skip_transpilation"], true);
        assert_eq!(body["params"]["shots"], 100);
        assert_eq!(body["hub"], "hub/grp/prj");
    }

    #[test]
    fn test_backend_config_deserialization() {
        let json = r#"{
            "backend_name": "ibm_torino",
            "n_qubits": 133,
            "basis_gates": ["cz", "id", "rz", "sx", "x"],
            "max_experiments": 300,
            "dt": 2.2222222222222221e-10,
            "simulator": false
        }"#;
        let config: BackendConfigResponse = serde_json::from_str(json).unwrap();
        assert_eq!(config.n_qubits, 133);
        assert_eq!(config.max_experiments, Some(300));
        assert!((config.dt.unwrap() * 1e9 - 2.0 / 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_v2_results_deserialization() {
        let json = r#"{
            "results": [
                {"data": {"c": {"samples": ["0x0", "0x7"]}}, "metadata": {"version": 2}},
                {"data": {"c": {"samples": ["0x1"]}}}
            ]
        }"#;
        let response: JobResultResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.results.len(), 2);
        let data = response.results[0].data.as_ref().unwrap();
        assert_eq!(data["c"].samples, vec!["0x0", "0x7"]);
    }

    #[test]
    fn test_client_debug_redacts_token() {
        let client = IbmClient::new(LEGACY_ENDPOINT, "secret-token").unwrap();
        let debug = format!("{client:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("secret-token"));
        assert!(!client.is_cloud_api());
    }
}
