//! Configuration for the RCA pipeline.
//!
//! Loaded from /etc/ceph-rca/config.toml, a local ceph-rca.toml, or an
//! explicit path; every field has a default so a missing file still yields a
//! working configuration. The engine never reads the environment itself: the
//! API key is resolved by the transport from the variable named here.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::RcaError;

/// System-wide config file path.
pub const CONFIG_PATH: &str = "/etc/ceph-rca/config.toml";

/// Working-directory fallback path.
pub const LOCAL_CONFIG_PATH: &str = "ceph-rca.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RcaConfig {
    #[serde(default)]
    pub ceph: CephConfig,
    #[serde(default)]
    pub prometheus: PrometheusConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

/// How to reach `ceph -s` on this host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CephConfig {
    /// Wrap the status call in `cephadm shell --` (containerized deployments).
    #[serde(default = "default_ceph_cephadm")]
    pub cephadm: bool,

    /// Prepend `sudo` to the status call.
    #[serde(default)]
    pub sudo: bool,

    /// Whole-call timeout for the status command in seconds. `cephadm shell`
    /// can hang on a broken container runtime; this bounds the wait.
    #[serde(default = "default_ceph_status_timeout")]
    pub status_timeout_secs: u64,
}

fn default_ceph_cephadm() -> bool {
    true
}

fn default_ceph_status_timeout() -> u64 {
    30
}

impl Default for CephConfig {
    fn default() -> Self {
        Self {
            cephadm: default_ceph_cephadm(),
            sudo: false,
            status_timeout_secs: default_ceph_status_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrometheusConfig {
    /// Base URL of the Prometheus serving Ceph metrics.
    #[serde(default = "default_prometheus_base_url")]
    pub base_url: String,

    /// Per-query timeout in seconds.
    #[serde(default = "default_prometheus_timeout")]
    pub query_timeout_secs: u64,
}

fn default_prometheus_base_url() -> String {
    "http://localhost:9095".to_string()
}

fn default_prometheus_timeout() -> u64 {
    5
}

impl PrometheusConfig {
    /// Instant-query endpoint derived from the base URL.
    pub fn query_endpoint(&self) -> String {
        format!("{}/api/v1/query", self.base_url.trim_end_matches('/'))
    }
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            base_url: default_prometheus_base_url(),
            query_timeout_secs: default_prometheus_timeout(),
        }
    }
}

/// Text-generation collaborator settings (OpenAI-compatible API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Name of the environment variable holding the API key. The key itself
    /// never appears in config files.
    #[serde(default = "default_llm_api_key_env")]
    pub api_key_env: String,

    /// Whole-request timeout in seconds. The call is made once; there is no
    /// retry, so this bounds the narrative stage outright.
    #[serde(default = "default_llm_timeout")]
    pub request_timeout_secs: u64,

    /// Low temperature keeps the narrative close to the evidence.
    #[serde(default = "default_llm_temperature")]
    pub temperature: f64,
}

fn default_llm_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_llm_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_llm_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}

fn default_llm_timeout() -> u64 {
    30
}

fn default_llm_temperature() -> f64 {
    0.2
}

impl LlmConfig {
    /// Chat-completions endpoint derived from the base URL.
    pub fn chat_endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            api_key_env: default_llm_api_key_env(),
            request_timeout_secs: default_llm_timeout(),
            temperature: default_llm_temperature(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Directory report files are written into. Created on demand.
    #[serde(default = "default_report_output_dir")]
    pub output_dir: PathBuf,

    /// Write a report even when the cluster is healthy. Off by default: a
    /// healthy run normally ends with a verdict and no file.
    #[serde(default)]
    pub write_on_healthy: bool,
}

fn default_report_output_dir() -> PathBuf {
    PathBuf::from("reports")
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_report_output_dir(),
            write_on_healthy: false,
        }
    }
}

impl RcaConfig {
    /// Load config. An explicit path must exist and parse; without one, the
    /// system path and the local path are tried before falling back to
    /// defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, RcaError> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }
        Ok(Self::load_from_path(Path::new(CONFIG_PATH))
            .or_else(|_| Self::load_from_path(Path::new(LOCAL_CONFIG_PATH)))
            .unwrap_or_else(|e| {
                warn!("Config not found, using defaults: {}", e);
                RcaConfig::default()
            }))
    }

    fn load_from_path(path: &Path) -> Result<Self, RcaError> {
        let content = fs::read_to_string(path)?;
        let config: RcaConfig = toml::from_str(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
