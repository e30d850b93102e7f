//! Gateway configuration

use induction_core::ServiceSettings;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::{GatewayError, DEFAULT_HOST, DEFAULT_PORT};

/// Main gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Origins allowed by CORS; empty means any origin
    pub cors_origins: Vec<String>,

    /// Grader configuration
    pub oracle: OracleSettings,

    /// JSONL file receiving one record per finished session
    pub session_log_path: String,

    /// Task table (JSON); built-in budgets when unset
    pub tasks_path: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            oracle: OracleSettings::default(),
            session_log_path: "logs/human_evaluations.jsonl".to_string(),
            tasks_path: None,
        }
    }
}

impl GatewayConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_session_log(mut self, path: impl Into<String>) -> Self {
        self.session_log_path = path.into();
        self
    }

    pub fn with_tasks(mut self, path: impl Into<String>) -> Self {
        self.tasks_path = Some(path.into());
        self
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> crate::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| GatewayError::InvalidConfig(format!("bad listen address: {}", e)))
    }

    /// Service tuning derived from the oracle section
    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            oracle_timeout: Duration::from_secs(self.oracle.timeout_secs),
            max_concurrent_gradings: self.oracle.max_concurrent,
        }
    }

    /// Load configuration from a file
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file(&self, path: &str) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Grader settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSettings {
    /// Chat-completions endpoint
    pub endpoint: String,

    /// Model id
    pub model: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    pub temperature: f64,

    pub max_tokens: u32,

    /// Upper bound on one grading call
    pub timeout_secs: u64,

    /// Grading calls allowed in flight at once
    pub max_concurrent: usize,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            endpoint: induction_core::oracle::llm::DEFAULT_ENDPOINT.to_string(),
            model: "google/gemini-2.5-flash".to_string(),
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            temperature: 0.0,
            max_tokens: 512,
            timeout_secs: 60,
            max_concurrent: 8,
        }
    }
}
