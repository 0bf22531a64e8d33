use crate::bundle::{Limits, DEFAULT_MAX_BUNDLE_BYTES, DEFAULT_MAX_DOCUMENT_BYTES};
use crate::error::{Result, SpecflowError};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_port() -> u16 {
    8000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_github_api_endpoint() -> String {
    "http://localhost:8510".to_string()
}

fn default_anthropic_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_summary_path() -> String {
    "openspec/IMPLEMENTATION.md".to_string()
}

fn default_task_agent_poll_secs() -> u64 {
    5
}

fn default_task_agent_timeout_secs() -> u64 {
    30 * 60
}

fn default_max_document_bytes() -> u64 {
    DEFAULT_MAX_DOCUMENT_BYTES
}

fn default_max_bundle_bytes() -> u64 {
    DEFAULT_MAX_BUNDLE_BYTES
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Server settings. Loaded from an optional YAML file, then overridden by
/// environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_github_api_endpoint")]
    pub github_api_endpoint: String,
    /// Empty means "no AI service": suggestions always use the fallback.
    #[serde(default)]
    pub anthropic_api_key: String,
    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,
    #[serde(default = "default_anthropic_base_url")]
    pub anthropic_base_url: String,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    /// Branch new feature branches are cut from and pull requests target.
    #[serde(default = "default_branch")]
    pub default_branch: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Repository path the generated summary is committed to.
    #[serde(default = "default_summary_path")]
    pub summary_path: String,
    /// Task agent service. Empty disables agent dispatch; generation then
    /// pushes the templated summary only.
    #[serde(default)]
    pub task_agent_endpoint: String,
    #[serde(default = "default_task_agent_poll_secs")]
    pub task_agent_poll_secs: u64,
    /// Upper bound on waiting for one agent task.
    #[serde(default = "default_task_agent_timeout_secs")]
    pub task_agent_timeout_secs: u64,
    /// Uncompressed cap on a single uploaded document.
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: u64,
    /// Uncompressed cap on all documents of one upload.
    #[serde(default = "default_max_bundle_bytes")]
    pub max_bundle_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            github_api_endpoint: default_github_api_endpoint(),
            anthropic_api_key: String::new(),
            anthropic_model: default_anthropic_model(),
            anthropic_base_url: default_anthropic_base_url(),
            cors_origins: default_cors_origins(),
            default_branch: default_branch(),
            request_timeout_secs: default_request_timeout_secs(),
            summary_path: default_summary_path(),
            task_agent_endpoint: String::new(),
            task_agent_poll_secs: default_task_agent_poll_secs(),
            task_agent_timeout_secs: default_task_agent_timeout_secs(),
            max_document_bytes: default_max_document_bytes(),
            max_bundle_bytes: default_max_bundle_bytes(),
        }
    }
}

impl Config {
    /// Read the YAML file at `path` (or start from defaults), apply
    /// environment overrides, and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// [`Config::load`] with an explicit variable lookup.
    pub fn load_with(path: Option<&Path>, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let data = std::fs::read_to_string(path)?;
                serde_yaml::from_str(&data)?
            }
            None => Config::default(),
        };
        config.apply_env(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (`std::env::var` in production).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = lookup("PORT") {
            self.port = port
                .parse()
                .map_err(|_| SpecflowError::Validation(format!("PORT '{port}' is not a port")))?;
        }
        if let Some(host) = lookup("SPECFLOW_HOST") {
            self.host = host;
        }
        if let Some(endpoint) = lookup("GITHUB_API_ENDPOINT") {
            self.github_api_endpoint = endpoint;
        }
        if let Some(key) = lookup("ANTHROPIC_API_KEY") {
            self.anthropic_api_key = key;
        }
        if let Some(model) = lookup("ANTHROPIC_MODEL") {
            self.anthropic_model = model;
        }
        if let Some(url) = lookup("ANTHROPIC_BASE_URL") {
            self.anthropic_base_url = url;
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            self.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(branch) = lookup("SPECFLOW_DEFAULT_BRANCH") {
            self.default_branch = branch;
        }
        if let Some(secs) = lookup("SPECFLOW_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = secs.parse().map_err(|_| {
                SpecflowError::Validation(format!(
                    "SPECFLOW_REQUEST_TIMEOUT_SECS '{secs}' is not a number"
                ))
            })?;
        }
        if let Some(endpoint) = lookup("CLAUDE_TASK_ENDPOINT") {
            self.task_agent_endpoint = endpoint;
        }
        if let Some(bytes) = lookup("SPECFLOW_MAX_DOCUMENT_BYTES") {
            self.max_document_bytes = parse_bytes("SPECFLOW_MAX_DOCUMENT_BYTES", &bytes)?;
        }
        if let Some(bytes) = lookup("SPECFLOW_MAX_BUNDLE_BYTES") {
            self.max_bundle_bytes = parse_bytes("SPECFLOW_MAX_BUNDLE_BYTES", &bytes)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.github_api_endpoint.trim().is_empty() {
            return Err(SpecflowError::Validation(
                "github_api_endpoint must not be empty".into(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(SpecflowError::Validation(
                "request_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.default_branch.trim().is_empty() {
            return Err(SpecflowError::Validation(
                "default_branch must not be empty".into(),
            ));
        }
        if self.summary_path.trim().is_empty() {
            return Err(SpecflowError::Validation(
                "summary_path must not be empty".into(),
            ));
        }
        if self.has_task_agent()
            && (self.task_agent_poll_secs == 0 || self.task_agent_timeout_secs == 0)
        {
            return Err(SpecflowError::Validation(
                "task agent poll and timeout must be greater than zero".into(),
            ));
        }
        if self.max_document_bytes == 0 || self.max_bundle_bytes == 0 {
            return Err(SpecflowError::Validation(
                "bundle size limits must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn has_task_agent(&self) -> bool {
        !self.task_agent_endpoint.trim().is_empty()
    }

    pub fn bundle_limits(&self) -> Limits {
        Limits {
            max_document_bytes: self.max_document_bytes,
            max_bundle_bytes: self.max_bundle_bytes,
        }
    }

    pub fn has_ai_key(&self) -> bool {
        !self.anthropic_api_key.trim().is_empty()
    }
}

fn parse_bytes(key: &str, value: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|_| SpecflowError::Validation(format!("{key} '{value}' is not a byte count")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
