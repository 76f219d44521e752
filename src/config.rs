//! Pipeline configuration.
//!
//! Loaded from TOML; every field has a default so an empty file (or no file)
//! is a valid configuration. Validation separates fatal errors from
//! warnings.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agent::{PollSettings, DEFAULT_BASE_URL};
use crate::credentials::CredentialSource;
use crate::error::{Error, Result};
use crate::github::DEFAULT_API_ROOT;

/// GitHub settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// REST API root.
    #[serde(default = "default_api_root")]
    pub api_root: String,
    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Where to read the token from.
    #[serde(default = "default_github_token")]
    pub token: CredentialSource,
}

fn default_api_root() -> String {
    DEFAULT_API_ROOT.to_string()
}

fn default_user_agent() -> String {
    concat!("preview-qa/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_github_token() -> CredentialSource {
    CredentialSource::Env("GITHUB_TOKEN".to_string())
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_root: default_api_root(),
            user_agent: default_user_agent(),
            token: default_github_token(),
        }
    }
}

/// Browser automation agent settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// API root of the automation service.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Where to read the API key from.
    #[serde(default = "default_agent_key")]
    pub api_key: CredentialSource,
    /// First delay between status polls, in milliseconds.
    #[serde(default = "default_poll_initial_ms")]
    pub poll_initial_ms: u64,
    /// Maximum delay between status polls, in milliseconds.
    #[serde(default = "default_poll_max_ms")]
    pub poll_max_ms: u64,
    /// How long to wait for a single task, in seconds.
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_agent_key() -> CredentialSource {
    CredentialSource::Env("BROWSER_USE_API_KEY".to_string())
}

fn default_poll_initial_ms() -> u64 {
    2_000
}

fn default_poll_max_ms() -> u64 {
    30_000
}

fn default_max_wait_secs() -> u64 {
    1800
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: default_agent_key(),
            poll_initial_ms: default_poll_initial_ms(),
            poll_max_ms: default_poll_max_ms(),
            max_wait_secs: default_max_wait_secs(),
        }
    }
}

impl AgentConfig {
    /// Polling settings for the agent client.
    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            initial: Duration::from_millis(self.poll_initial_ms),
            max: Duration::from_millis(self.poll_max_ms),
            max_wait: Duration::from_secs(self.max_wait_secs),
        }
    }
}

/// Test execution settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Maximum concurrently running test cases; unbounded when absent.
    #[serde(default)]
    pub max_parallel: Option<usize>,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
}

impl PipelineConfig {
    /// Parses configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Loads configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&text)
    }
}

/// Validation result containing all found issues.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// Fatal problems.
    pub errors: Vec<String>,
    /// Non-fatal problems.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Adds an error to the result.
    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Adds a warning to the result.
    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Merges another validation result into this one.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Converts to a Result, failing if there are errors.
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.is_valid() {
            Ok(self.warnings)
        } else {
            Err(Error::Config(self.errors.join("; ")))
        }
    }
}

/// Trait for validatable configuration types.
pub trait Validate {
    /// Validates the configuration and returns any issues found.
    fn validate(&self) -> ValidationResult;
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

impl Validate for GitHubConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if !is_http_url(&self.api_root) {
            result.add_error(format!(
                "github.api_root '{}' is not an HTTP(S) URL",
                self.api_root
            ));
        } else if self.api_root.starts_with("http://") {
            result.add_warning("github.api_root uses plain HTTP; the token is sent unencrypted");
        }

        if self.user_agent.trim().is_empty() {
            result.add_error("github.user_agent cannot be empty");
        }

        if let CredentialSource::Direct(_) = self.token {
            result.add_warning("github.token is inlined in the config file");
        }

        result
    }
}

impl Validate for AgentConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if !is_http_url(&self.base_url) {
            result.add_error(format!(
                "agent.base_url '{}' is not an HTTP(S) URL",
                self.base_url
            ));
        }

        if self.poll_initial_ms == 0 {
            result.add_error("agent.poll_initial_ms must be greater than zero");
        }

        if self.poll_initial_ms > self.poll_max_ms {
            result.add_error("agent.poll_initial_ms must not exceed agent.poll_max_ms");
        }

        if self.max_wait_secs == 0 {
            result.add_error("agent.max_wait_secs must be greater than zero");
        } else if self.max_wait_secs > 7200 {
            result.add_warning("agent.max_wait_secs over 2 hours may indicate a misconfiguration");
        }

        if let CredentialSource::Direct(_) = self.api_key {
            result.add_warning("agent.api_key is inlined in the config file");
        }

        result
    }
}

impl Validate for ExecutionConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();
        if self.max_parallel == Some(0) {
            result.add_error("execution.max_parallel must be at least 1");
        }
        result
    }
}

impl Validate for PipelineConfig {
    fn validate(&self) -> ValidationResult {
        let mut result = self.github.validate();
        result.merge(self.agent.validate());
        result.merge(self.execution.validate());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_toml_uses_defaults() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.github.api_root, "https://api.github.com");
        assert_eq!(
            config.github.token,
            CredentialSource::Env("GITHUB_TOKEN".to_string())
        );
        assert_eq!(
            config.agent.api_key,
            CredentialSource::Env("BROWSER_USE_API_KEY".to_string())
        );
        assert_eq!(config.execution.max_parallel, None);
    }

    #[test]
    fn config_deserializes_from_toml() {
        let toml = r#"
            [github]
            api_root = "https://ghe.example.com/api/v3"
            token = { file = "/run/secrets/gh" }

            [agent]
            base_url = "https://agent.example.com"
            max_wait_secs = 600

            [execution]
            max_parallel = 4
        "#;

        let config = PipelineConfig::from_toml(toml).unwrap();
        assert_eq!(config.github.api_root, "https://ghe.example.com/api/v3");
        assert_eq!(
            config.github.token,
            CredentialSource::File("/run/secrets/gh".to_string())
        );
        assert_eq!(config.agent.base_url, "https://agent.example.com");
        assert_eq!(config.agent.max_wait_secs, 600);
        assert_eq!(config.agent.poll_initial_ms, 2_000);
        assert_eq!(config.execution.max_parallel, Some(4));
    }

    #[test]
    fn load_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[execution]\nmax_parallel = 2").unwrap();
        let config = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(config.execution.max_parallel, Some(2));
    }

    #[test]
    fn malformed_toml_is_config_error() {
        let result = PipelineConfig::from_toml("[agent\nbase_url = 1");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn default_config_is_valid() {
        let result = PipelineConfig::default().validate();
        assert!(result.is_valid(), "errors: {:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn zero_parallelism_is_rejected() {
        let config = PipelineConfig {
            execution: ExecutionConfig {
                max_parallel: Some(0),
            },
            ..Default::default()
        };
        assert!(config.validate().into_result().is_err());
    }

    #[test]
    fn bad_urls_and_intervals_are_rejected() {
        let config = PipelineConfig {
            github: GitHubConfig {
                api_root: "ftp://example".to_string(),
                ..Default::default()
            },
            agent: AgentConfig {
                poll_initial_ms: 10_000,
                poll_max_ms: 1_000,
                ..Default::default()
            },
            ..Default::default()
        };
        let result = config.validate();
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn inline_credentials_warn() {
        let config = PipelineConfig {
            github: GitHubConfig {
                token: CredentialSource::Direct("x".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let warnings = config.validate().into_result().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("github.token"));
    }

    #[test]
    fn poll_settings_convert_units() {
        let poll = AgentConfig::default().poll_settings();
        assert_eq!(poll.initial, Duration::from_secs(2));
        assert_eq!(poll.max, Duration::from_secs(30));
        assert_eq!(poll.max_wait, Duration::from_secs(1800));
    }
}
