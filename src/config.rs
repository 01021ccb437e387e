//! Configuration management for repofuse
//!
//! Settings are read from environment variables with fallback defaults.
//! Missing credentials never fail loading: without a completion key the
//! pipeline runs on static analysis only, and without a hosting token the
//! publish stage reports that it is not configured.
//!
//! # Environment Variables
//!
//! - `GROQ_API_KEY`: completion-service key - enables enrichment
//! - `GROQ_MODEL`: completion model - default: "llama-3.3-70b-versatile"
//! - `GITHUB_TOKEN`: hosting token - required only for publishing
//! - `GITHUB_ORG`: account that receives forks - default: "repofuse"
//! - `REPOFUSE_BIND`: HTTP listen address - default: "0.0.0.0:3000"
//! - `REPOFUSE_WORKSPACE`: clone directory - default: system temp dir + "repofuse-workspace"
//! - `REPOFUSE_REQUEST_TIMEOUT`: outbound request timeout in seconds - default: "60"
//! - `REPOFUSE_MAX_RETRIES`: attempts on rate-limited calls - default: "3"
//! - `REPOFUSE_FORK_SETTLE_MS`: wait after creating a fork - default: "3000"
//! - `REPOFUSE_LOG_LEVEL`: logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use repofuse::RepofuseConfig;
//!
//! let config = RepofuseConfig::default();
//! config.validate().expect("Invalid configuration");
//! let driver = config.build_driver().expect("driver");
//! ```

use crate::analysis::{GitCloner, RepositoryAnalyzer};
use crate::enrichment::Enricher;
use crate::hosting::{GitHubClient, HostingError};
use crate::llm::{BackendError, GenAIClient, LLMClient, RetryingClient};
use crate::pipeline::PipelineDriver;
use crate::publish::Publisher;
use crate::util::RetryPolicy;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_FORK_OWNER: &str = "repofuse";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_FORK_SETTLE_MS: u64 = 3000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Completion client initialization failed: {0}")]
    Completion(#[from] BackendError),

    #[error("Hosting client initialization failed: {0}")]
    Hosting(#[from] HostingError),
}

#[derive(Clone)]
pub struct RepofuseConfig {
    /// Completion-service key; `None` disables enrichment
    pub completion_api_key: Option<String>,

    pub model: String,

    /// Hosting token; `None` disables publishing
    pub hosting_token: Option<String>,

    /// Account or organization that receives forks
    pub fork_owner: String,

    pub bind_addr: String,

    /// Scratch directory for clones
    pub workspace_dir: PathBuf,

    pub request_timeout_secs: u64,

    /// Attempts on rate-limited calls, first attempt included
    pub max_retries: u32,

    pub fork_settle_ms: u64,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Default for RepofuseConfig {
    fn default() -> Self {
        let completion_api_key = non_empty_var("GROQ_API_KEY");
        let model = non_empty_var("GROQ_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let hosting_token = non_empty_var("GITHUB_TOKEN");
        let fork_owner =
            non_empty_var("GITHUB_ORG").unwrap_or_else(|| DEFAULT_FORK_OWNER.to_string());

        let bind_addr =
            non_empty_var("REPOFUSE_BIND").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let workspace_dir = non_empty_var("REPOFUSE_WORKSPACE")
            .map(PathBuf::from)
            .unwrap_or_else(|| env::temp_dir().join("repofuse-workspace"));

        let request_timeout_secs = env::var("REPOFUSE_REQUEST_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        let max_retries = env::var("REPOFUSE_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_RETRIES);

        let fork_settle_ms = env::var("REPOFUSE_FORK_SETTLE_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_FORK_SETTLE_MS);

        let log_level = env::var("REPOFUSE_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            completion_api_key,
            model,
            hosting_token,
            fork_owner,
            bind_addr,
            workspace_dir,
            request_timeout_secs,
            max_retries,
            fork_settle_ms,
            log_level,
        }
    }
}

impl RepofuseConfig {
    /// Checks numeric ranges and the log level
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout must be at least 1 second".to_string(),
            ));
        }
        if self.request_timeout_secs > 600 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout cannot exceed 10 minutes".to_string(),
            ));
        }

        if !(1..=10).contains(&self.max_retries) {
            return Err(ConfigError::ValidationFailed(format!(
                "Max retries must be between 1 and 10, got {}",
                self.max_retries
            )));
        }

        if self.fork_owner.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Fork owner cannot be empty".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_max_attempts(self.max_retries)
    }

    pub fn enrichment_enabled(&self) -> bool {
        self.completion_api_key.is_some()
    }

    pub fn publishing_enabled(&self) -> bool {
        self.hosting_token.is_some()
    }

    /// Rate-limit aware completion client, `None` when no key is set
    pub fn create_completion_client(&self) -> Result<Option<Arc<dyn LLMClient>>, ConfigError> {
        let Some(key) = &self.completion_api_key else {
            debug!("No completion key configured, enrichment disabled");
            return Ok(None);
        };
        let client = GenAIClient::new(
            key.clone(),
            self.model.clone(),
            None,
            self.request_timeout(),
        )?;
        let client: Arc<dyn LLMClient> =
            Arc::new(RetryingClient::new(Arc::new(client), self.retry_policy()));
        Ok(Some(client))
    }

    /// GitHub-backed publisher, `None` when no token is set
    pub fn create_publisher(&self) -> Result<Option<Arc<Publisher>>, ConfigError> {
        let Some(token) = &self.hosting_token else {
            debug!("No hosting token configured, publishing disabled");
            return Ok(None);
        };
        let api = GitHubClient::new(token.clone(), self.request_timeout(), self.retry_policy())?;
        let publisher = Publisher::new(Arc::new(api), self.fork_owner.clone())
            .with_settle_delay(Duration::from_millis(self.fork_settle_ms));
        Ok(Some(Arc::new(publisher)))
    }

    /// Wires the analyzer, enrichment and publisher into a pipeline driver
    pub fn build_driver(&self) -> Result<PipelineDriver, ConfigError> {
        let enricher = Enricher::from_option(self.create_completion_client()?);
        let analyzer = RepositoryAnalyzer::new(
            Arc::new(GitCloner),
            enricher.clone(),
            self.workspace_dir.clone(),
        );
        info!(
            enrichment = self.enrichment_enabled(),
            publishing = self.publishing_enabled(),
            workspace = %self.workspace_dir.display(),
            "Pipeline driver configured"
        );
        Ok(PipelineDriver::new(analyzer, enricher).with_publisher(self.create_publisher()?))
    }
}

fn present(value: &Option<String>) -> &'static str {
    if value.is_some() {
        "set"
    } else {
        "not set"
    }
}

// Credentials are reported as set or not set, never printed
impl fmt::Debug for RepofuseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepofuseConfig")
            .field("completion_api_key", &present(&self.completion_api_key))
            .field("model", &self.model)
            .field("hosting_token", &present(&self.hosting_token))
            .field("fork_owner", &self.fork_owner)
            .field("bind_addr", &self.bind_addr)
            .field("workspace_dir", &self.workspace_dir)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("fork_settle_ms", &self.fork_settle_ms)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl fmt::Display for RepofuseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Repofuse Configuration:")?;
        writeln!(f, "  Completion Key: {}", present(&self.completion_api_key))?;
        writeln!(f, "  Model: {}", self.model)?;
        writeln!(f, "  Hosting Token: {}", present(&self.hosting_token))?;
        writeln!(f, "  Fork Owner: {}", self.fork_owner)?;
        writeln!(f, "  Bind Address: {}", self.bind_addr)?;
        writeln!(f, "  Workspace: {}", self.workspace_dir.display())?;
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        writeln!(f, "  Max Retries: {}", self.max_retries)?;
        writeln!(f, "  Fork Settle Delay: {}ms", self.fork_settle_ms)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
