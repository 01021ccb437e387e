//! Code-hosting service gateway
//!
//! The publish stage only needs a handful of hosting operations: look up a
//! repository, fork it, read and create branch refs, look up and write file
//! contents, and open a pull request. [`HostingApi`] captures exactly those so
//! the publisher can run against GitHub or the in-memory [`MockHosting`].

mod github;
mod mock;

pub use github::{GitHubClient, GITHUB_API_URL};
pub use mock::MockHosting;

use crate::util::retry::RateLimited;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum HostingError {
    /// Non-success HTTP status
    #[error("hosting API returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("hosting API rate limited")]
    RateLimited { retry_after: Option<Duration> },

    #[error("hosting API rate limit exceeded after {attempts} attempts")]
    RateLimitExceeded { attempts: u32 },

    #[error("hosting API request failed: {0}")]
    Transport(String),

    #[error("unexpected hosting API response: {0}")]
    Decode(String),
}

impl HostingError {
    /// The host refused a pull request because the base branch does not exist
    pub fn is_missing_base(&self) -> bool {
        match self {
            HostingError::Status { status, message } => {
                *status == 422 && message.to_lowercase().contains("base")
            }
            _ => false,
        }
    }
}

impl RateLimited for HostingError {
    fn is_rate_limited(&self) -> bool {
        matches!(self, HostingError::RateLimited { .. })
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            HostingError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    fn exhausted(attempts: u32) -> Self {
        HostingError::RateLimitExceeded { attempts }
    }
}

impl From<reqwest::Error> for HostingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            HostingError::Decode(err.to_string())
        } else {
            HostingError::Transport(err.to_string())
        }
    }
}

/// Repository metadata the publisher needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub full_name: String,
    pub html_url: String,
    pub default_branch: String,
}

#[derive(Debug, Clone)]
pub struct FileWrite {
    pub path: String,
    pub content: String,
    pub message: String,
    pub branch: String,
    /// Blob sha of the existing file; required by the host to update it
    pub sha: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PullRequestSpec {
    pub title: String,
    pub body: String,
    /// `owner:branch` of the fork
    pub head: String,
    pub base: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestInfo {
    pub html_url: String,
    pub number: u64,
}

#[async_trait]
pub trait HostingApi: Send + Sync {
    /// `Ok(None)` when the repository does not exist
    async fn get_repository(&self, full_name: &str) -> Result<Option<RepositoryInfo>, HostingError>;

    async fn create_fork(
        &self,
        owner: &str,
        repo: &str,
        organization: &str,
        fork_name: &str,
    ) -> Result<RepositoryInfo, HostingError>;

    async fn get_branch_sha(&self, full_name: &str, branch: &str) -> Result<String, HostingError>;

    async fn create_branch(
        &self,
        full_name: &str,
        branch: &str,
        sha: &str,
    ) -> Result<(), HostingError>;

    /// Blob sha of `path` on `branch`, `Ok(None)` when the file does not exist
    async fn get_file_sha(
        &self,
        full_name: &str,
        path: &str,
        branch: &str,
    ) -> Result<Option<String>, HostingError>;

    async fn put_file(&self, full_name: &str, file: FileWrite) -> Result<(), HostingError>;

    async fn create_pull_request(
        &self,
        full_name: &str,
        spec: PullRequestSpec,
    ) -> Result<PullRequestInfo, HostingError>;
}
