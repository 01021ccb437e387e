//! Publisher
//!
//! Proposes the generated artifacts back to each source repository: fork
//! into the shared organization (reusing an existing fork), branch off the
//! fork's default branch, commit one file per artifact, then open a pull
//! request against the original repository. Repositories are processed
//! independently; one failing never stops the others.

mod repo_ref;

pub use repo_ref::RepoRef;

use crate::analysis::RepoSummary;
use crate::generate::{ArtifactFile, GeneratedArtifacts, ARTIFACT_DIR};
use crate::hosting::{FileWrite, HostingApi, HostingError, PullRequestInfo, PullRequestSpec, RepositoryInfo};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const PRIMARY_BASE_BRANCH: &str = "main";
pub const FALLBACK_BASE_BRANCH: &str = "master";
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(3);

const PR_TITLE: &str = "Add repofuse integration artifacts";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("invalid repository URL: {0}")]
    InvalidUrl(String),

    #[error("publishing is not configured: set GITHUB_TOKEN")]
    NotConfigured,

    #[error("no files could be committed")]
    NothingCommitted,

    #[error(transparent)]
    Hosting(#[from] HostingError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResult {
    pub repo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fork_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PublishResult {
    fn new(repo: &str) -> Self {
        Self {
            repo: repo.to_string(),
            fork_url: None,
            pr_url: None,
            error: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.pr_url.is_some() && self.error.is_none()
    }
}

/// Committed when no generated artifact applies to a repository
pub fn analysis_summary_file(summary: &RepoSummary) -> ArtifactFile {
    let or_unknown = |value: Option<&str>| value.unwrap_or("unknown").to_string();
    let mut body = format!(
        "# repofuse analysis\n\n\
         - Repository: {}\n\
         - Language: {}\n\
         - Framework: {}\n\
         - Entry points: {}\n\
         - Routes declared: {}\n\
         - Outbound calls: {}\n",
        summary.url,
        or_unknown(summary.language.map(|l| l.as_str())),
        or_unknown(summary.framework.map(|f| f.as_str())),
        if summary.entry_points.is_empty() {
            "none".to_string()
        } else {
            summary.entry_points.join(", ")
        },
        summary.api_routes.len(),
        summary.api_calls.len(),
    );
    if let Some(purpose) = &summary.purpose {
        body.push_str(&format!("\n{}\n", purpose));
    }
    ArtifactFile::new(format!("{}/ANALYSIS.md", ARTIFACT_DIR), body)
}

/// Branch names never repeat across runs
fn integration_branch() -> String {
    format!(
        "repofuse/integration-{}-{}",
        chrono::Utc::now().format("%Y%m%d%H%M%S"),
        &uuid::Uuid::new_v4().simple().to_string()[..8]
    )
}

fn pr_body(files: &[ArtifactFile]) -> String {
    let list: Vec<String> = files.iter().map(|f| format!("- `{}`", f.path)).collect();
    format!(
        "This pull request adds integration artifacts generated by repofuse.\n\n\
         Files:\n{}\n\nReview each file before merging; snippets are meant to be applied by hand.",
        list.join("\n")
    )
}

pub struct Publisher {
    api: Arc<dyn HostingApi>,
    fork_owner: String,
    settle_delay: Duration,
}

impl Publisher {
    pub fn new(api: Arc<dyn HostingApi>, fork_owner: impl Into<String>) -> Self {
        Self {
            api,
            fork_owner: fork_owner.into(),
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn fork_owner(&self) -> &str {
        &self.fork_owner
    }

    /// One result per input summary, in input order
    pub async fn publish(
        &self,
        summaries: &[RepoSummary],
        artifacts: &GeneratedArtifacts,
    ) -> Vec<PublishResult> {
        let mut results = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let mut result = PublishResult::new(&summary.url);
            match self.publish_repo(summary, artifacts, &mut result).await {
                Ok(pr) => {
                    info!(repo = %summary.url, pr = %pr.html_url, "Pull request opened");
                    result.pr_url = Some(pr.html_url);
                }
                Err(e) => {
                    warn!(repo = %summary.url, error = %e, "Publishing failed");
                    result.error = Some(e.to_string());
                }
            }
            results.push(result);
        }
        results
    }

    async fn publish_repo(
        &self,
        summary: &RepoSummary,
        artifacts: &GeneratedArtifacts,
        result: &mut PublishResult,
    ) -> Result<PullRequestInfo, PublishError> {
        let source = RepoRef::parse(&summary.url)?;
        let fork = self.ensure_fork(&source).await?;
        result.fork_url = Some(fork.html_url.clone());

        let base_sha = self
            .api
            .get_branch_sha(&fork.full_name, &fork.default_branch)
            .await?;
        let branch = integration_branch();
        self.api
            .create_branch(&fork.full_name, &branch, &base_sha)
            .await?;
        debug!(fork = %fork.full_name, branch = %branch, "Branch created");

        let mut files = artifacts.files_for(summary);
        if files.is_empty() {
            files.push(analysis_summary_file(summary));
        }
        let committed = self.commit_files(&fork.full_name, &branch, &files).await;
        if committed.is_empty() {
            return Err(PublishError::NothingCommitted);
        }

        let spec = PullRequestSpec {
            title: PR_TITLE.to_string(),
            body: pr_body(&committed),
            head: format!("{}:{}", self.head_owner(&fork), branch),
            base: PRIMARY_BASE_BRANCH.to_string(),
        };
        self.open_pull_request(&source.full_name(), spec).await
    }

    /// Account the fork actually lives in, which is not always the
    /// configured organization
    fn head_owner<'a>(&'a self, fork: &'a RepositoryInfo) -> &'a str {
        fork.full_name
            .split_once('/')
            .map(|(owner, _)| owner)
            .filter(|owner| !owner.is_empty())
            .unwrap_or(self.fork_owner.as_str())
    }

    /// Reuses `{org}/{owner}-{name}` when present, otherwise forks and
    /// waits for the host to settle
    async fn ensure_fork(&self, source: &RepoRef) -> Result<RepositoryInfo, PublishError> {
        let fork_full = format!("{}/{}", self.fork_owner, source.fork_name());
        if let Some(existing) = self.api.get_repository(&fork_full).await? {
            debug!(fork = %fork_full, "Reusing existing fork");
            return Ok(existing);
        }

        let fork = self
            .api
            .create_fork(&source.owner, &source.name, &self.fork_owner, &source.fork_name())
            .await?;
        info!(source = %source, fork = %fork.full_name, "Fork created");
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }
        Ok(fork)
    }

    /// Writes each file, creating or updating it; a failed write skips that
    /// file only
    async fn commit_files(
        &self,
        full_name: &str,
        branch: &str,
        files: &[ArtifactFile],
    ) -> Vec<ArtifactFile> {
        let mut committed = Vec::new();
        for file in files {
            match self.commit_file(full_name, branch, file).await {
                Ok(()) => committed.push(file.clone()),
                Err(e) => warn!(path = %file.path, error = %e, "Failed to commit file"),
            }
        }
        committed
    }

    async fn commit_file(
        &self,
        full_name: &str,
        branch: &str,
        file: &ArtifactFile,
    ) -> Result<(), HostingError> {
        let sha = self.api.get_file_sha(full_name, &file.path, branch).await?;
        let message = match sha {
            Some(_) => format!("Update {}", file.path),
            None => format!("Add {}", file.path),
        };
        self.api
            .put_file(
                full_name,
                FileWrite {
                    path: file.path.clone(),
                    content: file.content.clone(),
                    message,
                    branch: branch.to_string(),
                    sha,
                },
            )
            .await
    }

    async fn open_pull_request(
        &self,
        full_name: &str,
        spec: PullRequestSpec,
    ) -> Result<PullRequestInfo, PublishError> {
        match self.api.create_pull_request(full_name, spec.clone()).await {
            Ok(pr) => Ok(pr),
            Err(e) if e.is_missing_base() => {
                debug!(repo = %full_name, "Base branch missing, retrying against {}", FALLBACK_BASE_BRANCH);
                let retry = PullRequestSpec {
                    base: FALLBACK_BASE_BRANCH.to_string(),
                    ..spec
                };
                Ok(self.api.create_pull_request(full_name, retry).await?)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::FrameworkId;
    use crate::hosting::MockHosting;

    fn publisher(host: &Arc<MockHosting>) -> Publisher {
        Publisher::new(host.clone(), "repofuse").with_settle_delay(Duration::ZERO)
    }

    fn backend(url: &str) -> RepoSummary {
        let mut s = RepoSummary::new(url);
        s.framework = Some(FrameworkId::Express);
        s
    }

    fn artifacts() -> GeneratedArtifacts {
        let mut a = GeneratedArtifacts::default();
        a.cors_config
            .insert("express".to_string(), "app.use(cors())".to_string());
        a
    }

    #[tokio::test]
    async fn test_publish_happy_path() {
        let host = Arc::new(MockHosting::new());
        host.add_repository("acme/api", &["main"]);

        let results = publisher(&host)
            .publish(&[backend("https://github.com/acme/api")], &artifacts())
            .await;

        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert!(result.succeeded(), "{:?}", result);
        assert_eq!(result.fork_url.as_deref(), Some("https://github.com/repofuse/acme-api"));

        let pulls = host.pull_requests();
        assert_eq!(pulls.len(), 1);
        let (target, spec) = &pulls[0];
        assert_eq!(target, "acme/api");
        assert_eq!(spec.base, "main");
        assert!(spec.head.starts_with("repofuse:repofuse/integration-"));

        let branch = spec.head.trim_start_matches("repofuse:");
        assert_eq!(
            host.file("repofuse/acme-api", branch, "repofuse/cors-snippet.txt")
                .as_deref(),
            Some("app.use(cors())")
        );
    }

    #[tokio::test]
    async fn test_existing_fork_is_reused() {
        let host = Arc::new(MockHosting::new());
        host.add_repository("acme/api", &["main"]);
        host.add_repository("repofuse/acme-api", &["main"]);

        let results = publisher(&host)
            .publish(&[backend("https://github.com/acme/api")], &artifacts())
            .await;

        assert!(results[0].succeeded());
        assert_eq!(host.fork_calls(), 0);
    }

    #[tokio::test]
    async fn test_falls_back_to_master() {
        let host = Arc::new(MockHosting::new());
        host.add_repository("acme/legacy", &["master"]);

        let results = publisher(&host)
            .publish(&[backend("https://github.com/acme/legacy")], &artifacts())
            .await;

        assert!(results[0].succeeded(), "{:?}", results[0]);
        let pulls = host.pull_requests();
        assert_eq!(pulls.len(), 1);
        assert_eq!(pulls[0].1.base, "master");
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let host = Arc::new(MockHosting::new());
        host.add_repository("acme/api", &["main"]);
        host.add_repository("acme/locked", &["main"]);
        host.fail_forks_of("acme/locked");

        let summaries = [
            backend("not a url"),
            backend("https://github.com/acme/locked"),
            backend("https://github.com/acme/api"),
        ];
        let results = publisher(&host).publish(&summaries, &artifacts()).await;

        assert_eq!(results.len(), 3);
        assert!(results[0].error.as_deref().unwrap().contains("invalid repository URL"));
        assert!(results[1].fork_url.is_none());
        assert!(results[1].error.as_deref().unwrap().contains("403"));
        assert!(results[2].succeeded());
    }

    #[tokio::test]
    async fn test_empty_artifacts_commit_analysis_summary() {
        let host = Arc::new(MockHosting::new());
        host.add_repository("acme/tool", &["main"]);
        let tool = RepoSummary::new("https://github.com/acme/tool");

        let results = publisher(&host)
            .publish(&[tool], &GeneratedArtifacts::default())
            .await;

        assert!(results[0].succeeded());
        let (_, spec) = &host.pull_requests()[0];
        let branch = spec.head.trim_start_matches("repofuse:");
        let content = host
            .file("repofuse/acme-tool", branch, "repofuse/ANALYSIS.md")
            .unwrap();
        assert!(content.contains("- Repository: https://github.com/acme/tool"));
        assert!(content.contains("- Framework: unknown"));
    }

    #[tokio::test]
    async fn test_head_uses_fork_account() {
        let host = Arc::new(MockHosting::new());
        host.add_repository("acme/api", &["main"]);
        host.fork_into("octocat");

        let results = publisher(&host)
            .publish(&[backend("https://github.com/acme/api")], &artifacts())
            .await;

        assert!(results[0].succeeded(), "{:?}", results[0]);
        assert_eq!(results[0].fork_url.as_deref(), Some("https://github.com/octocat/acme-api"));
        let (_, spec) = &host.pull_requests()[0];
        assert!(spec.head.starts_with("octocat:repofuse/integration-"), "{}", spec.head);
    }

    #[test]
    fn test_branch_names_are_unique() {
        let a = integration_branch();
        let b = integration_branch();
        assert!(a.starts_with("repofuse/integration-"));
        assert_ne!(a, b);
    }
}
