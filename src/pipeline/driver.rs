use super::progress::{LoggingHandler, ProgressEvent, ProgressHandler, Stage};
use crate::analysis::{RepoSummary, RepositoryAnalyzer};
use crate::enrichment::Enricher;
use crate::generate::{generate_with_enrichment, plan_integration, GeneratedArtifacts, IntegrationPlan};
use crate::matching::{match_with_enrichment, MatchResult};
use crate::publish::{PublishResult, Publisher};
use crate::validation::{
    build_report, effort_metrics, files_generated, validate_with_enrichment, EffortMetrics,
    IntegrationReport, ValidationResult,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("no repositories to process")]
    NoRepositories,

    #[error("none of the {attempted} repositories could be analyzed")]
    NothingAnalyzed { attempted: usize },

    #[error("publishing is not configured: set GITHUB_TOKEN")]
    PublishNotConfigured,

    #[error("pipeline task aborted: {0}")]
    Aborted(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    pub publish: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoFailure {
    pub url: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub repos: Vec<RepoSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_repos: Vec<RepoFailure>,
    pub matches: MatchResult,
    pub generated: GeneratedArtifacts,
    pub integration: IntegrationPlan,
    pub validation: ValidationResult,
    pub report: IntegrationReport,
    pub metrics: EffortMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish: Option<Vec<PublishResult>>,
    pub duration_ms: u64,
}

/// Whatever the stages produced before the run failed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialResults {
    pub repos: Vec<RepoSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_repos: Vec<RepoFailure>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineFailure {
    pub error: PipelineError,
    pub partial: PartialResults,
}

impl std::fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for PipelineFailure {}

/// Runs the stages in order and reports each step through a progress
/// handler. Every front-end (blocking, streaming, background) drives this.
pub struct PipelineDriver {
    analyzer: RepositoryAnalyzer,
    enricher: Enricher,
    publisher: Option<Arc<Publisher>>,
}

impl PipelineDriver {
    pub fn new(analyzer: RepositoryAnalyzer, enricher: Enricher) -> Self {
        Self {
            analyzer,
            enricher,
            publisher: None,
        }
    }

    pub fn with_publisher(mut self, publisher: Option<Arc<Publisher>>) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn analyzer(&self) -> &RepositoryAnalyzer {
        &self.analyzer
    }

    pub fn enricher(&self) -> &Enricher {
        &self.enricher
    }

    pub fn publisher(&self) -> Option<&Arc<Publisher>> {
        self.publisher.as_ref()
    }

    fn emit(&self, progress: &dyn ProgressHandler, event: ProgressEvent) {
        LoggingHandler.on_progress(&event);
        progress.on_progress(&event);
    }

    fn fail(
        &self,
        progress: &dyn ProgressHandler,
        error: PipelineError,
        partial: PartialResults,
    ) -> PipelineFailure {
        self.emit(
            progress,
            ProgressEvent::PipelineFailed {
                error: error.to_string(),
            },
        );
        PipelineFailure { error, partial }
    }

    /// Analyzes each URL in order; fetch failures are recorded and skipped
    pub async fn analyze_all(
        &self,
        urls: &[String],
        progress: &dyn ProgressHandler,
    ) -> (Vec<RepoSummary>, Vec<RepoFailure>) {
        let mut summaries = Vec::new();
        let mut failures = Vec::new();
        for url in urls {
            match self.analyzer.analyze(url).await {
                Ok(summary) => {
                    self.emit(
                        progress,
                        ProgressEvent::RepoAnalyzed {
                            url: url.clone(),
                            framework: summary.framework,
                            routes: summary.api_routes.len(),
                            calls: summary.api_calls.len(),
                        },
                    );
                    summaries.push(summary);
                }
                Err(e) => {
                    self.emit(
                        progress,
                        ProgressEvent::RepoFailed {
                            url: url.clone(),
                            error: e.to_string(),
                        },
                    );
                    failures.push(RepoFailure {
                        url: url.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        (summaries, failures)
    }

    pub async fn run(
        &self,
        urls: &[String],
        options: PipelineOptions,
        progress: &dyn ProgressHandler,
    ) -> Result<PipelineResult, PipelineFailure> {
        let start = Instant::now();

        if urls.is_empty() {
            return Err(self.fail(progress, PipelineError::NoRepositories, PartialResults::default()));
        }
        let publisher = match (options.publish, &self.publisher) {
            (true, None) => {
                let error = PipelineError::PublishNotConfigured;
                return Err(self.fail(progress, error, PartialResults::default()));
            }
            (true, Some(publisher)) => Some(publisher.clone()),
            (false, _) => None,
        };

        self.emit(progress, ProgressEvent::PipelineStarted { repos: urls.len() });

        self.emit(progress, ProgressEvent::StageStarted { stage: Stage::Analyze });
        let (repos, failed_repos) = self.analyze_all(urls, progress).await;
        if repos.is_empty() {
            let error = PipelineError::NothingAnalyzed {
                attempted: urls.len(),
            };
            let partial = PartialResults {
                repos,
                failed_repos,
            };
            return Err(self.fail(progress, error, partial));
        }

        self.emit(progress, ProgressEvent::StageStarted { stage: Stage::Match });
        let matches = match_with_enrichment(&repos, &self.enricher).await;
        self.emit(
            progress,
            ProgressEvent::InterfacesMatched {
                matched: matches.matched.len(),
                missing: matches.missing_in_backend.len(),
                unused: matches.unused_in_backend.len(),
            },
        );

        self.emit(progress, ProgressEvent::StageStarted { stage: Stage::Generate });
        let generated = generate_with_enrichment(&repos, &matches, &self.enricher).await;

        self.emit(progress, ProgressEvent::StageStarted { stage: Stage::Integrate });
        let integration = plan_integration(&repos);
        self.emit(
            progress,
            ProgressEvent::ArtifactsGenerated {
                files: files_generated(&generated, &integration),
            },
        );
        self.emit(
            progress,
            ProgressEvent::IntegrationPlanned {
                strategy: integration.strategy,
            },
        );

        self.emit(progress, ProgressEvent::StageStarted { stage: Stage::Validate });
        let validation = validate_with_enrichment(&repos, &generated, &self.enricher).await;
        self.emit(
            progress,
            ProgressEvent::ValidationComplete {
                status: validation.status,
                findings: validation.findings.len(),
            },
        );

        let publish = match publisher {
            Some(publisher) => {
                self.emit(progress, ProgressEvent::StageStarted { stage: Stage::Publish });
                let results = publisher.publish(&repos, &generated).await;
                for result in &results {
                    let event = match (&result.pr_url, &result.error) {
                        (Some(pr_url), None) => ProgressEvent::RepoPublished {
                            url: result.repo.clone(),
                            pr_url: pr_url.clone(),
                        },
                        (_, error) => ProgressEvent::PublishFailed {
                            url: result.repo.clone(),
                            error: error.clone().unwrap_or_else(|| "unknown error".to_string()),
                        },
                    };
                    self.emit(progress, event);
                }
                Some(results)
            }
            None => None,
        };

        let report = build_report(&repos, &matches, &generated, &integration, &validation);
        let duration_ms = start.elapsed().as_millis() as u64;
        let metrics = effort_metrics(
            &repos,
            &matches,
            &generated,
            &integration,
            &validation,
            duration_ms,
        );
        debug!(duration_ms, status = ?report.status, "Pipeline stages finished");

        self.emit(
            progress,
            ProgressEvent::PipelineCompleted {
                total_time: start.elapsed(),
            },
        );

        Ok(PipelineResult {
            repos,
            failed_repos,
            matches,
            generated,
            integration,
            validation,
            report,
            metrics,
            publish,
            duration_ms,
        })
    }
}
