//! Progress events emitted while a pipeline runs

use crate::analysis::FrameworkId;
use crate::generate::Strategy;
use crate::validation::ValidationStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Success,
    Warning,
    Error,
}

impl LogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::Info => "info",
            LogKind::Success => "success",
            LogKind::Warning => "warning",
            LogKind::Error => "error",
        }
    }
}

/// One line of a job's log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub message: String,
    pub kind: LogKind,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(message: impl Into<String>, kind: LogKind) -> Self {
        Self {
            message: message.into(),
            kind,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Analyze,
    Match,
    Generate,
    Integrate,
    Validate,
    Publish,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Analyze => "analyze",
            Stage::Match => "match",
            Stage::Generate => "generate",
            Stage::Integrate => "integrate",
            Stage::Validate => "validate",
            Stage::Publish => "publish",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone)]
pub enum ProgressEvent {
    PipelineStarted {
        repos: usize,
    },

    StageStarted {
        stage: Stage,
    },

    RepoAnalyzed {
        url: String,
        framework: Option<FrameworkId>,
        routes: usize,
        calls: usize,
    },

    /// A repository could not be fetched; the run continues without it
    RepoFailed {
        url: String,
        error: String,
    },

    InterfacesMatched {
        matched: usize,
        missing: usize,
        unused: usize,
    },

    ArtifactsGenerated {
        files: Vec<String>,
    },

    IntegrationPlanned {
        strategy: Strategy,
    },

    ValidationComplete {
        status: ValidationStatus,
        findings: usize,
    },

    RepoPublished {
        url: String,
        pr_url: String,
    },

    PublishFailed {
        url: String,
        error: String,
    },

    PipelineCompleted {
        total_time: Duration,
    },

    PipelineFailed {
        error: String,
    },
}

impl ProgressEvent {
    pub fn kind(&self) -> LogKind {
        match self {
            ProgressEvent::PipelineStarted { .. }
            | ProgressEvent::StageStarted { .. }
            | ProgressEvent::InterfacesMatched { .. }
            | ProgressEvent::ArtifactsGenerated { .. }
            | ProgressEvent::IntegrationPlanned { .. } => LogKind::Info,
            ProgressEvent::RepoAnalyzed { .. }
            | ProgressEvent::RepoPublished { .. }
            | ProgressEvent::PipelineCompleted { .. } => LogKind::Success,
            ProgressEvent::RepoFailed { .. } | ProgressEvent::PublishFailed { .. } => {
                LogKind::Warning
            }
            ProgressEvent::ValidationComplete { status, .. } => match status {
                ValidationStatus::Success => LogKind::Success,
                ValidationStatus::Partial | ValidationStatus::Failed => LogKind::Warning,
            },
            ProgressEvent::PipelineFailed { .. } => LogKind::Error,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ProgressEvent::PipelineStarted { repos } => {
                format!("Starting pipeline for {} repositories", repos)
            }
            ProgressEvent::StageStarted { stage } => format!("Stage started: {}", stage),
            ProgressEvent::RepoAnalyzed {
                url,
                framework,
                routes,
                calls,
            } => format!(
                "Analyzed {} ({}): {} routes, {} outbound calls",
                url,
                framework.map(|f| f.as_str()).unwrap_or("unknown framework"),
                routes,
                calls
            ),
            ProgressEvent::RepoFailed { url, error } => format!("Skipping {}: {}", url, error),
            ProgressEvent::InterfacesMatched {
                matched,
                missing,
                unused,
            } => format!(
                "Matched {} calls, {} missing in backend, {} unused routes",
                matched, missing, unused
            ),
            ProgressEvent::ArtifactsGenerated { files } => {
                format!("Generated {} files: {}", files.len(), files.join(", "))
            }
            ProgressEvent::IntegrationPlanned { strategy } => {
                format!("Integration strategy: {}", strategy)
            }
            ProgressEvent::ValidationComplete { status, findings } => {
                format!("Validation {:?} with {} findings", status, findings).to_lowercase()
            }
            ProgressEvent::RepoPublished { url, pr_url } => {
                format!("Opened pull request for {}: {}", url, pr_url)
            }
            ProgressEvent::PublishFailed { url, error } => {
                format!("Publishing {} failed: {}", url, error)
            }
            ProgressEvent::PipelineCompleted { total_time } => {
                format!("Pipeline completed in {:.1}s", total_time.as_secs_f64())
            }
            ProgressEvent::PipelineFailed { error } => format!("Pipeline failed: {}", error),
        }
    }

    pub fn to_log_entry(&self) -> LogEntry {
        LogEntry::new(self.message(), self.kind())
    }
}

pub trait ProgressHandler: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Mirrors progress into tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::PipelineStarted { repos } => {
                info!(repos, "Pipeline started");
            }
            ProgressEvent::StageStarted { stage } => {
                debug!(stage = %stage, "Stage started");
            }
            ProgressEvent::RepoAnalyzed {
                url, routes, calls, ..
            } => {
                debug!(repo = %url, routes, calls, "Repository summary ready");
            }
            ProgressEvent::RepoFailed { url, error } => {
                warn!(repo = %url, error = %error, "Repository skipped");
            }
            ProgressEvent::InterfacesMatched {
                matched,
                missing,
                unused,
            } => {
                info!(matched, missing, unused, "Interfaces matched");
            }
            ProgressEvent::ArtifactsGenerated { files } => {
                info!(files = files.len(), "Artifacts generated");
            }
            ProgressEvent::IntegrationPlanned { strategy } => {
                debug!(strategy = %strategy, "Integration planned");
            }
            ProgressEvent::ValidationComplete { status, findings } => {
                info!(status = ?status, findings, "Validation complete");
            }
            ProgressEvent::RepoPublished { url, pr_url } => {
                info!(repo = %url, pr = %pr_url, "Repository published");
            }
            ProgressEvent::PublishFailed { url, error } => {
                warn!(repo = %url, error = %error, "Publish failed");
            }
            ProgressEvent::PipelineCompleted { total_time } => {
                info!(
                    duration_ms = total_time.as_millis() as u64,
                    "Pipeline completed"
                );
            }
            ProgressEvent::PipelineFailed { error: e } => {
                error!(error = %e, "Pipeline failed");
            }
        }
    }
}
