use super::driver::{PartialResults, PipelineResult};
use super::progress::LogEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// One pipeline invocation.
///
/// Logs only grow, with non-decreasing timestamps. Once completed or failed
/// a job never changes again; every mutator reports whether it applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub repos: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub logs: Vec<LogEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Box<PipelineResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Stage outputs computed before a failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial: Option<Box<PartialResults>>,
}

impl Job {
    pub fn new(repos: Vec<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            status: JobStatus::Pending,
            repos,
            created_at: Utc::now(),
            completed_at: None,
            logs: Vec::new(),
            result: None,
            error: None,
            partial: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn start(&mut self) -> bool {
        if self.status != JobStatus::Pending {
            return false;
        }
        self.status = JobStatus::Running;
        true
    }

    /// Appends `entry`, clamping its timestamp to the previous entry's.
    /// Returns the entry as stored, `None` once the job is terminal.
    pub fn push_log(&mut self, mut entry: LogEntry) -> Option<LogEntry> {
        if self.is_terminal() {
            return None;
        }
        if let Some(last) = self.logs.last() {
            if entry.timestamp < last.timestamp {
                entry.timestamp = last.timestamp;
            }
        }
        self.logs.push(entry.clone());
        Some(entry)
    }

    pub fn complete(&mut self, result: PipelineResult) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = JobStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.result = Some(Box::new(result));
        true
    }

    pub fn fail(&mut self, error: impl Into<String>, partial: Option<PartialResults>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = JobStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.error = Some(error.into());
        self.partial = partial.map(Box::new);
        true
    }
}
