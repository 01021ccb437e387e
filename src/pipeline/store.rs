//! Store interfaces for jobs and registered repositories, with in-memory
//! implementations

use super::job::Job;
use crate::analysis::RepoSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use url::Url;

pub trait JobStore: Send + Sync {
    fn insert(&self, job: Job);

    /// Snapshot of the job
    fn get(&self, id: &str) -> Option<Job>;

    /// Snapshots, newest first
    fn list(&self) -> Vec<Job>;

    /// Applies `apply` to the stored job; `false` when it does not exist
    fn update(&self, id: &str, apply: &mut dyn FnMut(&mut Job)) -> bool;

    fn clear(&self);
}

#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: Mutex<Vec<Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Job>> {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl JobStore for InMemoryJobStore {
    fn insert(&self, job: Job) {
        self.lock().push(job);
    }

    fn get(&self, id: &str) -> Option<Job> {
        self.lock().iter().find(|j| j.id == id).cloned()
    }

    fn list(&self) -> Vec<Job> {
        self.lock().iter().rev().cloned().collect()
    }

    fn update(&self, id: &str, apply: &mut dyn FnMut(&mut Job)) -> bool {
        match self.lock().iter_mut().find(|j| j.id == id) {
            Some(job) => {
                apply(job);
                true
            }
            None => false,
        }
    }

    fn clear(&self) {
        self.lock().clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("invalid repository URL: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: String,
    pub url: String,
    pub added_at: DateTime<Utc>,
}

/// Stable id: the first 12 hex digits of the URL's SHA-256
pub fn registration_id(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    hex::encode(digest)[..12].to_string()
}

/// Trimmed URL when it is an http(s) URL with a host
pub fn validate_repo_url(url: &str) -> Result<String, RegistrationError> {
    let trimmed = url.trim();
    let invalid = || RegistrationError::InvalidUrl(url.to_string());
    let parsed = Url::parse(trimmed).map_err(|_| invalid())?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(invalid());
    }
    Ok(trimmed.to_string())
}

pub trait RepositoryStore: Send + Sync {
    /// Registers `url`, or returns the existing registration for it.
    /// The flag is `true` when a new registration was created.
    fn register(&self, url: &str) -> Result<(Registration, bool), RegistrationError>;

    /// Removes a registration along with its cached summary
    fn remove(&self, id: &str) -> Option<Registration>;

    /// Registrations in the order they were added
    fn list(&self) -> Vec<Registration>;

    fn urls(&self) -> Vec<String> {
        self.list().into_iter().map(|r| r.url).collect()
    }

    /// Caches the summary of a registered URL; unregistered URLs are ignored
    fn set_summary(&self, summary: RepoSummary);

    fn summary(&self, id: &str) -> Option<RepoSummary>;

    /// Cached summaries in registration order
    fn summaries(&self) -> Vec<RepoSummary>;

    fn clear(&self);
}

struct Entry {
    registration: Registration,
    summary: Option<RepoSummary>,
}

#[derive(Default)]
pub struct InMemoryRepositoryStore {
    entries: Mutex<Vec<Entry>>,
}

impl InMemoryRepositoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl RepositoryStore for InMemoryRepositoryStore {
    fn register(&self, url: &str) -> Result<(Registration, bool), RegistrationError> {
        let url = validate_repo_url(url)?;
        let mut entries = self.lock();
        if let Some(existing) = entries.iter().find(|e| e.registration.url == url) {
            return Ok((existing.registration.clone(), false));
        }
        let registration = Registration {
            id: registration_id(&url),
            url,
            added_at: Utc::now(),
        };
        entries.push(Entry {
            registration: registration.clone(),
            summary: None,
        });
        Ok((registration, true))
    }

    fn remove(&self, id: &str) -> Option<Registration> {
        let mut entries = self.lock();
        let index = entries.iter().position(|e| e.registration.id == id)?;
        Some(entries.remove(index).registration)
    }

    fn list(&self) -> Vec<Registration> {
        self.lock().iter().map(|e| e.registration.clone()).collect()
    }

    fn set_summary(&self, summary: RepoSummary) {
        if let Some(entry) = self
            .lock()
            .iter_mut()
            .find(|e| e.registration.url == summary.url)
        {
            entry.summary = Some(summary);
        }
    }

    fn summary(&self, id: &str) -> Option<RepoSummary> {
        self.lock()
            .iter()
            .find(|e| e.registration.id == id)
            .and_then(|e| e.summary.clone())
    }

    fn summaries(&self) -> Vec<RepoSummary> {
        self.lock().iter().filter_map(|e| e.summary.clone()).collect()
    }

    fn clear(&self) {
        self.lock().clear();
    }
}
