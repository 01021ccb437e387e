use super::AnalysisError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tokio::process::Command;
use tracing::debug;

/// Materializes a repository's working tree at `dest`
#[async_trait]
pub trait RepoFetcher: Send + Sync {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), AnalysisError>;
}

/// Shallow `git clone` through the system git binary
#[derive(Debug, Default, Clone)]
pub struct GitCloner;

#[async_trait]
impl RepoFetcher for GitCloner {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), AnalysisError> {
        debug!(repo = %url, dest = %dest.display(), "Cloning repository");
        let output = Command::new("git")
            .args(["clone", "--depth", "1", "--quiet", "--", url])
            .arg(dest)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .await
            .map_err(|e| AnalysisError::clone_failed(url, format!("failed to run git: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AnalysisError::clone_failed(url, stderr.trim().to_string()));
        }
        Ok(())
    }
}

/// Serves repositories from local directories, for tests and offline runs
#[derive(Debug, Default)]
pub struct LocalCloner {
    sources: Mutex<HashMap<String, PathBuf>>,
}

impl LocalCloner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `url` to a directory whose contents are copied on fetch
    pub fn with_repo(self, url: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        self.add_repo(url, source);
        self
    }

    pub fn add_repo(&self, url: impl Into<String>, source: impl Into<PathBuf>) {
        self.lock().insert(url.into(), source.into());
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, PathBuf>> {
        self.sources.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl RepoFetcher for LocalCloner {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<(), AnalysisError> {
        let source = self
            .lock()
            .get(url)
            .cloned()
            .ok_or_else(|| AnalysisError::clone_failed(url, "repository not found"))?;
        let dest = dest.to_path_buf();
        tokio::task::spawn_blocking(move || copy_dir(&source, &dest))
            .await
            .map_err(|e| AnalysisError::clone_failed(url, e.to_string()))?
            .map_err(|e| AnalysisError::clone_failed(url, e.to_string()))
    }
}

fn copy_dir(source: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
