//! Repository Analyzer
//!
//! Clones a repository into a scratch directory and extracts structural
//! facts from it: language, framework, entry points, route declarations,
//! outbound call sites, config files, declared env vars and dependencies.
//! Static extraction never fails; only fetching the repository can. The
//! static summary is optionally enriched and always survives enrichment
//! failure unchanged.

mod clone;
mod enrich;
mod env_file;
mod extract;
mod framework;
mod id_enum;
mod language;
mod manifest;
mod sample;
mod scanner;
mod summary;

pub use clone::{GitCloner, LocalCloner, RepoFetcher};
pub use enrich::{analysis_prompt, AnalysisPatch};
pub use env_file::{declared_env_vars, parse_env_names, SAMPLE_ENV_FILES};
pub use extract::{dedupe_calls, Extraction, Extractor};
pub use framework::{detect_framework, has_dependency, FrameworkId, ServiceRole};
pub use language::{detect_language, LanguageId};
pub use manifest::parse_dependencies;
pub use sample::{sample_key_files, SampledFile, MAX_SAMPLE_BYTES, MAX_SAMPLE_FILES};
pub use scanner::{source_files, SourceFile, SourceKind, EXCLUDED_DIRS};
pub use summary::{repo_name, ApiCall, RepoSummary, SourceLocation};

use crate::enrichment::{with_enrichment, Enricher};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Candidate entry files, searched at the root and under `src/`
pub const ENTRY_POINT_CANDIDATES: &[&str] = &[
    "index.js", "index.ts", "main.py", "app.py", "server.js", "server.ts", "main.rs", "main.go",
    "main.ts", "App.tsx", "App.jsx",
];

/// Root-level files reported as configuration
pub const CONFIG_FILE_NAMES: &[&str] = &[
    ".env.example",
    ".env.sample",
    ".env.template",
    "config.json",
    "config.yaml",
    "config.yml",
    "docker-compose.yml",
    "docker-compose.yaml",
    "Dockerfile",
];

#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    /// Repository unreachable or unauthorized
    #[error("failed to clone {url}: {message}")]
    Clone { url: String, message: String },
}

impl AnalysisError {
    pub fn clone_failed(url: &str, message: impl Into<String>) -> Self {
        AnalysisError::Clone {
            url: url.to_string(),
            message: message.into(),
        }
    }
}

pub struct RepositoryAnalyzer {
    fetcher: Arc<dyn RepoFetcher>,
    enricher: Enricher,
    workspace: PathBuf,
}

impl RepositoryAnalyzer {
    pub fn new(fetcher: Arc<dyn RepoFetcher>, enricher: Enricher, workspace: PathBuf) -> Self {
        Self {
            fetcher,
            enricher,
            workspace,
        }
    }

    /// Fetches `url`, extracts its summary and enriches it.
    ///
    /// The scratch checkout is removed before returning.
    pub async fn analyze(&self, url: &str) -> Result<RepoSummary, AnalysisError> {
        let start = Instant::now();
        let checkout = self.workspace.join(format!(
            "{}-{}",
            repo_name(url),
            &uuid::Uuid::new_v4().simple().to_string()[..8]
        ));

        fs::create_dir_all(&self.workspace).map_err(|e| {
            AnalysisError::clone_failed(url, format!("cannot create workspace: {}", e))
        })?;

        let fetched = self.fetcher.fetch(url, &checkout).await;
        if let Err(e) = fetched {
            remove_checkout(&checkout);
            return Err(e);
        }

        let root = checkout.clone();
        let owned_url = url.to_string();
        let scan = tokio::task::spawn_blocking(move || {
            let summary = analyze_path(&root, &owned_url);
            let samples = sample_key_files(&root, &summary);
            (summary, samples)
        })
        .await;
        remove_checkout(&checkout);

        let (summary, samples) = match scan {
            Ok(result) => result,
            Err(e) => {
                warn!(repo = %url, error = %e, "Static extraction task failed");
                (RepoSummary::new(url), Vec::new())
            }
        };

        let summary = with_enrichment("analysis", summary, |s| {
            let prompt = analysis_prompt(s, &samples);
            let enricher = self.enricher.clone();
            async move {
                enricher
                    .query::<AnalysisPatch>(prompt, enrich::ANALYSIS_MAX_TOKENS)
                    .await
            }
        })
        .await;

        info!(
            repo = %url,
            language = ?summary.language,
            framework = ?summary.framework,
            routes = summary.api_routes.len(),
            calls = summary.api_calls.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Repository analyzed"
        );
        Ok(summary)
    }
}

fn remove_checkout(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_dir_all(path) {
            warn!(path = %path.display(), error = %e, "Failed to remove checkout");
        }
    }
}

/// Static extraction over an already materialized working tree
pub fn analyze_path(root: &Path, url: &str) -> RepoSummary {
    let mut summary = RepoSummary::new(url);

    summary.language = detect_language(root);
    summary.dependencies = parse_dependencies(root);
    summary.framework = detect_framework(&summary.dependencies);
    summary.entry_points = find_entry_points(root);
    summary.config_files = find_config_files(root);
    summary.env_vars = declared_env_vars(root);

    let extractor = Extractor::new();
    let mut extraction = Extraction::default();
    let files = source_files(root);
    for file in &files {
        match fs::read_to_string(&file.absolute) {
            Ok(content) => extractor.extract(&file.relative, &content, file.kind, &mut extraction),
            Err(e) => debug!(path = %file.relative, error = %e, "Skipping unreadable file"),
        }
    }
    summary.api_routes = extraction.routes;
    summary.api_calls = dedupe_calls(extraction.calls);

    debug!(
        repo = %url,
        files = files.len(),
        routes = summary.api_routes.len(),
        calls = summary.api_calls.len(),
        "Static extraction complete"
    );
    summary
}

fn find_entry_points(root: &Path) -> Vec<String> {
    ENTRY_POINT_CANDIDATES
        .iter()
        .filter(|name| root.join(name).is_file() || root.join("src").join(name).is_file())
        .map(|name| name.to_string())
        .collect()
}

fn find_config_files(root: &Path) -> Vec<String> {
    let mut found: Vec<String> = CONFIG_FILE_NAMES
        .iter()
        .filter(|name| root.join(name).is_file())
        .map(|name| name.to_string())
        .collect();
    found.sort();
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{BackendError, MockLLMClient, MockResponse};
    use tempfile::TempDir;

    fn express_repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/routes")).unwrap();
        fs::write(
            root.join("package.json"),
            r#"{"dependencies":{"express":"^4.18.0"}}"#,
        )
        .unwrap();
        fs::write(root.join(".env.example"), "PORT=8000\nDATABASE_URL=\n").unwrap();
        fs::write(root.join("Dockerfile"), "FROM node:20").unwrap();
        fs::write(root.join("src/server.js"), "app.listen(8000)").unwrap();
        fs::write(
            root.join("src/routes/users.js"),
            "router.get('/users', list);\nrouter.get('/users/:id', one);\n",
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_analyze_path_express() {
        let repo = express_repo();
        let summary = analyze_path(repo.path(), "https://github.com/acme/api");

        assert_eq!(summary.language, Some(LanguageId::JavaScript));
        assert_eq!(summary.framework, Some(FrameworkId::Express));
        assert_eq!(summary.entry_points, vec!["server.js"]);
        assert_eq!(summary.config_files, vec![".env.example", "Dockerfile"]);
        assert_eq!(summary.env_vars, vec!["PORT", "DATABASE_URL"]);
        assert_eq!(
            summary.api_routes.iter().collect::<Vec<_>>(),
            vec!["/users", "/users/:id"]
        );
    }

    #[test]
    fn test_static_extraction_is_deterministic() {
        let repo = express_repo();
        let first = analyze_path(repo.path(), "https://github.com/acme/api");
        let second = analyze_path(repo.path(), "https://github.com/acme/api");
        assert_eq!(first.api_routes, second.api_routes);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_analyze_falls_back_when_enrichment_fails() {
        let repo = express_repo();
        let workspace = TempDir::new().unwrap();
        let cloner = LocalCloner::new().with_repo("https://github.com/acme/api", repo.path());
        let mock = Arc::new(MockLLMClient::new());
        mock.add_response(MockResponse::error(BackendError::ApiError {
            message: "unreachable".to_string(),
            status_code: None,
        }));

        let analyzer = RepositoryAnalyzer::new(
            Arc::new(cloner),
            Enricher::new(mock),
            workspace.path().to_path_buf(),
        );
        let summary = analyzer.analyze("https://github.com/acme/api").await.unwrap();

        assert_eq!(summary.language, Some(LanguageId::JavaScript));
        assert_eq!(summary.framework, Some(FrameworkId::Express));
        assert_eq!(summary.entry_points, vec!["server.js"]);
        assert!(summary.purpose.is_none());
    }

    #[tokio::test]
    async fn test_analyze_applies_enrichment_and_cleans_up() {
        let repo = express_repo();
        let workspace = TempDir::new().unwrap();
        let cloner = LocalCloner::new().with_repo("https://github.com/acme/api", repo.path());
        let mock = Arc::new(MockLLMClient::new());
        mock.add_response(MockResponse::json(serde_json::json!({
            "purpose": "User service",
            "type": "backend",
            "framework": "flask"
        })));

        let analyzer = RepositoryAnalyzer::new(
            Arc::new(cloner),
            Enricher::new(mock),
            workspace.path().to_path_buf(),
        );
        let summary = analyzer.analyze("https://github.com/acme/api").await.unwrap();

        assert_eq!(summary.purpose.as_deref(), Some("User service"));
        assert_eq!(summary.framework, Some(FrameworkId::Express));
        assert_eq!(fs::read_dir(workspace.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_clone_error() {
        let workspace = TempDir::new().unwrap();
        let analyzer = RepositoryAnalyzer::new(
            Arc::new(LocalCloner::new()),
            Enricher::disabled(),
            workspace.path().to_path_buf(),
        );
        let err = analyzer
            .analyze("https://github.com/acme/missing")
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Clone { .. }));
    }
}
