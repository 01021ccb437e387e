//! Artifact Generator
//!
//! Deterministic templated glue derived from the analysis and match
//! results, with one optional enrichment pass that can only add notes.

mod client;
mod integration;
mod templates;

pub use client::{api_client, shared_types};
pub use integration::{
    compose_manifest, env_file, plan_integration, project_structure, startup_script,
    IntegrationPlan, Strategy, BACKEND_URL, FRONTEND_URL,
};
pub use templates::{cors_snippet, endpoint_stub, handler_name, FRONTEND_ORIGIN};

use crate::analysis::RepoSummary;
use crate::enrichment::{with_enrichment, Enrichable, Enricher};
use crate::matching::MatchResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Directory generated files are committed under
pub const ARTIFACT_DIR: &str = "repofuse";
pub const API_CLIENT_FILE: &str = "api-client.ts";
pub const SHARED_TYPES_FILE: &str = "shared-types.ts";
pub const CORS_SNIPPET_FILE: &str = "cors-snippet.txt";
pub const MISSING_ENDPOINTS_FILE: &str = "missing-endpoints.txt";

pub const MAX_ENDPOINT_STUBS: usize = 10;
const GENERATION_MAX_TOKENS: u32 = 600;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedArtifacts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_client: Option<String>,
    /// Snippets keyed by framework wire name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cors_config: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_endpoints: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_types: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_notes: Option<String>,
}

impl GeneratedArtifacts {
    /// Names of the files these artifacts are committed as
    pub fn file_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.api_client.is_some() {
            names.push(API_CLIENT_FILE);
        }
        if self.shared_types.is_some() {
            names.push(SHARED_TYPES_FILE);
        }
        if !self.cors_config.is_empty() {
            names.push(CORS_SNIPPET_FILE);
        }
        if self.missing_endpoints.is_some() {
            names.push(MISSING_ENDPOINTS_FILE);
        }
        names
    }

    pub fn fix_count(&self) -> usize {
        self.file_names().len()
    }

    /// Files that apply to one repository, by its role
    pub fn files_for(&self, summary: &RepoSummary) -> Vec<ArtifactFile> {
        let mut files = Vec::new();
        let path = |name: &str| format!("{}/{}", ARTIFACT_DIR, name);

        if summary.is_frontend() {
            if let Some(client) = &self.api_client {
                files.push(ArtifactFile::new(path(API_CLIENT_FILE), client));
            }
            if let Some(types) = &self.shared_types {
                files.push(ArtifactFile::new(path(SHARED_TYPES_FILE), types));
            }
        }
        if summary.is_backend() {
            let snippet = summary
                .framework
                .and_then(|f| self.cors_config.get(f.as_str()));
            if let Some(snippet) = snippet {
                files.push(ArtifactFile::new(path(CORS_SNIPPET_FILE), snippet));
            }
            if let Some(stubs) = &self.missing_endpoints {
                files.push(ArtifactFile::new(path(MISSING_ENDPOINTS_FILE), stubs));
            }
        }
        files
    }
}

/// One file to be committed to a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFile {
    pub path: String,
    pub content: String,
}

impl ArtifactFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

fn missing_endpoint_stubs(summaries: &[RepoSummary], matches: &MatchResult) -> Option<String> {
    let framework = summaries.iter().find(|s| s.is_backend())?.framework?;
    let mut seen: Vec<(String, String)> = Vec::new();
    for missing in &matches.missing_in_backend {
        let key = (missing.call.method.to_uppercase(), missing.call.path.clone());
        if !seen.contains(&key) {
            seen.push(key);
        }
        if seen.len() == MAX_ENDPOINT_STUBS {
            break;
        }
    }
    if seen.is_empty() {
        return None;
    }

    let mut out = format!(
        "Endpoints called by the frontend but not found in the backend ({}):\n",
        framework.name()
    );
    for (method, path) in &seen {
        out.push('\n');
        out.push_str(&endpoint_stub(framework, method, path));
    }
    Some(out)
}

/// Static generation over the analyzed set
pub fn generate_artifacts(summaries: &[RepoSummary], matches: &MatchResult) -> GeneratedArtifacts {
    let has_frontend = summaries.iter().any(|s| s.is_frontend());

    let mut cors_config = BTreeMap::new();
    for framework in summaries
        .iter()
        .filter(|s| s.is_backend())
        .filter_map(|s| s.framework)
    {
        if let Some(snippet) = cors_snippet(framework) {
            cors_config.insert(framework.as_str().to_string(), snippet);
        }
    }

    GeneratedArtifacts {
        api_client: if has_frontend {
            api_client(summaries, matches)
        } else {
            None
        },
        cors_config,
        missing_endpoints: missing_endpoint_stubs(summaries, matches),
        shared_types: if has_frontend {
            shared_types(summaries)
        } else {
            None
        },
        integration_notes: None,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationPatch {
    pub integration_notes: Option<String>,
}

impl Enrichable for GeneratedArtifacts {
    type Patch = GenerationPatch;

    fn merge(&mut self, patch: GenerationPatch) {
        if self.integration_notes.is_none() {
            self.integration_notes = patch
                .integration_notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty());
        }
    }
}

fn generation_prompt(summaries: &[RepoSummary], matches: &MatchResult) -> String {
    let repos: Vec<serde_json::Value> = summaries
        .iter()
        .map(|s| {
            serde_json::json!({
                "name": s.name(),
                "language": s.language,
                "framework": s.framework,
                "purpose": s.purpose,
                "envVars": s.env_vars,
            })
        })
        .collect();
    format!(
        "Write short integration notes (setup steps, pitfalls) for connecting these repositories:\n{}\n\n\
         Matched calls: {}, missing in backend: {}.\n\
         Reply with JSON: {{\"integrationNotes\": \"...\"}}",
        serde_json::Value::Array(repos),
        matches.matched.len(),
        matches.missing_in_backend.len()
    )
}

pub async fn generate_with_enrichment(
    summaries: &[RepoSummary],
    matches: &MatchResult,
    enricher: &Enricher,
) -> GeneratedArtifacts {
    let base = generate_artifacts(summaries, matches);
    with_enrichment("generation", base, |_| {
        let prompt = generation_prompt(summaries, matches);
        let enricher = enricher.clone();
        async move {
            enricher
                .query::<GenerationPatch>(prompt, GENERATION_MAX_TOKENS)
                .await
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ApiCall, FrameworkId, SourceLocation};
    use crate::llm::{MockLLMClient, MockResponse};
    use crate::matching::match_interfaces;
    use std::sync::Arc;

    fn web(paths: &[(&str, &str)]) -> RepoSummary {
        let mut s = RepoSummary::new("https://github.com/acme/web");
        s.framework = Some(FrameworkId::React);
        s.api_calls = paths
            .iter()
            .enumerate()
            .map(|(i, (method, path))| ApiCall {
                method: method.to_string(),
                path: path.to_string(),
                source: SourceLocation {
                    file: "src/api.js".to_string(),
                    line: i + 1,
                },
            })
            .collect();
        s
    }

    fn api() -> RepoSummary {
        let mut s = RepoSummary::new("https://github.com/acme/api");
        s.framework = Some(FrameworkId::Express);
        s.api_routes = ["/users".to_string()].into_iter().collect();
        s
    }

    #[test]
    fn test_generate_for_pair() {
        let summaries = [web(&[("GET", "/users"), ("POST", "/orders")]), api()];
        let matches = match_interfaces(&summaries);
        let artifacts = generate_artifacts(&summaries, &matches);

        assert!(artifacts.api_client.is_some());
        assert!(artifacts.cors_config.contains_key("express"));
        let stubs = artifacts.missing_endpoints.as_ref().unwrap();
        assert!(stubs.contains("app.post('/orders'"));
        assert_eq!(
            artifacts.file_names(),
            vec![API_CLIENT_FILE, SHARED_TYPES_FILE, CORS_SNIPPET_FILE, MISSING_ENDPOINTS_FILE]
        );
    }

    #[test]
    fn test_generation_is_deterministic() {
        let summaries = [web(&[("GET", "/users")]), api()];
        let matches = match_interfaces(&summaries);
        assert_eq!(
            generate_artifacts(&summaries, &matches),
            generate_artifacts(&summaries, &matches)
        );
    }

    #[test]
    fn test_missing_stubs_capped_and_unique() {
        let calls: Vec<(String, String)> = (0..15)
            .map(|i| ("GET".to_string(), format!("/missing{}", i)))
            .chain(std::iter::once(("GET".to_string(), "/missing0".to_string())))
            .collect();
        let refs: Vec<(&str, &str)> = calls.iter().map(|(m, p)| (m.as_str(), p.as_str())).collect();
        let summaries = [web(&refs), api()];
        let stubs = missing_endpoint_stubs(&summaries, &match_interfaces(&summaries)).unwrap();

        assert_eq!(stubs.matches("app.get(").count(), MAX_ENDPOINT_STUBS);
    }

    #[test]
    fn test_files_for_roles() {
        let summaries = [web(&[("GET", "/users")]), api()];
        let artifacts = generate_artifacts(&summaries, &match_interfaces(&summaries));

        let web_files: Vec<String> = artifacts.files_for(&summaries[0]).into_iter().map(|f| f.path).collect();
        assert_eq!(web_files, vec!["repofuse/api-client.ts", "repofuse/shared-types.ts"]);

        let api_files: Vec<String> = artifacts.files_for(&summaries[1]).into_iter().map(|f| f.path).collect();
        assert_eq!(api_files, vec!["repofuse/cors-snippet.txt"]);

        let tool = RepoSummary::new("https://github.com/acme/tool");
        assert!(artifacts.files_for(&tool).is_empty());
    }

    #[test]
    fn test_backend_only_gets_no_client() {
        let artifacts = generate_artifacts(&[api()], &MatchResult::default());
        assert!(artifacts.api_client.is_none());
        assert!(artifacts.shared_types.is_none());
        assert!(artifacts.missing_endpoints.is_none());
    }

    #[tokio::test]
    async fn test_enrichment_adds_notes_only() {
        let mock = Arc::new(MockLLMClient::new());
        mock.add_response(MockResponse::json(serde_json::json!({
            "integrationNotes": "Run the API before the web app.",
            "apiClient": "ignored"
        })));
        let summaries = [web(&[("GET", "/users")]), api()];
        let matches = match_interfaces(&summaries);

        let artifacts = generate_with_enrichment(&summaries, &matches, &Enricher::new(mock)).await;
        let base = generate_artifacts(&summaries, &matches);

        assert_eq!(artifacts.integration_notes.as_deref(), Some("Run the API before the web app."));
        assert_eq!(artifacts.api_client, base.api_client);
    }
}
