//! Interface Matcher
//!
//! Reconciles outbound call sites from frontend-side repositories against
//! route declarations from backend-side repositories. Every call lands in
//! exactly one of `matched` or `missing_in_backend`; every declared route
//! is either listed in `matched` (possibly several times) or left in
//! `unused_in_backend`.

mod normalize;

pub use normalize::{normalize_path, segments_match, WILDCARD};

use crate::analysis::{ApiCall, RepoSummary};
use crate::enrichment::{with_enrichment, Enrichable, Enricher};
use serde::{Deserialize, Serialize};
use tracing::debug;

const MATCH_MAX_TOKENS: u32 = 800;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedCall {
    pub call: ApiCall,
    /// Normalized route template that satisfied the call
    pub route: String,
}

/// Where a missing-endpoint finding came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingOrigin {
    Static,
    Inferred,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingCall {
    #[serde(flatten)]
    pub call: ApiCall,
    pub origin: FindingOrigin,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub matched: Vec<MatchedCall>,
    pub missing_in_backend: Vec<MissingCall>,
    pub unused_in_backend: Vec<String>,
}

impl MatchResult {
    pub fn static_missing(&self) -> impl Iterator<Item = &ApiCall> {
        self.missing_in_backend
            .iter()
            .filter(|m| m.origin == FindingOrigin::Static)
            .map(|m| &m.call)
    }
}

/// Declared routes in stable order: repositories in input order, each
/// repository's routes in sorted order, duplicates (after normalization)
/// kept at their first position.
pub fn collect_routes(summaries: &[RepoSummary]) -> Vec<String> {
    let mut routes: Vec<String> = Vec::new();
    for summary in summaries.iter().filter(|s| s.provides_routes()) {
        for route in &summary.api_routes {
            let normalized = normalize_path(route);
            if !routes.contains(&normalized) {
                routes.push(normalized);
            }
        }
    }
    routes
}

/// Index of the route satisfying `path`: an exact normalized match first,
/// otherwise the first wildcard-compatible route
fn find_route(path: &str, routes: &[String]) -> Option<usize> {
    routes
        .iter()
        .position(|r| r == path)
        .or_else(|| routes.iter().position(|r| segments_match(path, r)))
}

pub fn match_interfaces(summaries: &[RepoSummary]) -> MatchResult {
    let routes = collect_routes(summaries);
    let mut used = vec![false; routes.len()];
    let mut result = MatchResult::default();

    let calls = summaries
        .iter()
        .filter(|s| s.provides_calls())
        .flat_map(|s| s.api_calls.iter());

    for call in calls {
        let path = normalize_path(&call.path);
        match find_route(&path, &routes) {
            Some(index) => {
                used[index] = true;
                result.matched.push(MatchedCall {
                    call: call.clone(),
                    route: routes[index].clone(),
                });
            }
            None => result.missing_in_backend.push(MissingCall {
                call: call.clone(),
                origin: FindingOrigin::Static,
            }),
        }
    }

    result.unused_in_backend = routes
        .into_iter()
        .zip(used)
        .filter(|(_, used)| !used)
        .map(|(route, _)| route)
        .collect();

    debug!(
        matched = result.matched.len(),
        missing = result.missing_in_backend.len(),
        unused = result.unused_in_backend.len(),
        "Interfaces matched"
    );
    result
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct InferredCall {
    pub method: String,
    pub path: String,
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchPatch {
    pub missing_in_backend: Vec<InferredCall>,
}

impl Enrichable for MatchResult {
    type Patch = MatchPatch;

    /// Appends inferred missing endpoints that are not already known
    fn merge(&mut self, patch: MatchPatch) {
        for inferred in patch.missing_in_backend {
            if !inferred.path.starts_with('/') {
                continue;
            }
            let normalized = normalize_path(&inferred.path);
            let known = self
                .matched
                .iter()
                .map(|m| &m.call)
                .chain(self.missing_in_backend.iter().map(|m| &m.call))
                .any(|c| normalize_path(&c.path) == normalized);
            if known {
                continue;
            }
            self.missing_in_backend.push(MissingCall {
                call: ApiCall {
                    method: inferred.method.to_uppercase(),
                    path: inferred.path,
                    source: crate::analysis::SourceLocation {
                        file: inferred.reason.unwrap_or_else(|| "inferred".to_string()),
                        line: 0,
                    },
                },
                origin: FindingOrigin::Inferred,
            });
        }
    }
}

fn match_prompt(summaries: &[RepoSummary], result: &MatchResult) -> String {
    let repos: Vec<serde_json::Value> = summaries
        .iter()
        .map(|s| {
            serde_json::json!({
                "url": s.url,
                "framework": s.framework,
                "purpose": s.purpose,
                "dataModels": s.data_models,
                "apiRoutes": s.api_routes,
            })
        })
        .collect();
    format!(
        "These repositories are being integrated:\n{}\n\nStatic matching result:\n{}\n\n\
         List backend endpoints the frontend will evidently need but that no backend declares \
         and that are not already listed. Reply with JSON: \
         {{\"missingInBackend\": [{{\"method\": \"GET\", \"path\": \"/...\", \"reason\": \"...\"}}]}}",
        serde_json::Value::Array(repos),
        serde_json::to_string(result).unwrap_or_default()
    )
}

/// Static matching followed by the optional inferred-findings pass
pub async fn match_with_enrichment(summaries: &[RepoSummary], enricher: &Enricher) -> MatchResult {
    let base = match_interfaces(summaries);
    with_enrichment("matching", base, |result| {
        let prompt = match_prompt(summaries, result);
        let enricher = enricher.clone();
        async move { enricher.query::<MatchPatch>(prompt, MATCH_MAX_TOKENS).await }
    })
    .await
}
