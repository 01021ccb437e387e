use super::framework::{FrameworkId, ServiceRole};
use super::language::LanguageId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: usize,
}

/// An outbound HTTP request found in source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApiCall {
    pub method: String,
    pub path: String,
    pub source: SourceLocation,
}

/// Structural facts about one analyzed repository
///
/// `purpose`, `repo_type` and `data_models` are only ever filled by
/// enrichment. A fresh summary is produced on every analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoSummary {
    pub url: String,
    pub language: Option<LanguageId>,
    pub framework: Option<FrameworkId>,
    pub entry_points: Vec<String>,
    pub api_routes: BTreeSet<String>,
    pub api_calls: Vec<ApiCall>,
    pub config_files: Vec<String>,
    pub env_vars: Vec<String>,
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub repo_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_models: Vec<String>,
}

impl RepoSummary {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            language: None,
            framework: None,
            entry_points: Vec::new(),
            api_routes: BTreeSet::new(),
            api_calls: Vec::new(),
            config_files: Vec::new(),
            env_vars: Vec::new(),
            dependencies: BTreeMap::new(),
            purpose: None,
            repo_type: None,
            data_models: Vec::new(),
        }
    }

    /// `None` when the framework is unknown
    pub fn role(&self) -> Option<ServiceRole> {
        self.framework.map(|f| f.role())
    }

    /// Repositories with an unknown framework count as both sides
    pub fn provides_calls(&self) -> bool {
        self.role() != Some(ServiceRole::Backend)
    }

    pub fn provides_routes(&self) -> bool {
        self.role() != Some(ServiceRole::Frontend)
    }

    pub fn is_frontend(&self) -> bool {
        self.role() == Some(ServiceRole::Frontend)
    }

    pub fn is_backend(&self) -> bool {
        self.role() == Some(ServiceRole::Backend)
    }

    /// Short name used for directories and compose services
    pub fn name(&self) -> String {
        repo_name(&self.url)
    }
}

/// Last path segment of a repository URL without `.git`
pub fn repo_name(url: &str) -> String {
    let name = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("")
        .trim_end_matches(".git");
    if name.is_empty() {
        "repo".to_string()
    } else {
        name.to_string()
    }
}
