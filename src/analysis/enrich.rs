use super::framework::FrameworkId;
use super::language::LanguageId;
use super::sample::SampledFile;
use super::summary::RepoSummary;
use crate::enrichment::Enrichable;
use serde::Deserialize;

pub const ANALYSIS_MAX_TOKENS: u32 = 1024;

/// Fields the completion service may contribute to a summary
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisPatch {
    pub language: Option<String>,
    pub framework: Option<String>,
    pub entry_points: Vec<String>,
    pub env_vars: Vec<String>,
    pub purpose: Option<String>,
    #[serde(rename = "type")]
    pub repo_type: Option<String>,
    pub data_models: Vec<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Enrichable for RepoSummary {
    type Patch = AnalysisPatch;

    /// Fills gaps only. `purpose` and `type` are narrative fields static
    /// extraction never sets, so the patch always provides them.
    fn merge(&mut self, patch: AnalysisPatch) {
        if self.language.is_none() {
            self.language = patch.language.as_deref().and_then(LanguageId::from_name);
        }
        if self.framework.is_none() {
            self.framework = patch.framework.as_deref().and_then(FrameworkId::from_name);
        }
        if self.entry_points.is_empty() {
            self.entry_points = patch.entry_points;
        }
        if self.env_vars.is_empty() {
            self.env_vars = patch.env_vars;
        }
        if let Some(purpose) = non_blank(patch.purpose) {
            self.purpose = Some(purpose);
        }
        if let Some(repo_type) = non_blank(patch.repo_type) {
            self.repo_type = Some(repo_type);
        }
        if self.data_models.is_empty() {
            self.data_models = patch.data_models;
        }
    }
}

pub fn analysis_prompt(summary: &RepoSummary, samples: &[SampledFile]) -> String {
    let facts = serde_json::json!({
        "url": summary.url,
        "language": summary.language,
        "framework": summary.framework,
        "entryPoints": summary.entry_points,
        "apiRoutes": summary.api_routes,
        "envVars": summary.env_vars,
    });

    let mut prompt = format!(
        "Static analysis of a repository found these facts:\n{}\n\n\
         Key files follow. Reply with a JSON object with these keys: \
         \"purpose\" (one sentence), \"type\" (frontend, backend, fullstack, library or cli), \
         \"dataModels\" (names of the main domain entities), and, only if the facts above \
         leave them empty, \"language\", \"framework\", \"entryPoints\" and \"envVars\".\n",
        facts
    );
    for sample in samples {
        prompt.push_str(&format!("\n--- {} ---\n{}\n", sample.path, sample.content));
    }
    prompt
}
