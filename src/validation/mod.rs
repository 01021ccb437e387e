//! Validator
//!
//! Structural checks over the analyzed repositories and the generated
//! artifacts. Findings are data, never errors.

mod report;
pub mod rules;
mod validator;

pub use report::{
    build_report, effort_metrics, files_generated, CostSavings, EffortMetrics, IntegrationReport,
    StageHours, HOURLY_RATE_USD,
};
pub use rules::{default_rules, RuleViolation, ValidationRule};
pub use validator::Validator;

use crate::analysis::RepoSummary;
use crate::enrichment::{with_enrichment, Enrichable, Enricher};
use crate::generate::GeneratedArtifacts;
use serde::{Deserialize, Serialize};

pub const MAX_ENRICHED_FIXES: usize = 5;
const FIXES_MAX_TOKENS: u32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Success,
    Partial,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationFinding {
    pub repo: String,
    pub rule: String,
    pub message: String,
    pub remediation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub status: ValidationStatus,
    pub findings: Vec<ValidationFinding>,
    pub fixes: Vec<String>,
}

impl ValidationResult {
    /// `success` without findings, `partial` when fixes cover the
    /// findings, `failed` otherwise
    pub fn classify(&self) -> ValidationStatus {
        if self.findings.is_empty() {
            ValidationStatus::Success
        } else if self.fixes.len() >= self.findings.len() {
            ValidationStatus::Partial
        } else {
            ValidationStatus::Failed
        }
    }

    pub fn success(&self) -> bool {
        self.status == ValidationStatus::Success
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FixesPatch {
    pub fixes: Vec<String>,
}

impl Enrichable for ValidationResult {
    type Patch = FixesPatch;

    /// Model-written fixes replace the fixed hints of the first findings.
    /// When there are any, they become the fix list the status counts.
    fn merge(&mut self, patch: FixesPatch) {
        let lines: Vec<String> = patch
            .fixes
            .iter()
            .flat_map(|f| f.lines())
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .take(MAX_ENRICHED_FIXES)
            .collect();
        for (finding, line) in self.findings.iter_mut().zip(&lines) {
            finding.remediation = line.clone();
        }
        if !lines.is_empty() {
            self.fixes = lines;
        }
        self.status = self.classify();
    }
}

fn fixes_prompt(result: &ValidationResult) -> String {
    let errors: Vec<String> = result
        .findings
        .iter()
        .map(|f| format!("{}: {}", f.repo, f.message))
        .collect();
    format!(
        "Given these integration errors: {}\n\
         Generate brief fix instructions, one line each, at most {}. \
         Reply with JSON: {{\"fixes\": [\"...\"]}}",
        errors.join("; "),
        MAX_ENRICHED_FIXES
    )
}

/// Static validation, with model-written fixes when there is anything to fix
pub async fn validate_with_enrichment(
    repos: &[RepoSummary],
    artifacts: &GeneratedArtifacts,
    enricher: &Enricher,
) -> ValidationResult {
    let base = Validator::new().validate(repos, artifacts);
    if base.findings.is_empty() {
        return base;
    }
    with_enrichment("validation", base, |result| {
        let prompt = fixes_prompt(result);
        let enricher = enricher.clone();
        async move { enricher.query::<FixesPatch>(prompt, FIXES_MAX_TOKENS).await }
    })
    .await
}
