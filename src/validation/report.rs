//! Integration report and effort estimates

use super::{ValidationResult, ValidationStatus};
use crate::analysis::RepoSummary;
use crate::generate::{GeneratedArtifacts, IntegrationPlan};
use crate::matching::MatchResult;
use serde::{Deserialize, Serialize};

pub const HOURLY_RATE_USD: f64 = 50.0;

const HOURS_PER_REPO: f64 = 2.0;
const INTEGRATION_HOURS: f64 = 4.0;
const CONFIG_HOURS: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationReport {
    pub status: ValidationStatus,
    pub repos_analyzed: usize,
    pub endpoints_matched: usize,
    pub endpoints_missing: usize,
    pub files_generated: Vec<String>,
    pub estimated_hours_saved: f64,
    pub summary: String,
}

fn framework_list(repos: &[RepoSummary]) -> String {
    repos
        .iter()
        .filter_map(|r| r.framework)
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(" + ")
}

pub fn files_generated(artifacts: &GeneratedArtifacts, plan: &IntegrationPlan) -> Vec<String> {
    plan.file_names()
        .into_iter()
        .chain(artifacts.file_names())
        .map(String::from)
        .collect()
}

pub fn build_report(
    repos: &[RepoSummary],
    matches: &MatchResult,
    artifacts: &GeneratedArtifacts,
    plan: &IntegrationPlan,
    validation: &ValidationResult,
) -> IntegrationReport {
    let hours = repos.len() as f64 * HOURS_PER_REPO + INTEGRATION_HOURS + CONFIG_HOURS;
    let frameworks = framework_list(repos);
    let summary = match validation.status {
        ValidationStatus::Success => format!(
            "Successfully integrated {} repositories ({}). Estimated {} hours of manual work automated.",
            repos.len(),
            frameworks,
            hours
        ),
        ValidationStatus::Partial => format!(
            "Partially integrated {} repositories ({}). Some manual fixes required. Estimated {} hours saved.",
            repos.len(),
            frameworks,
            hours
        ),
        ValidationStatus::Failed => format!(
            "Integration of {} repositories requires manual intervention. Review errors and apply suggested fixes.",
            repos.len()
        ),
    };

    IntegrationReport {
        status: validation.status,
        repos_analyzed: repos.len(),
        endpoints_matched: matches.matched.len(),
        endpoints_missing: matches.missing_in_backend.len(),
        files_generated: files_generated(artifacts, plan),
        estimated_hours_saved: hours,
        summary,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageHours {
    pub repo_analysis: f64,
    pub interface_matching: f64,
    pub code_generation: f64,
    pub integration: f64,
    pub validation: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostSavings {
    pub hourly_rate: f64,
    pub total_hours: f64,
    pub total_savings: f64,
    pub currency: String,
}

/// Manual-effort estimate for the work a pipeline run automated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffortMetrics {
    pub time_saved: StageHours,
    pub tasks_automated: Vec<String>,
    pub cost_savings: CostSavings,
    pub pipeline_duration_ms: u64,
    pub summary: String,
}

pub fn effort_metrics(
    repos: &[RepoSummary],
    matches: &MatchResult,
    artifacts: &GeneratedArtifacts,
    plan: &IntegrationPlan,
    validation: &ValidationResult,
    pipeline_duration_ms: u64,
) -> EffortMetrics {
    let generated = artifacts.file_names().len();
    let time_saved = {
        let repo_analysis = repos.len() as f64 * 1.5;
        let interface_matching = repos.len() as f64 * 2.0;
        let code_generation = generated as f64;
        let integration = 3.0;
        let validation = 2.0;
        StageHours {
            repo_analysis,
            interface_matching,
            code_generation,
            integration,
            validation,
            total: repo_analysis + interface_matching + code_generation + integration + validation,
        }
    };
    let total_hours = time_saved.total;

    let tasks_automated = vec![
        format!("Analyzed {} repositories", repos.len()),
        format!(
            "Detected {} frameworks",
            repos.iter().filter(|r| r.framework.is_some()).count()
        ),
        format!(
            "Extracted {} API routes",
            repos.iter().map(|r| r.api_routes.len()).sum::<usize>()
        ),
        format!("Found {} missing endpoints", matches.missing_in_backend.len()),
        format!("Generated {} code files", generated),
        format!("Created {} configuration", plan.strategy),
        format!(
            "Validated integration with {} issues found",
            validation.findings.len()
        ),
    ];

    EffortMetrics {
        time_saved,
        tasks_automated,
        cost_savings: CostSavings {
            hourly_rate: HOURLY_RATE_USD,
            total_hours,
            total_savings: total_hours * HOURLY_RATE_USD,
            currency: "USD".to_string(),
        },
        pipeline_duration_ms,
        summary: format!(
            "Automated integration of {} repositories saved approximately {} hours of manual work (${} at ${}/hr). Pipeline completed in {:.1} seconds.",
            repos.len(),
            total_hours,
            total_hours * HOURLY_RATE_USD,
            HOURLY_RATE_USD,
            pipeline_duration_ms as f64 / 1000.0
        ),
    }
}
