use super::rules::{default_rules, ValidationRule};
use super::{ValidationFinding, ValidationResult, ValidationStatus};
use crate::analysis::RepoSummary;
use crate::generate::GeneratedArtifacts;
use tracing::debug;

pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: Vec<Box<dyn ValidationRule>>) -> Self {
        Self { rules }
    }

    /// Runs every rule against every repository. Repository state is only
    /// read.
    pub fn validate(&self, repos: &[RepoSummary], artifacts: &GeneratedArtifacts) -> ValidationResult {
        let mut findings = Vec::new();
        for repo in repos {
            for rule in &self.rules {
                if let Some(violation) = rule.check(repo, artifacts) {
                    debug!(repo = %repo.url, rule = rule.name(), message = %violation.message, "Validation finding");
                    findings.push(ValidationFinding {
                        repo: repo.url.clone(),
                        rule: rule.name().to_string(),
                        message: violation.message,
                        remediation: violation.remediation,
                        fixed_by: violation.fixed_by,
                    });
                }
            }
        }

        let fixes: Vec<String> = findings
            .iter()
            .filter_map(|f| {
                f.fixed_by
                    .as_ref()
                    .map(|file| format!("{}: apply {} ({})", f.repo, file, f.message))
            })
            .collect();

        let mut result = ValidationResult {
            status: ValidationStatus::Success,
            findings,
            fixes,
        };
        result.status = result.classify();
        result
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}
