use crate::analysis::{has_dependency, RepoSummary};
use crate::generate::{GeneratedArtifacts, CORS_SNIPPET_FILE};

/// Outcome of one rule against one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleViolation {
    pub message: String,
    pub remediation: String,
    /// Generated file that addresses the violation, if any
    pub fixed_by: Option<String>,
}

impl RuleViolation {
    fn new(message: impl Into<String>, remediation: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            remediation: remediation.into(),
            fixed_by: None,
        }
    }

    fn fixed_by(mut self, file: impl Into<String>) -> Self {
        self.fixed_by = Some(file.into());
        self
    }
}

pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, repo: &RepoSummary, artifacts: &GeneratedArtifacts) -> Option<RuleViolation>;
}

pub struct FrameworkDependencyRule;

impl ValidationRule for FrameworkDependencyRule {
    fn name(&self) -> &'static str {
        "FrameworkDependency"
    }

    fn check(&self, repo: &RepoSummary, _: &GeneratedArtifacts) -> Option<RuleViolation> {
        let framework = repo.framework?;
        let dependency = framework.dependency_name();
        if has_dependency(&repo.dependencies, dependency) {
            return None;
        }
        Some(RuleViolation::new(
            format!("Missing {} dependency", dependency),
            format!("Add {} to the project's dependency manifest", dependency),
        ))
    }
}

pub struct EntryPointRule;

impl ValidationRule for EntryPointRule {
    fn name(&self) -> &'static str {
        "EntryPoint"
    }

    fn check(&self, repo: &RepoSummary, _: &GeneratedArtifacts) -> Option<RuleViolation> {
        if !repo.entry_points.is_empty() {
            return None;
        }
        Some(RuleViolation::new(
            "No entry point found",
            "Add an entry file such as index.js, main.py or main.go, or point the start script at the existing one",
        ))
    }
}

pub struct EnvVarsRule;

impl ValidationRule for EnvVarsRule {
    fn name(&self) -> &'static str {
        "EnvVars"
    }

    fn check(&self, repo: &RepoSummary, _: &GeneratedArtifacts) -> Option<RuleViolation> {
        if repo.env_vars.is_empty() {
            return None;
        }
        Some(
            RuleViolation::new(
                format!("Requires env vars: {}", repo.env_vars.join(", ")),
                "Fill in the empty values in the generated .env file",
            )
            .fixed_by(".env"),
        )
    }
}

pub struct CorsRule;

impl ValidationRule for CorsRule {
    fn name(&self) -> &'static str {
        "Cors"
    }

    fn check(&self, repo: &RepoSummary, artifacts: &GeneratedArtifacts) -> Option<RuleViolation> {
        if !repo.is_backend() {
            return None;
        }
        let framework = repo.framework?;
        let package = framework.cors_package()?;
        if has_dependency(&repo.dependencies, package) {
            return None;
        }
        let violation = RuleViolation::new(
            format!("Missing {} package for cross-origin requests", package),
            format!("Install {} and apply the generated CORS snippet", package),
        );
        if artifacts.cors_config.contains_key(framework.as_str()) {
            Some(violation.fixed_by(CORS_SNIPPET_FILE))
        } else {
            Some(violation)
        }
    }
}

pub fn default_rules() -> Vec<Box<dyn ValidationRule>> {
    vec![
        Box::new(FrameworkDependencyRule),
        Box::new(EntryPointRule),
        Box::new(EnvVarsRule),
        Box::new(CorsRule),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::FrameworkId;

    fn express(deps: &[&str]) -> RepoSummary {
        let mut repo = RepoSummary::new("https://github.com/acme/api");
        repo.framework = Some(FrameworkId::Express);
        repo.entry_points = vec!["server.js".to_string()];
        repo.dependencies = deps
            .iter()
            .map(|d| (d.to_string(), "*".to_string()))
            .collect();
        repo
    }

    #[test]
    fn test_framework_dependency() {
        let artifacts = GeneratedArtifacts::default();
        assert!(FrameworkDependencyRule
            .check(&express(&["express"]), &artifacts)
            .is_none());
        let violation = FrameworkDependencyRule
            .check(&express(&[]), &artifacts)
            .unwrap();
        assert_eq!(violation.message, "Missing express dependency");
        assert!(violation.fixed_by.is_none());
    }

    #[test]
    fn test_entry_point() {
        let mut repo = express(&["express"]);
        assert!(EntryPointRule.check(&repo, &GeneratedArtifacts::default()).is_none());
        repo.entry_points.clear();
        let violation = EntryPointRule
            .check(&repo, &GeneratedArtifacts::default())
            .unwrap();
        assert_eq!(violation.message, "No entry point found");
    }

    #[test]
    fn test_env_vars_fixed_by_env_file() {
        let mut repo = express(&["express"]);
        repo.env_vars = vec!["DATABASE_URL".to_string(), "SECRET".to_string()];
        let violation = EnvVarsRule
            .check(&repo, &GeneratedArtifacts::default())
            .unwrap();
        assert_eq!(violation.message, "Requires env vars: DATABASE_URL, SECRET");
        assert_eq!(violation.fixed_by.as_deref(), Some(".env"));
    }

    #[test]
    fn test_cors() {
        let mut artifacts = GeneratedArtifacts::default();
        assert!(CorsRule
            .check(&express(&["express", "cors"]), &artifacts)
            .is_none());

        let unfixed = CorsRule.check(&express(&["express"]), &artifacts).unwrap();
        assert!(unfixed.fixed_by.is_none());

        artifacts
            .cors_config
            .insert("express".to_string(), "app.use(cors())".to_string());
        let fixed = CorsRule.check(&express(&["express"]), &artifacts).unwrap();
        assert_eq!(fixed.fixed_by.as_deref(), Some(CORS_SNIPPET_FILE));
    }

    #[test]
    fn test_cors_not_checked_for_frontends_or_builtin_support() {
        let mut web = RepoSummary::new("https://github.com/acme/web");
        web.framework = Some(FrameworkId::React);
        assert!(CorsRule.check(&web, &GeneratedArtifacts::default()).is_none());

        let mut nest = express(&["@nestjs/core"]);
        nest.framework = Some(FrameworkId::NestJs);
        assert!(CorsRule.check(&nest, &GeneratedArtifacts::default()).is_none());
    }
}
