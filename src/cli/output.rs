//! Output formatting for pipeline results
//!
//! JSON mirrors the HTTP response body; the human format is a short report
//! meant for terminals.

use anyhow::{Context, Result};
use std::fmt::Write;

use crate::matching::FindingOrigin;
use crate::pipeline::PipelineResult;

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Machine-readable, same shape as the HTTP API
    Json,
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self, result: &PipelineResult) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(result)
                .context("Failed to serialize pipeline result to JSON"),
            OutputFormat::Human => Ok(format_human(result)),
        }
    }
}

fn tree_line(out: &mut String, last: bool, text: &str) {
    let connector = if last { "\u{2514}" } else { "\u{251C}" };
    let _ = writeln!(out, "{}\u{2500} {}", connector, text);
}

fn format_human(result: &PipelineResult) -> String {
    let mut out = String::new();
    let report = &result.report;

    let _ = writeln!(out, "Integration Result: {:?}", report.status);
    let _ = writeln!(out, "{}\n", RULE);
    let _ = writeln!(out, "{}\n", report.summary);

    out.push_str("Repositories:\n");
    for (i, repo) in result.repos.iter().enumerate() {
        let framework = repo.framework.map(|f| f.name()).unwrap_or("unknown");
        let language = repo.language.map(|l| l.name()).unwrap_or("unknown");
        tree_line(
            &mut out,
            i + 1 == result.repos.len() && result.failed_repos.is_empty(),
            &format!(
                "{} ({}, {}): {} routes, {} calls",
                repo.url,
                language,
                framework,
                repo.api_routes.len(),
                repo.api_calls.len()
            ),
        );
    }
    for (i, failure) in result.failed_repos.iter().enumerate() {
        tree_line(
            &mut out,
            i + 1 == result.failed_repos.len(),
            &format!("{} skipped: {}", failure.url, failure.error),
        );
    }
    out.push('\n');

    let matches = &result.matches;
    let _ = writeln!(
        out,
        "Interfaces: {} matched, {} missing in backend, {} unused",
        matches.matched.len(),
        matches.missing_in_backend.len(),
        matches.unused_in_backend.len()
    );
    for matched in &matches.matched {
        let _ = writeln!(
            out,
            "  \u{2713} {} {} -> {}",
            matched.call.method, matched.call.path, matched.route
        );
    }
    for missing in &matches.missing_in_backend {
        let marker = match missing.origin {
            FindingOrigin::Inferred => " (inferred)",
            FindingOrigin::Static => "",
        };
        let _ = writeln!(
            out,
            "  \u{2717} {} {}{}",
            missing.call.method, missing.call.path, marker
        );
    }
    for route in &matches.unused_in_backend {
        let _ = writeln!(out, "  - {} (unused)", route);
    }
    out.push('\n');

    let _ = writeln!(out, "Integration strategy: {}", result.integration.strategy);
    out.push_str("Files generated:\n");
    for (i, file) in report.files_generated.iter().enumerate() {
        tree_line(&mut out, i + 1 == report.files_generated.len(), file);
    }
    out.push('\n');

    if !result.validation.findings.is_empty() {
        out.push_str("\u{26A0} Findings:\n");
        for finding in &result.validation.findings {
            let _ = writeln!(out, "  - {}: {}", finding.repo, finding.message);
            let _ = writeln!(out, "    {}", finding.remediation);
        }
        out.push('\n');
    }

    if let Some(published) = &result.publish {
        out.push_str("Pull requests:\n");
        for entry in published {
            match (&entry.pr_url, &entry.error) {
                (Some(pr), _) => {
                    let _ = writeln!(out, "  \u{2713} {} {}", entry.repo, pr);
                }
                (None, Some(error)) => {
                    let _ = writeln!(out, "  \u{2717} {} {}", entry.repo, error);
                }
                (None, None) => {
                    let _ = writeln!(out, "  - {}", entry.repo);
                }
            }
        }
        out.push('\n');
    }

    let savings = &result.metrics.cost_savings;
    let _ = writeln!(
        out,
        "Estimated savings: {:.1}h ({:.0} {})",
        savings.total_hours, savings.total_savings, savings.currency
    );
    let _ = writeln!(out, "\nProcessed in {}ms", result.duration_ms);
    out
}
