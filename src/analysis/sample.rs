use super::summary::RepoSummary;
use serde::Serialize;
use std::fs;
use std::path::Path;

pub const MAX_SAMPLE_FILES: usize = 8;
pub const MAX_SAMPLE_BYTES: usize = 4000;

const PRIORITY_FILES: &[&str] = &[
    "README.md",
    "package.json",
    "requirements.txt",
    "pyproject.toml",
    "Cargo.toml",
    "go.mod",
];

#[derive(Debug, Clone, Serialize)]
pub struct SampledFile {
    pub path: String,
    pub content: String,
}

/// Picks the files worth showing the completion service: manifests and
/// README first, then entry points, then files with detected call sites.
pub fn sample_key_files(root: &Path, summary: &RepoSummary) -> Vec<SampledFile> {
    let mut candidates: Vec<String> = PRIORITY_FILES.iter().map(|f| f.to_string()).collect();
    for entry in &summary.entry_points {
        candidates.push(entry.clone());
        candidates.push(format!("src/{}", entry));
    }
    for call in &summary.api_calls {
        candidates.push(call.source.file.clone());
    }

    let mut sampled: Vec<SampledFile> = Vec::new();
    for candidate in candidates {
        if sampled.len() >= MAX_SAMPLE_FILES {
            break;
        }
        if sampled.iter().any(|s| s.path == candidate) {
            continue;
        }
        let Ok(content) = fs::read_to_string(root.join(&candidate)) else {
            continue;
        };
        sampled.push(SampledFile {
            path: candidate,
            content: truncate(&content, MAX_SAMPLE_BYTES).to_string(),
        });
    }
    sampled
}

fn truncate(content: &str, max: usize) -> &str {
    if content.len() <= max {
        return content;
    }
    let mut end = max;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[..end]
}
