use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Dependency caches and build output that never hold first-party routes
pub const EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    "target",
    "vendor",
    "venv",
    ".venv",
    "__pycache__",
    "dist",
    "build",
    "out",
    "coverage",
    "site-packages",
];

const MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Source language of a single file, decided by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    JavaScript,
    Python,
    Rust,
    Go,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        match ext {
            "js" | "jsx" | "ts" | "tsx" | "mjs" | "cjs" | "vue" | "svelte" => {
                Some(SourceKind::JavaScript)
            }
            "py" => Some(SourceKind::Python),
            "rs" => Some(SourceKind::Rust),
            "go" => Some(SourceKind::Go),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the repository root, `/`-separated
    pub relative: String,
    pub absolute: PathBuf,
    pub kind: SourceKind,
}

/// Lists scannable source files under `root`, sorted by relative path so
/// extraction order is stable across runs.
pub fn source_files(root: &Path) -> Vec<SourceFile> {
    let mut files = Vec::new();

    let walker = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .filter_entry(|entry| {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            !(is_dir
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| EXCLUDED_DIRS.contains(&name)))
        })
        .build();

    for result in walker {
        let entry = match result {
            Ok(e) => e,
            Err(err) => {
                warn!(error = %err, "Failed to read directory entry");
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let Some(kind) = SourceKind::from_path(path) else {
            continue;
        };
        if entry
            .metadata()
            .map(|m| m.len() > MAX_FILE_SIZE)
            .unwrap_or(true)
        {
            debug!(path = %path.display(), "Skipping oversized or unreadable file");
            continue;
        }

        let relative = path
            .strip_prefix(root)
            .unwrap_or(path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        files.push(SourceFile {
            relative,
            absolute: path.to_path_buf(),
            kind,
        });
    }

    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_skips_hidden_and_dependency_dirs() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/routes")).unwrap();
        fs::create_dir_all(root.join("node_modules/express")).unwrap();
        fs::create_dir_all(root.join(".cache")).unwrap();
        fs::write(root.join("src/routes/users.js"), "").unwrap();
        fs::write(root.join("index.ts"), "").unwrap();
        fs::write(root.join("node_modules/express/index.js"), "").unwrap();
        fs::write(root.join(".cache/tmp.js"), "").unwrap();
        fs::write(root.join("README.md"), "").unwrap();

        let names: Vec<String> = source_files(root).into_iter().map(|f| f.relative).collect();
        assert_eq!(names, vec!["index.ts", "src/routes/users.js"]);
    }

    #[test]
    fn test_source_kind_from_extension() {
        assert_eq!(
            SourceKind::from_path(Path::new("App.tsx")),
            Some(SourceKind::JavaScript)
        );
        assert_eq!(
            SourceKind::from_path(Path::new("main.py")),
            Some(SourceKind::Python)
        );
        assert_eq!(SourceKind::from_path(Path::new("notes.txt")), None);
    }
}
