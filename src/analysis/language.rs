use std::path::Path;

crate::define_id_enum! {
    /// Primary language of a repository, decided from manifest files
    LanguageId {
        JavaScript => "javascript" : "JavaScript" | "js" | "node",
        TypeScript => "typescript" : "TypeScript" | "ts",
        Python => "python" : "Python" | "py",
        Rust => "rust" : "Rust" | "rs",
        Go => "go" : "Go" | "golang",
    }
}

const PYTHON_MANIFESTS: &[&str] = &["requirements.txt", "pyproject.toml", "setup.py", "Pipfile"];

impl LanguageId {
    pub fn is_node(&self) -> bool {
        matches!(self, LanguageId::JavaScript | LanguageId::TypeScript)
    }
}

/// Detects the language from manifest presence at the repository root.
///
/// `package.json` wins over the other manifests, so a Node project with a
/// helper `requirements.txt` is still reported as JavaScript/TypeScript.
pub fn detect_language(root: &Path) -> Option<LanguageId> {
    if root.join("package.json").is_file() {
        if root.join("tsconfig.json").is_file() {
            return Some(LanguageId::TypeScript);
        }
        return Some(LanguageId::JavaScript);
    }
    if PYTHON_MANIFESTS.iter().any(|m| root.join(m).is_file()) {
        return Some(LanguageId::Python);
    }
    if root.join("Cargo.toml").is_file() {
        return Some(LanguageId::Rust);
    }
    if root.join("go.mod").is_file() {
        return Some(LanguageId::Go);
    }
    None
}
