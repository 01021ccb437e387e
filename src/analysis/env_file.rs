use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Sample env files, in lookup order
pub const SAMPLE_ENV_FILES: &[&str] = &[".env.example", ".env.sample", ".env.template"];

/// Names declared in the first sample env file found at `root`.
///
/// Only keys are returned; values are never read past the `=`.
pub fn declared_env_vars(root: &Path) -> Vec<String> {
    SAMPLE_ENV_FILES
        .iter()
        .find_map(|name| fs::read_to_string(root.join(name)).ok())
        .map(|content| parse_env_names(&content))
        .unwrap_or_default()
}

pub fn parse_env_names(content: &str) -> Vec<String> {
    static NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let name_re =
        NAME_REGEX.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));
    let mut names: Vec<String> = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, _)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if name_re.is_match(key) && !names.iter().any(|n| n == key) {
            names.push(key.to_string());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_env_names() {
        let content = "# Database\nDATABASE_URL=postgres://localhost\n\nexport API_KEY=\nnot a var\nPORT = 8000\nDATABASE_URL=dup\n";
        assert_eq!(
            parse_env_names(content),
            vec!["DATABASE_URL", "API_KEY", "PORT"]
        );
    }

    #[test]
    fn test_invalid_keys_are_skipped() {
        assert!(parse_env_names("1BAD=x\nmy-key=y\n").is_empty());
    }

    #[test]
    fn test_declared_env_vars_prefers_example() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".env.sample"), "SAMPLE=1\n").unwrap();
        fs::write(dir.path().join(".env.example"), "EXAMPLE=1\n").unwrap();
        assert_eq!(declared_env_vars(dir.path()), vec!["EXAMPLE"]);
    }

    #[test]
    fn test_no_env_file() {
        let dir = TempDir::new().unwrap();
        assert!(declared_env_vars(dir.path()).is_empty());
    }
}
