//! Declared dependencies from package manifests
//!
//! Every manifest found at the repository root contributes to one ordered
//! name → version map. Unreadable or malformed manifests are skipped with a
//! debug log; analysis never fails because of them.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

pub type Dependencies = BTreeMap<String, String>;

const ANY_VERSION: &str = "*";

pub fn parse_dependencies(root: &Path) -> Dependencies {
    let mut deps = Dependencies::new();

    let parsers: &[(&str, fn(&str, &mut Dependencies) -> Option<()>)] = &[
        ("package.json", parse_package_json),
        ("requirements.txt", parse_requirements),
        ("pyproject.toml", parse_pyproject),
        ("Cargo.toml", parse_cargo_toml),
        ("go.mod", parse_go_mod),
    ];

    for (file, parser) in parsers {
        let Ok(content) = fs::read_to_string(root.join(file)) else {
            continue;
        };
        if parser(&content, &mut deps).is_none() {
            debug!(manifest = file, "Skipping unparseable manifest");
        }
    }

    deps
}

fn parse_package_json(content: &str, deps: &mut Dependencies) -> Option<()> {
    let value: serde_json::Value = serde_json::from_str(content).ok()?;
    for section in ["dependencies", "devDependencies"] {
        if let Some(table) = value.get(section).and_then(|v| v.as_object()) {
            for (name, version) in table {
                let version = version.as_str().unwrap_or(ANY_VERSION);
                deps.insert(name.clone(), version.to_string());
            }
        }
    }
    Some(())
}

/// Splits a PEP 508 style requirement (`fastapi[all]>=0.100; python_version>"3.8"`)
/// into a lowercase name and its version specifier.
fn split_requirement(line: &str) -> Option<(String, String)> {
    let line = line.split('#').next()?.trim();
    if line.is_empty() || line.starts_with('-') {
        return None;
    }
    let line = line.split(';').next()?.trim();
    let name_end = line
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'))
        .unwrap_or(line.len());
    let name = line[..name_end].to_lowercase();
    if name.is_empty() {
        return None;
    }
    let mut rest = line[name_end..].trim();
    if rest.starts_with('[') {
        rest = rest.find(']').map(|i| rest[i + 1..].trim()).unwrap_or("");
    }
    let version = if rest.is_empty() { ANY_VERSION } else { rest };
    Some((name, version.to_string()))
}

fn parse_requirements(content: &str, deps: &mut Dependencies) -> Option<()> {
    for line in content.lines() {
        if let Some((name, version)) = split_requirement(line) {
            deps.insert(name, version);
        }
    }
    Some(())
}

fn toml_version(value: &toml::Value) -> String {
    match value {
        toml::Value::String(v) => v.clone(),
        toml::Value::Table(t) => t
            .get("version")
            .and_then(|v| v.as_str())
            .unwrap_or(ANY_VERSION)
            .to_string(),
        _ => ANY_VERSION.to_string(),
    }
}

fn parse_pyproject(content: &str, deps: &mut Dependencies) -> Option<()> {
    let value: toml::Value = content.parse().ok()?;

    if let Some(list) = value
        .get("project")
        .and_then(|p| p.get("dependencies"))
        .and_then(|d| d.as_array())
    {
        for requirement in list.iter().filter_map(|r| r.as_str()) {
            if let Some((name, version)) = split_requirement(requirement) {
                deps.insert(name, version);
            }
        }
    }

    if let Some(table) = value
        .get("tool")
        .and_then(|t| t.get("poetry"))
        .and_then(|p| p.get("dependencies"))
        .and_then(|d| d.as_table())
    {
        for (name, spec) in table {
            if name == "python" {
                continue;
            }
            deps.insert(name.to_lowercase(), toml_version(spec));
        }
    }
    Some(())
}

fn parse_cargo_toml(content: &str, deps: &mut Dependencies) -> Option<()> {
    let value: toml::Value = content.parse().ok()?;
    let table = value.get("dependencies").and_then(|d| d.as_table())?;
    for (name, spec) in table {
        deps.insert(name.clone(), toml_version(spec));
    }
    Some(())
}

fn parse_go_mod(content: &str, deps: &mut Dependencies) -> Option<()> {
    let mut in_block = false;
    for line in content.lines() {
        let line = line.split("//").next().unwrap_or("").trim();
        if in_block {
            if line == ")" {
                in_block = false;
                continue;
            }
            insert_go_requirement(line, deps);
        } else if line == "require (" || line == "require(" {
            in_block = true;
        } else if let Some(single) = line.strip_prefix("require ") {
            insert_go_requirement(single, deps);
        }
    }
    Some(())
}

fn insert_go_requirement(line: &str, deps: &mut Dependencies) {
    let mut parts = line.split_whitespace();
    if let (Some(module), Some(version)) = (parts.next(), parts.next()) {
        deps.insert(module.to_string(), version.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_package_json_merges_dev_dependencies() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"dependencies":{"react":"^18.2.0"},"devDependencies":{"vite":"^5.0.0"}}"#,
        )
        .unwrap();

        let deps = parse_dependencies(dir.path());
        assert_eq!(deps.get("react").map(String::as_str), Some("^18.2.0"));
        assert_eq!(deps.get("vite").map(String::as_str), Some("^5.0.0"));
    }

    #[test]
    fn test_requirements_txt() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("requirements.txt"),
            "# web\nFastAPI==0.110.0\nuvicorn[standard]>=0.29\n-r dev.txt\npydantic\n",
        )
        .unwrap();

        let deps = parse_dependencies(dir.path());
        assert_eq!(deps.get("fastapi").map(String::as_str), Some("==0.110.0"));
        assert_eq!(deps.get("uvicorn").map(String::as_str), Some(">=0.29"));
        assert_eq!(deps.get("pydantic").map(String::as_str), Some("*"));
        assert_eq!(deps.len(), 3);
    }

    #[test]
    fn test_pyproject_pep621_and_poetry() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("pyproject.toml"),
            r#"
[project]
name = "svc"
dependencies = ["flask>=3.0", "requests"]

[tool.poetry.dependencies]
python = "^3.11"
Django = { version = "^5.0" }
"#,
        )
        .unwrap();

        let deps = parse_dependencies(dir.path());
        assert_eq!(deps.get("flask").map(String::as_str), Some(">=3.0"));
        assert_eq!(deps.get("requests").map(String::as_str), Some("*"));
        assert_eq!(deps.get("django").map(String::as_str), Some("^5.0"));
        assert!(!deps.contains_key("python"));
    }

    #[test]
    fn test_cargo_toml() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("Cargo.toml"),
            "[package]\nname = \"x\"\n\n[dependencies]\naxum = \"0.7\"\ntokio = { version = \"1\", features = [\"full\"] }\n",
        )
        .unwrap();

        let deps = parse_dependencies(dir.path());
        assert_eq!(deps.get("axum").map(String::as_str), Some("0.7"));
        assert_eq!(deps.get("tokio").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_go_mod_block_and_single() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("go.mod"),
            "module example.com/api\n\ngo 1.22\n\nrequire github.com/google/uuid v1.6.0\n\nrequire (\n\tgithub.com/gin-gonic/gin v1.9.1 // indirect\n)\n",
        )
        .unwrap();

        let deps = parse_dependencies(dir.path());
        assert_eq!(
            deps.get("github.com/gin-gonic/gin").map(String::as_str),
            Some("v1.9.1")
        );
        assert_eq!(
            deps.get("github.com/google/uuid").map(String::as_str),
            Some("v1.6.0")
        );
    }

    #[test]
    fn test_malformed_manifest_is_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), "{ not json").unwrap();
        assert!(parse_dependencies(dir.path()).is_empty());
    }
}
