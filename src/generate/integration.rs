//! Integration plan: env file, startup script, compose manifest and the
//! resulting project layout

use crate::analysis::{FrameworkId, LanguageId, RepoSummary, ServiceRole};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write;
use tracing::warn;

pub const FRONTEND_URL: &str = "http://localhost:3000";
pub const BACKEND_URL: &str = "http://localhost:8000";

/// Keys the integration itself writes to the env file
const INTEGRATION_KEYS: &[&str] = &["FRONTEND_URL", "BACKEND_URL", "FRONTEND_PORT", "BACKEND_PORT", "PORT"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    Monorepo,
    DockerCompose,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Monorepo => write!(f, "monorepo"),
            Strategy::DockerCompose => write!(f, "docker-compose"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationPlan {
    pub strategy: Strategy,
    pub env_file: String,
    pub startup_script: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_compose: Option<String>,
    pub project_structure: String,
}

impl IntegrationPlan {
    /// Files this plan writes into the integrated project
    pub fn file_names(&self) -> Vec<&'static str> {
        let mut names = vec![".env", ".env.example", "start.sh"];
        if self.docker_compose.is_some() {
            names.push("docker-compose.yml");
        }
        names
    }
}

/// A repository's place in the integrated deployment
#[derive(Debug, Clone, PartialEq)]
struct Service {
    name: String,
    role: ServiceRole,
    port: u16,
    port_key: String,
}

/// Unique service names and non-colliding ports.
///
/// The first frontend and first backend get `FRONTEND_PORT` and
/// `BACKEND_PORT`; further services of the same role count up from the
/// role's default port under a `<NAME>_PORT` key. Repositories of unknown
/// framework are placed in the backend range.
fn services(summaries: &[RepoSummary]) -> Vec<Service> {
    let mut services: Vec<Service> = Vec::new();
    let mut frontends = 0u16;
    let mut backends = 0u16;
    for summary in summaries {
        let base = summary.name().to_lowercase();
        let mut name = base.clone();
        let mut suffix = 2;
        while services.iter().any(|s| s.name == name) {
            name = format!("{}-{}", base, suffix);
            suffix += 1;
        }

        let role = summary.role().unwrap_or(ServiceRole::Backend);
        let (port, first) = match role {
            ServiceRole::Frontend => {
                frontends += 1;
                (3000 + frontends - 1, frontends == 1)
            }
            ServiceRole::Backend => {
                backends += 1;
                (8000 + backends - 1, backends == 1)
            }
        };
        let port_key = match (role, first) {
            (ServiceRole::Frontend, true) => "FRONTEND_PORT".to_string(),
            (ServiceRole::Backend, true) => "BACKEND_PORT".to_string(),
            _ => format!("{}_PORT", name.to_uppercase().replace(['-', '.'], "_")),
        };
        services.push(Service {
            name,
            role,
            port,
            port_key,
        });
    }
    services
}

pub fn env_file(summaries: &[RepoSummary]) -> String {
    let services = services(summaries);
    let mut out = String::from("# Generated .env file for integrated project\n\n");
    out.push_str("# Service URLs\n");
    let _ = writeln!(out, "FRONTEND_URL={}", FRONTEND_URL);
    let _ = writeln!(out, "BACKEND_URL={}", BACKEND_URL);

    out.push_str("\n# Ports\n");
    out.push_str("FRONTEND_PORT=3000\nBACKEND_PORT=8000\n");
    for service in services
        .iter()
        .filter(|s| s.port_key != "FRONTEND_PORT" && s.port_key != "BACKEND_PORT")
    {
        let _ = writeln!(out, "{}={}", service.port_key, service.port);
    }

    let mut keys: Vec<&str> = Vec::new();
    for key in summaries.iter().flat_map(|s| s.env_vars.iter()) {
        if !INTEGRATION_KEYS.contains(&key.as_str()) && !keys.contains(&key.as_str()) {
            keys.push(key);
        }
    }
    if !keys.is_empty() {
        out.push_str("\n# Application variables\n");
        for key in keys {
            let _ = writeln!(out, "{}=", key);
        }
    }
    out
}

#[derive(Debug, Serialize)]
struct ComposeFile {
    services: BTreeMap<String, ComposeService>,
}

#[derive(Debug, Serialize)]
struct ComposeService {
    build: String,
    ports: Vec<String>,
    env_file: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    depends_on: Vec<String>,
}

/// One service per repository; every frontend depends on every backend
pub fn compose_manifest(summaries: &[RepoSummary]) -> Option<String> {
    let services = services(summaries);
    let backends: Vec<String> = services
        .iter()
        .zip(summaries)
        .filter(|(_, summary)| summary.is_backend())
        .map(|(service, _)| service.name.clone())
        .collect();

    let compose = ComposeFile {
        services: services
            .iter()
            .zip(summaries)
            .map(|(service, summary)| {
                let depends_on = if summary.is_frontend() {
                    backends.clone()
                } else {
                    Vec::new()
                };
                let entry = ComposeService {
                    build: format!("./{}", service.name),
                    ports: vec![format!(
                        "${{{}:-{}}}:{}",
                        service.port_key, service.port, service.port
                    )],
                    env_file: vec![".env".to_string()],
                    depends_on,
                };
                (service.name.clone(), entry)
            })
            .collect(),
    };

    match serde_yaml::to_string(&compose) {
        Ok(yaml) => Some(yaml),
        Err(e) => {
            warn!(error = %e, "Failed to render compose manifest");
            None
        }
    }
}

fn run_commands(summary: &RepoSummary) -> (&'static str, &'static str) {
    match (summary.language, summary.framework) {
        (_, Some(FrameworkId::FastApi)) => (
            "pip install -r requirements.txt",
            "python -m uvicorn main:app --reload",
        ),
        (_, Some(FrameworkId::Flask)) => ("pip install -r requirements.txt", "flask run"),
        (_, Some(FrameworkId::Django)) => (
            "pip install -r requirements.txt",
            "python manage.py runserver",
        ),
        (Some(LanguageId::Python), _) => ("pip install -r requirements.txt", "python main.py"),
        (Some(LanguageId::Rust), _) => ("cargo build", "cargo run"),
        (Some(LanguageId::Go), _) => ("go mod download", "go run ."),
        _ => ("npm install", "npm run dev"),
    }
}

pub fn startup_script(summaries: &[RepoSummary], strategy: Strategy) -> String {
    let mut out = String::from("#!/bin/bash\nset -e\n\n");
    match strategy {
        Strategy::DockerCompose => {
            out.push_str("echo \"Starting integrated project...\"\n");
            out.push_str("docker compose up -d --build\n");
            let _ = writeln!(out, "echo \"Frontend: {}\"", FRONTEND_URL);
            let _ = writeln!(out, "echo \"Backend: {}\"", BACKEND_URL);
        }
        Strategy::Monorepo => {
            for (service, summary) in services(summaries).iter().zip(summaries) {
                let (install, run) = run_commands(summary);
                let _ = writeln!(out, "echo \"Starting {}...\"", service.name);
                let _ = writeln!(out, "(cd {} && {} && {}) &", service.name, install, run);
            }
            out.push_str("\nwait\n");
        }
    }
    out
}

pub fn project_structure(summaries: &[RepoSummary], strategy: Strategy) -> String {
    let mut lines = vec!["integrated-project/".to_string()];
    let mut files = vec![".env", ".env.example"];
    if strategy == Strategy::DockerCompose {
        files.push("docker-compose.yml");
    }
    files.extend(["start.sh", "README.md"]);
    for file in files {
        lines.push(format!("├── {}", file));
    }

    let services = services(summaries);
    for (i, service) in services.iter().enumerate() {
        let branch = if i + 1 == services.len() { "└──" } else { "├──" };
        lines.push(format!("{} {}/", branch, service.name));
    }
    lines.join("\n")
}

pub fn plan_integration(summaries: &[RepoSummary]) -> IntegrationPlan {
    let strategy = if summaries.len() > 1 {
        Strategy::DockerCompose
    } else {
        Strategy::Monorepo
    };
    IntegrationPlan {
        strategy,
        env_file: env_file(summaries),
        startup_script: startup_script(summaries, strategy),
        docker_compose: match strategy {
            Strategy::DockerCompose => compose_manifest(summaries),
            Strategy::Monorepo => None,
        },
        project_structure: project_structure(summaries, strategy),
    }
}
