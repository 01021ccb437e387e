use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

crate::define_id_enum! {
    /// Web framework detected from declared dependencies
    FrameworkId {
        NextJs => "nextjs" : "Next.js" | "next",
        React => "react" : "React",
        Vue => "vue" : "Vue" | "vuejs",
        Angular => "angular" : "Angular",
        Svelte => "svelte" : "Svelte" | "sveltekit",
        Express => "express" : "Express" | "expressjs",
        Fastify => "fastify" : "Fastify",
        NestJs => "nestjs" : "NestJS" | "nest",
        Koa => "koa" : "Koa",
        FastApi => "fastapi" : "FastAPI",
        Flask => "flask" : "Flask",
        Django => "django" : "Django",
        Axum => "axum" : "Axum",
        ActixWeb => "actix-web" : "Actix Web" | "actix",
        Gin => "gin" : "Gin",
        Echo => "echo" : "Echo",
    }
}

/// Which side of an HTTP integration a repository sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceRole {
    Frontend,
    Backend,
}

/// Dependency name → framework, checked in order; the first declared
/// dependency found wins. Meta-frameworks come before the libraries they
/// embed (`next` before `react`).
const FRAMEWORK_TABLE: &[(&str, FrameworkId)] = &[
    ("next", FrameworkId::NextJs),
    ("@angular/core", FrameworkId::Angular),
    ("svelte", FrameworkId::Svelte),
    ("@sveltejs/kit", FrameworkId::Svelte),
    ("vue", FrameworkId::Vue),
    ("react", FrameworkId::React),
    ("@nestjs/core", FrameworkId::NestJs),
    ("express", FrameworkId::Express),
    ("fastify", FrameworkId::Fastify),
    ("koa", FrameworkId::Koa),
    ("fastapi", FrameworkId::FastApi),
    ("flask", FrameworkId::Flask),
    ("django", FrameworkId::Django),
    ("axum", FrameworkId::Axum),
    ("actix-web", FrameworkId::ActixWeb),
    ("github.com/gin-gonic/gin", FrameworkId::Gin),
    ("github.com/labstack/echo", FrameworkId::Echo),
];

impl FrameworkId {
    pub fn role(&self) -> ServiceRole {
        match self {
            FrameworkId::NextJs
            | FrameworkId::React
            | FrameworkId::Vue
            | FrameworkId::Angular
            | FrameworkId::Svelte => ServiceRole::Frontend,
            _ => ServiceRole::Backend,
        }
    }

    /// Dependency a project using this framework is expected to declare
    pub fn dependency_name(&self) -> &'static str {
        FRAMEWORK_TABLE
            .iter()
            .find(|(_, id)| id == self)
            .map(|(dep, _)| *dep)
            .unwrap_or_else(|| self.as_str())
    }

    /// Package that adds cross-origin support, `None` when the framework
    /// ships it built in (or is a frontend)
    pub fn cors_package(&self) -> Option<&'static str> {
        match self {
            FrameworkId::Express => Some("cors"),
            FrameworkId::Fastify => Some("@fastify/cors"),
            FrameworkId::Koa => Some("@koa/cors"),
            FrameworkId::Flask => Some("flask-cors"),
            FrameworkId::Django => Some("django-cors-headers"),
            FrameworkId::Axum => Some("tower-http"),
            FrameworkId::ActixWeb => Some("actix-cors"),
            FrameworkId::Gin => Some("github.com/gin-contrib/cors"),
            _ => None,
        }
    }

    /// Port the framework's dev server listens on by convention
    pub fn default_port(&self) -> u16 {
        match self.role() {
            ServiceRole::Frontend => 3000,
            ServiceRole::Backend => 8000,
        }
    }
}

/// Whether `dependencies` declares `name`, tolerating Go module major-version
/// suffixes (`github.com/labstack/echo/v4`)
pub fn has_dependency(dependencies: &BTreeMap<String, String>, name: &str) -> bool {
    dependencies.contains_key(name)
        || dependencies
            .keys()
            .any(|k| k.strip_prefix(name).is_some_and(|rest| rest.starts_with('/')))
}

/// Looks the declared dependencies up in the framework table
pub fn detect_framework(dependencies: &BTreeMap<String, String>) -> Option<FrameworkId> {
    FRAMEWORK_TABLE
        .iter()
        .find(|(dep, _)| has_dependency(dependencies, dep))
        .map(|(_, id)| *id)
}
