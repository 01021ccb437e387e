//! Shared fixtures: a React frontend calling `/users` and an Express backend
//! serving it, served through `LocalCloner`

#![allow(dead_code)]

use repofuse::analysis::{LocalCloner, RepositoryAnalyzer};
use repofuse::enrichment::Enricher;
use repofuse::pipeline::{InMemoryJobStore, InMemoryRepositoryStore, PipelineDriver, Scheduler};
use repofuse::publish::Publisher;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

pub const WEB_URL: &str = "https://github.com/acme/web";
pub const API_URL: &str = "https://github.com/acme/api";

pub struct Workspace {
    pub repos: TempDir,
    pub scratch: TempDir,
    pub cloner: Arc<LocalCloner>,
}

fn write(root: &Path, path: &str, content: &str) {
    let file = root.join(path);
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(file, content).unwrap();
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            repos: TempDir::new().unwrap(),
            scratch: TempDir::new().unwrap(),
            cloner: Arc::new(LocalCloner::new()),
        }
    }

    /// Frontend and backend agreeing on `GET /users`
    pub fn web_and_api() -> Self {
        let workspace = Self::new();
        workspace.add_repo(
            WEB_URL,
            &[
                ("package.json", r#"{"dependencies":{"react":"^18.2.0"}}"#),
                (
                    "src/App.jsx",
                    "export default function App() {\n  useEffect(() => { fetch('/users'); }, []);\n}\n",
                ),
            ],
        );
        workspace.add_repo(
            API_URL,
            &[
                (
                    "package.json",
                    r#"{"dependencies":{"express":"^4.18.0","cors":"^2.8.5"}}"#,
                ),
                (
                    "index.js",
                    "const app = require('express')();\napp.get('/users', (req, res) => res.json([]));\n",
                ),
            ],
        );
        workspace
    }

    pub fn add_repo(&self, url: &str, files: &[(&str, &str)]) {
        let name = url.rsplit('/').next().unwrap();
        let root = self.repos.path().join(name);
        for (path, content) in files {
            write(&root, path, content);
        }
        self.cloner.add_repo(url, root);
    }

    pub fn analyzer(&self) -> RepositoryAnalyzer {
        RepositoryAnalyzer::new(
            self.cloner.clone(),
            Enricher::disabled(),
            self.scratch.path().to_path_buf(),
        )
    }

    pub fn driver(&self, publisher: Option<Arc<Publisher>>) -> PipelineDriver {
        PipelineDriver::new(self.analyzer(), Enricher::disabled()).with_publisher(publisher)
    }

    pub fn scheduler(&self, publisher: Option<Arc<Publisher>>) -> Scheduler {
        Scheduler::new(
            Arc::new(self.driver(publisher)),
            Arc::new(InMemoryJobStore::new()),
            Arc::new(InMemoryRepositoryStore::new()),
        )
    }
}

pub fn urls(list: &[&str]) -> Vec<String> {
    list.iter().map(|u| u.to_string()).collect()
}
