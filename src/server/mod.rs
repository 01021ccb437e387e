//! HTTP surface
//!
//! Repository registration, the individual pipeline stages, the three pipeline
//! front-ends (blocking, streaming and background jobs) and publishing. Stage
//! endpoints work over the registered set and keep their latest outputs in a
//! per-process session so later stages can build on earlier ones.

mod error;
mod handlers;

pub use error::ApiError;

use crate::config::{ConfigError, RepofuseConfig};
use crate::generate::GeneratedArtifacts;
use crate::matching::MatchResult;
use crate::pipeline::{
    InMemoryJobStore, InMemoryRepositoryStore, PipelineDriver, PipelineResult, RepositoryStore,
    Scheduler,
};
use anyhow::Context;
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Outputs of the most recent stage runs
#[derive(Debug, Default)]
pub struct Session {
    pub matches: Option<MatchResult>,
    pub artifacts: Option<GeneratedArtifacts>,
}

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Scheduler,
    session: Arc<Mutex<Session>>,
}

impl AppState {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            session: Arc::new(Mutex::new(Session::default())),
        }
    }

    /// In-memory stores around a driver built from `config`
    pub fn from_config(config: &RepofuseConfig) -> Result<Self, ConfigError> {
        let driver = config.build_driver()?;
        Ok(Self::new(Scheduler::new(
            Arc::new(driver),
            Arc::new(InMemoryJobStore::new()),
            Arc::new(InMemoryRepositoryStore::new()),
        )))
    }

    pub fn driver(&self) -> &PipelineDriver {
        self.scheduler.driver()
    }

    pub fn repos(&self) -> &Arc<dyn RepositoryStore> {
        self.scheduler.repositories()
    }

    pub fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn clear_session(&self) {
        *self.session() = Session::default();
    }

    /// Makes a full run's stage outputs the session's latest
    pub fn record(&self, result: &PipelineResult) {
        let mut session = self.session();
        session.matches = Some(result.matches.clone());
        session.artifacts = Some(result.generated.clone());
    }
}

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/repos", post(handlers::register_repo).get(handlers::list_repos))
        .route("/repos/{id}", delete(handlers::delete_repo))
        .route("/analyze", post(handlers::analyze))
        .route("/match", post(handlers::match_repos))
        .route("/generate", post(handlers::generate))
        .route("/integrate", post(handlers::integrate))
        .route("/validate", post(handlers::validate))
        .route("/apply", post(handlers::apply))
        .route("/run-all", post(handlers::run_all))
        .route("/run-all/stream", get(handlers::run_all_stream))
        .route("/jobs", post(handlers::submit_job).get(handlers::list_jobs))
        .route("/jobs/{id}", get(handlers::get_job))
        .route("/reset", post(handlers::reset));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the router on `bind` until Ctrl-C
pub async fn serve(state: AppState, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!(addr = %bind, "HTTP server listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        // without a signal handler the server runs until killed
        Err(_) => std::future::pending::<()>().await,
    }
}
