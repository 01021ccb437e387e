use super::error::ApiError;
use super::AppState;
use crate::analysis::RepoSummary;
use crate::generate::{
    generate_artifacts, generate_with_enrichment, plan_integration, GeneratedArtifacts,
    IntegrationPlan,
};
use crate::matching::{match_interfaces, match_with_enrichment, MatchResult};
use crate::pipeline::{
    Job, JobStatus, NoOpHandler, PipelineOptions, PipelineResult, Registration, RepoFailure,
    StreamEvent,
};
use crate::publish::{PublishError, PublishResult};
use crate::validation::{validate_with_enrichment, ValidationResult};
use axum::extract::{Path, Query, State};
use axum::extract::rejection::JsonRejection;
use axum::response::sse::{Event, KeepAlive, KeepAliveStream, Sse};
use axum::Json;
use chrono::Utc;
use futures_util::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::convert::Infallible;
use tracing::info;

type ApiResult<T> = Result<Json<T>, ApiError>;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "timestamp": Utc::now().to_rfc3339() }))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct RepoView {
    #[serde(flatten)]
    pub registration: Registration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<RepoSummary>,
}

pub async fn register_repo(
    State(state): State<AppState>,
    request: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<Registration> {
    let Json(request) = request?;
    let (registration, created) = state.repos().register(&request.url)?;
    if created {
        info!(repo = %registration.url, id = %registration.id, "Repository registered");
    }
    Ok(Json(registration))
}

pub async fn list_repos(State(state): State<AppState>) -> Json<Value> {
    let repos = state.repos();
    let views: Vec<RepoView> = repos
        .list()
        .into_iter()
        .map(|registration| RepoView {
            summary: repos.summary(&registration.id),
            registration,
        })
        .collect();
    Json(json!({ "repos": views }))
}

pub async fn delete_repo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let removed = state
        .repos()
        .remove(&id)
        .ok_or_else(|| ApiError::NotFound(format!("repository {} not found", id)))?;
    // stage outputs computed over the old set are stale now
    state.clear_session();
    info!(repo = %removed.url, "Repository removed");
    Ok(Json(json!({ "deleted": removed })))
}

fn require_urls(state: &AppState) -> Result<Vec<String>, ApiError> {
    let urls = state.repos().urls();
    if urls.is_empty() {
        return Err(ApiError::BadRequest(
            "No repositories registered".to_string(),
        ));
    }
    Ok(urls)
}

fn require_summaries(state: &AppState) -> Result<Vec<RepoSummary>, ApiError> {
    let summaries = state.repos().summaries();
    if summaries.is_empty() {
        return Err(ApiError::BadRequest(
            "Nothing analyzed yet; run analysis first".to_string(),
        ));
    }
    Ok(summaries)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub repos: Vec<RepoSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_repos: Vec<RepoFailure>,
}

pub async fn analyze(State(state): State<AppState>) -> ApiResult<AnalyzeResponse> {
    let urls = require_urls(&state)?;
    let (repos, failed_repos) = state.driver().analyze_all(&urls, &NoOpHandler).await;
    for summary in &repos {
        state.repos().set_summary(summary.clone());
    }
    state.clear_session();
    Ok(Json(AnalyzeResponse {
        repos,
        failed_repos,
    }))
}

pub async fn match_repos(State(state): State<AppState>) -> ApiResult<MatchResult> {
    let summaries = require_summaries(&state)?;
    let matches = match_with_enrichment(&summaries, state.driver().enricher()).await;
    state.session().matches = Some(matches.clone());
    Ok(Json(matches))
}

pub async fn generate(State(state): State<AppState>) -> ApiResult<GeneratedArtifacts> {
    let summaries = require_summaries(&state)?;
    let matches = state.session().matches.clone().ok_or_else(|| {
        ApiError::BadRequest("No match results yet; run matching first".to_string())
    })?;
    let artifacts = generate_with_enrichment(&summaries, &matches, state.driver().enricher()).await;
    state.session().artifacts = Some(artifacts.clone());
    Ok(Json(artifacts))
}

pub async fn integrate(State(state): State<AppState>) -> ApiResult<IntegrationPlan> {
    let summaries = require_summaries(&state)?;
    Ok(Json(plan_integration(&summaries)))
}

pub async fn validate(State(state): State<AppState>) -> ApiResult<ValidationResult> {
    let summaries = require_summaries(&state)?;
    let artifacts = state.session().artifacts.clone().ok_or_else(|| {
        ApiError::BadRequest("No generated artifacts yet; run generation first".to_string())
    })?;
    let validation =
        validate_with_enrichment(&summaries, &artifacts, state.driver().enricher()).await;
    Ok(Json(validation))
}

/// Publishes the latest analysis, generating artifacts statically when the
/// generate stage has not run
pub async fn apply(State(state): State<AppState>) -> ApiResult<Vec<PublishResult>> {
    let summaries = require_summaries(&state)?;
    let publisher = state
        .driver()
        .publisher()
        .cloned()
        .ok_or(PublishError::NotConfigured)?;
    let artifacts = state.session().artifacts.clone();
    let artifacts = artifacts
        .unwrap_or_else(|| generate_artifacts(&summaries, &match_interfaces(&summaries)));
    Ok(Json(publisher.publish(&summaries, &artifacts).await))
}

pub async fn run_all(
    State(state): State<AppState>,
    Query(options): Query<PipelineOptions>,
) -> ApiResult<PipelineResult> {
    let urls = state.repos().urls();
    let job = state.scheduler.run_blocking(urls, options).await?;
    match (job.status, job.result) {
        (JobStatus::Completed, Some(result)) => {
            state.record(&result);
            Ok(Json(*result))
        }
        _ => Err(ApiError::Internal(
            job.error
                .unwrap_or_else(|| format!("job {} did not complete", job.id)),
        )),
    }
}

fn json_event<T: Serialize>(name: &str, value: &T) -> Event {
    Event::default()
        .event(name)
        .json_data(value)
        .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}

fn error_event(message: &str) -> Event {
    json_event("error", &json!({ "error": message }))
}

pub async fn run_all_stream(
    State(state): State<AppState>,
    Query(options): Query<PipelineOptions>,
) -> Sse<KeepAliveStream<BoxStream<'static, Result<Event, Infallible>>>> {
    let urls = state.repos().urls();
    let events = match state.scheduler.run_streaming(urls, options) {
        Ok((job_id, receiver)) => {
            info!(job_id = %job_id, "Streaming pipeline run");
            receiver
                .map(move |event| {
                    let event = match event {
                        StreamEvent::Log(entry) => json_event(entry.kind.as_str(), &entry),
                        StreamEvent::Complete(result) => {
                            state.record(&result);
                            json_event("complete", &result)
                        }
                        StreamEvent::Failed(message) => error_event(&message),
                    };
                    Ok::<Event, Infallible>(event)
                })
                .boxed()
        }
        Err(e) => {
            let message = e.to_string();
            stream::once(async move { Ok::<Event, Infallible>(error_event(&message)) }).boxed()
        }
    };
    Sse::new(events).keep_alive(KeepAlive::default())
}

pub async fn submit_job(
    State(state): State<AppState>,
    Query(options): Query<PipelineOptions>,
) -> ApiResult<Value> {
    let urls = state.repos().urls();
    let job_id = state.scheduler.submit(urls, options)?;
    Ok(Json(json!({ "jobId": job_id, "status": JobStatus::Pending })))
}

pub async fn list_jobs(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "jobs": state.scheduler.list() }))
}

pub async fn get_job(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Job> {
    state
        .scheduler
        .get_status(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("job {} not found", id)))
}

pub async fn reset(State(state): State<AppState>) -> Json<Value> {
    state.scheduler.reset();
    state.clear_session();
    Json(json!({ "status": "reset" }))
}
