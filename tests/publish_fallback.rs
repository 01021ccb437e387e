//! Publishing through the full pipeline against an in-memory code host

mod support;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Json, Router};
use repofuse::generate::GeneratedArtifacts;
use repofuse::hosting::{GitHubClient, HostingApi, MockHosting};
use repofuse::pipeline::{PipelineOptions, NoOpHandler};
use repofuse::publish::Publisher;
use repofuse::util::RetryPolicy;
use repofuse::RepoSummary;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use support::{urls, Workspace, API_URL, WEB_URL};

fn publisher(host: &Arc<MockHosting>) -> Arc<Publisher> {
    Arc::new(Publisher::new(host.clone(), "repofuse").with_settle_delay(Duration::ZERO))
}

const PUBLISH: PipelineOptions = PipelineOptions { publish: true };

#[tokio::test]
async fn master_only_repository_gets_pull_request_against_master() {
    let workspace = Workspace::web_and_api();
    let host = Arc::new(MockHosting::new());
    host.add_repository("acme/web", &["master"]);
    host.add_repository("acme/api", &["main"]);

    let result = workspace
        .driver(Some(publisher(&host)))
        .run(&urls(&[WEB_URL, API_URL]), PUBLISH, &NoOpHandler)
        .await
        .unwrap();

    let published = result.publish.expect("publish stage ran");
    assert_eq!(published.len(), 2);
    assert!(published.iter().all(|p| p.succeeded()), "{:?}", published);

    let pulls = host.pull_requests();
    let web = pulls.iter().find(|(target, _)| target == "acme/web").unwrap();
    let api = pulls.iter().find(|(target, _)| target == "acme/api").unwrap();
    assert_eq!(web.1.base, "master");
    assert_eq!(api.1.base, "main");
}

#[tokio::test]
async fn existing_fork_is_reused() {
    let workspace = Workspace::web_and_api();
    let host = Arc::new(MockHosting::new());
    host.add_repository("acme/api", &["main"]);
    host.add_repository("repofuse/acme-api", &["main"]);

    let result = workspace
        .driver(Some(publisher(&host)))
        .run(&urls(&[API_URL]), PUBLISH, &NoOpHandler)
        .await
        .unwrap();

    assert_eq!(host.fork_calls(), 0);
    let published = result.publish.unwrap();
    assert!(published[0].succeeded(), "{:?}", published);
    assert_eq!(
        published[0].fork_url.as_deref(),
        Some("https://github.com/repofuse/acme-api")
    );
}

#[tokio::test]
async fn failing_fork_does_not_stop_other_repositories() {
    let workspace = Workspace::web_and_api();
    let host = Arc::new(MockHosting::new());
    host.add_repository("acme/web", &["main"]);
    host.add_repository("acme/api", &["main"]);
    host.fail_forks_of("acme/web");

    let result = workspace
        .driver(Some(publisher(&host)))
        .run(&urls(&[WEB_URL, API_URL]), PUBLISH, &NoOpHandler)
        .await
        .unwrap();

    let published = result.publish.unwrap();
    assert_eq!(published[0].repo, WEB_URL);
    assert!(!published[0].succeeded());
    assert!(published[0].error.is_some());
    assert_eq!(published[1].repo, API_URL);
    assert!(published[1].succeeded(), "{:?}", published[1]);

    let pulls = host.pull_requests();
    assert_eq!(pulls.len(), 1);
    assert_eq!(pulls[0].0, "acme/api");
}

#[tokio::test]
async fn backend_branch_carries_cors_snippet() {
    let workspace = Workspace::web_and_api();
    let host = Arc::new(MockHosting::new());
    host.add_repository("acme/api", &["main"]);

    workspace
        .driver(Some(publisher(&host)))
        .run(&urls(&[WEB_URL, API_URL]), PUBLISH, &NoOpHandler)
        .await
        .unwrap();

    let (_, spec) = host
        .pull_requests()
        .into_iter()
        .find(|(target, _)| target == "acme/api")
        .unwrap();
    let branch = spec.head.trim_start_matches("repofuse:");
    assert!(host.has_branch("repofuse/acme-api", branch));
    assert!(host
        .file("repofuse/acme-api", branch, "repofuse/cors-snippet.txt")
        .is_some());
    assert!(spec.body.contains("repofuse/cors-snippet.txt"));
}

/// Local stand-in for the GitHub API: the first `limited` requests are
/// refused with `status`, later ones describe `acme/api`
async fn rate_limited_host(status: StatusCode, limited: usize) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let app = Router::new().fallback(move || {
        let counter = counter.clone();
        async move {
            if counter.fetch_add(1, Ordering::SeqCst) < limited {
                return (
                    status,
                    [("x-ratelimit-remaining", "0")],
                    Json(json!({"message": "API rate limit exceeded"})),
                )
                    .into_response();
            }
            Json(json!({
                "full_name": "acme/api",
                "html_url": "https://github.com/acme/api",
                "default_branch": "main"
            }))
            .into_response()
        }
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), hits)
}

fn github(base_url: &str) -> GitHubClient {
    GitHubClient::with_base_url(base_url, "test-token", Duration::from_secs(5), RetryPolicy::immediate(3))
        .unwrap()
}

#[tokio::test]
async fn rate_limited_requests_are_retried_until_they_succeed() {
    let (base_url, hits) = rate_limited_host(StatusCode::TOO_MANY_REQUESTS, 2).await;

    let repo = github(&base_url).get_repository("acme/api").await.unwrap();

    assert_eq!(repo.unwrap().default_branch, "main");
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn exhausted_rate_limit_is_reported_per_repository() {
    let (base_url, hits) = rate_limited_host(StatusCode::FORBIDDEN, usize::MAX).await;
    let publisher = Publisher::new(Arc::new(github(&base_url)), "repofuse")
        .with_settle_delay(Duration::ZERO);

    let results = publisher
        .publish(
            &[RepoSummary::new(API_URL)],
            &GeneratedArtifacts::default(),
        )
        .await;

    assert_eq!(results.len(), 1);
    assert!(results[0].pr_url.is_none());
    assert!(results[0].fork_url.is_none());
    let error = results[0].error.as_deref().unwrap();
    assert!(error.contains("rate limit exceeded after 3 attempts"), "{}", error);
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

const SETTLE: Duration = Duration::from_millis(400);

#[tokio::test]
async fn reused_fork_skips_settle_delay() {
    let host = Arc::new(MockHosting::new());
    host.add_repository("acme/api", &["main"]);
    host.add_repository("repofuse/acme-api", &["main"]);
    let publisher = Publisher::new(host.clone(), "repofuse").with_settle_delay(SETTLE);

    let started = Instant::now();
    let results = publisher
        .publish(&[RepoSummary::new(API_URL)], &GeneratedArtifacts::default())
        .await;

    assert!(results[0].succeeded(), "{:?}", results[0]);
    assert_eq!(host.fork_calls(), 0);
    assert!(started.elapsed() < SETTLE, "{:?}", started.elapsed());
}

#[tokio::test]
async fn new_fork_waits_for_settle_delay() {
    let host = Arc::new(MockHosting::new());
    host.add_repository("acme/api", &["main"]);
    let publisher = Publisher::new(host.clone(), "repofuse").with_settle_delay(SETTLE);

    let started = Instant::now();
    let results = publisher
        .publish(&[RepoSummary::new(API_URL)], &GeneratedArtifacts::default())
        .await;

    assert!(results[0].succeeded(), "{:?}", results[0]);
    assert_eq!(host.fork_calls(), 1);
    assert!(started.elapsed() >= SETTLE, "{:?}", started.elapsed());
}
