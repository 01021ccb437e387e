use super::{
    FileWrite, HostingApi, HostingError, PullRequestInfo, PullRequestSpec, RepositoryInfo,
};
use crate::util::retry::RetryPolicy;
use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{HeaderMap, ACCEPT, RETRY_AFTER};
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};

pub const GITHUB_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("repofuse/", env!("CARGO_PKG_VERSION"));

/// REST client for the GitHub API
pub struct GitHubClient {
    http: Client,
    base_url: String,
    token: String,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct RefResponse {
    object: RefObject,
}

#[derive(Debug, Deserialize)]
struct RefObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    sha: String,
}

impl GitHubClient {
    pub fn new(token: impl Into<String>, timeout: Duration, retry: RetryPolicy) -> Result<Self, HostingError> {
        Self::with_base_url(GITHUB_API_URL, token, timeout, retry)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, HostingError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            retry,
        })
    }

    /// Sends one request with rate-limit retry and maps non-success statuses
    /// to [`HostingError::Status`].
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, HostingError> {
        let url = format!("{}{}", self.base_url, path);
        self.retry
            .run(path, || {
                let mut request = self
                    .http
                    .request(method.clone(), &url)
                    .bearer_auth(&self.token)
                    .header(ACCEPT, "application/vnd.github+json");
                if let Some(body) = &body {
                    request = request.json(body);
                }
                async move {
                    let response = request.send().await?;
                    let status = response.status();
                    let headers = response.headers().clone();
                    let text = response.text().await?;
                    debug!(status = status.as_u16(), "GitHub response");

                    if status.is_success() {
                        if text.trim().is_empty() {
                            return Ok(Value::Null);
                        }
                        return serde_json::from_str(&text)
                            .map_err(|e| HostingError::Decode(e.to_string()));
                    }
                    Err(status_error(status, &headers, &text))
                }
            })
            .await
    }
}

fn status_error(status: StatusCode, headers: &HeaderMap, body: &str) -> HostingError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            let base = v.get("message")?.as_str()?.to_string();
            let details: Vec<String> = v
                .get("errors")
                .and_then(|e| e.as_array())
                .map(|errors| {
                    errors
                        .iter()
                        .filter_map(|e| {
                            e.get("message")
                                .or_else(|| e.get("field"))
                                .and_then(|m| m.as_str())
                                .map(str::to_string)
                        })
                        .collect()
                })
                .unwrap_or_default();
            if details.is_empty() {
                Some(base)
            } else {
                Some(format!("{}: {}", base, details.join(", ")))
            }
        })
        .unwrap_or_else(|| body.trim().to_string());

    let remaining_zero = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == "0")
        .unwrap_or(false);
    let rate_limited = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN
            && (remaining_zero || message.to_lowercase().contains("rate limit")));

    if rate_limited {
        let retry_after = headers
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        return HostingError::RateLimited { retry_after };
    }

    HostingError::Status {
        status: status.as_u16(),
        message,
    }
}

fn repository_from(value: &Value) -> Result<RepositoryInfo, HostingError> {
    serde_json::from_value(value.clone()).map_err(|e| HostingError::Decode(e.to_string()))
}

#[async_trait]
impl HostingApi for GitHubClient {
    #[instrument(skip(self))]
    async fn get_repository(&self, full_name: &str) -> Result<Option<RepositoryInfo>, HostingError> {
        match self
            .execute(Method::GET, &format!("/repos/{}", full_name), None)
            .await
        {
            Ok(value) => Ok(Some(repository_from(&value)?)),
            Err(HostingError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self))]
    async fn create_fork(
        &self,
        owner: &str,
        repo: &str,
        organization: &str,
        fork_name: &str,
    ) -> Result<RepositoryInfo, HostingError> {
        let value = self
            .execute(
                Method::POST,
                &format!("/repos/{}/{}/forks", owner, repo),
                Some(json!({
                    "organization": organization,
                    "name": fork_name,
                    "default_branch_only": true,
                })),
            )
            .await?;
        repository_from(&value)
    }

    #[instrument(skip(self))]
    async fn get_branch_sha(&self, full_name: &str, branch: &str) -> Result<String, HostingError> {
        let value = self
            .execute(
                Method::GET,
                &format!("/repos/{}/git/ref/heads/{}", full_name, branch),
                None,
            )
            .await?;
        let reference: RefResponse =
            serde_json::from_value(value).map_err(|e| HostingError::Decode(e.to_string()))?;
        Ok(reference.object.sha)
    }

    #[instrument(skip(self))]
    async fn create_branch(
        &self,
        full_name: &str,
        branch: &str,
        sha: &str,
    ) -> Result<(), HostingError> {
        self.execute(
            Method::POST,
            &format!("/repos/{}/git/refs", full_name),
            Some(json!({
                "ref": format!("refs/heads/{}", branch),
                "sha": sha,
            })),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_file_sha(
        &self,
        full_name: &str,
        path: &str,
        branch: &str,
    ) -> Result<Option<String>, HostingError> {
        match self
            .execute(
                Method::GET,
                &format!("/repos/{}/contents/{}?ref={}", full_name, path, branch),
                None,
            )
            .await
        {
            Ok(value) => {
                let content: ContentResponse = serde_json::from_value(value)
                    .map_err(|e| HostingError::Decode(e.to_string()))?;
                Ok(Some(content.sha))
            }
            Err(HostingError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, file), fields(path = %file.path, branch = %file.branch))]
    async fn put_file(&self, full_name: &str, file: FileWrite) -> Result<(), HostingError> {
        let mut body = json!({
            "message": file.message,
            "content": base64::engine::general_purpose::STANDARD.encode(file.content.as_bytes()),
            "branch": file.branch,
        });
        if let Some(sha) = &file.sha {
            body["sha"] = Value::String(sha.clone());
        }
        self.execute(
            Method::PUT,
            &format!("/repos/{}/contents/{}", full_name, file.path),
            Some(body),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self, spec), fields(head = %spec.head, base = %spec.base))]
    async fn create_pull_request(
        &self,
        full_name: &str,
        spec: PullRequestSpec,
    ) -> Result<PullRequestInfo, HostingError> {
        let value = self
            .execute(
                Method::POST,
                &format!("/repos/{}/pulls", full_name),
                Some(json!({
                    "title": spec.title,
                    "body": spec.body,
                    "head": spec.head,
                    "base": spec.base,
                })),
            )
            .await?;
        serde_json::from_value(value).map_err(|e| HostingError::Decode(e.to_string()))
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_status_error_extracts_validation_details() {
        let body = r#"{"message":"Validation Failed","errors":[{"resource":"PullRequest","field":"base","code":"invalid"}]}"#;
        let err = status_error(StatusCode::UNPROCESSABLE_ENTITY, &HeaderMap::new(), body);
        match &err {
            HostingError::Status { status, message } => {
                assert_eq!(*status, 422);
                assert_eq!(message, "Validation Failed: base");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(err.is_missing_base());
    }

    #[test]
    fn test_status_error_detects_rate_limit() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        let err = status_error(StatusCode::TOO_MANY_REQUESTS, &headers, "");
        assert!(matches!(
            err,
            HostingError::RateLimited {
                retry_after: Some(d)
            } if d == Duration::from_secs(7)
        ));
    }

    #[test]
    fn test_forbidden_with_exhausted_quota_is_rate_limit() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        let err = status_error(StatusCode::FORBIDDEN, &headers, r#"{"message":"Forbidden"}"#);
        assert!(matches!(err, HostingError::RateLimited { retry_after: None }));
    }

    #[test]
    fn test_plain_forbidden_is_status() {
        let err = status_error(
            StatusCode::FORBIDDEN,
            &HeaderMap::new(),
            r#"{"message":"Resource not accessible"}"#,
        );
        assert!(matches!(err, HostingError::Status { status: 403, .. }));
    }

    #[test]
    fn test_client_trims_base_url() {
        let client = GitHubClient::with_base_url(
            "http://localhost:9999/",
            "token",
            Duration::from_secs(5),
            RetryPolicy::immediate(1),
        )
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:9999");
    }
}
