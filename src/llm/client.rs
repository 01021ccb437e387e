use super::error::BackendError;
use super::types::{CompletionRequest, CompletionResponse};
use async_trait::async_trait;

/// A hosted completion backend
///
/// Implementations surface rate limiting as [`BackendError::RateLimitError`]
/// and leave retrying to [`super::RetryingClient`].
#[async_trait]
pub trait LLMClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest)
        -> Result<CompletionResponse, BackendError>;

    /// Backend label used in logs
    fn name(&self) -> &str;

    fn model(&self) -> Option<&str> {
        None
    }
}
