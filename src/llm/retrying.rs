use super::client::LLMClient;
use super::error::BackendError;
use super::types::{CompletionRequest, CompletionResponse};
use crate::util::retry::RetryPolicy;
use async_trait::async_trait;
use std::sync::Arc;

/// Decorator that retries rate-limited completion calls
pub struct RetryingClient {
    inner: Arc<dyn LLMClient>,
    policy: RetryPolicy,
}

impl RetryingClient {
    pub fn new(inner: Arc<dyn LLMClient>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl LLMClient for RetryingClient {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, BackendError> {
        let inner = &self.inner;
        self.policy
            .run(inner.name(), || {
                let request = request.clone();
                async move { inner.complete(request).await }
            })
            .await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> Option<&str> {
        self.inner.model()
    }
}
