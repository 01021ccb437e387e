//! GenAI-based completion client
//!
//! Talks to an OpenAI-compatible chat completion endpoint (Groq by default)
//! through the `genai` crate. The adapter, endpoint and credentials are pinned
//! with a service target resolver so model names the crate does not know
//! still reach the configured service.

use super::client::LLMClient;
use super::error::BackendError;
use super::types::{CompletionRequest, CompletionResponse};
use crate::util::retry::parse_retry_hint;
use async_trait::async_trait;
use genai::adapter::AdapterKind;
use genai::chat::{ChatMessage as GenAIChatMessage, ChatOptions, ChatRequest as GenAIChatRequest};
use genai::resolver::{AuthData, Endpoint, ServiceTargetResolver};
use genai::{Client, ModelIden, ServiceTarget};
use std::time::{Duration, Instant};
use tracing::{debug, error};

pub const DEFAULT_COMPLETION_ENDPOINT: &str = "https://api.groq.com/openai/v1/";

pub struct GenAIClient {
    client: Client,
    model: String,
    provider: AdapterKind,
    timeout: Duration,
}

impl GenAIClient {
    /// Creates a client bound to one endpoint, key and model
    pub fn new(
        api_key: String,
        model: String,
        endpoint: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        if api_key.trim().is_empty() {
            return Err(BackendError::ConfigurationError {
                message: "completion API key is empty".to_string(),
            });
        }

        let provider = AdapterKind::Groq;
        let endpoint_url = endpoint.unwrap_or_else(|| DEFAULT_COMPLETION_ENDPOINT.to_string());
        debug!(
            "Creating GenAI client: provider={}, model={}, endpoint={}",
            provider.as_str(),
            model,
            endpoint_url
        );

        let model_clone = model.clone();
        let resolver = ServiceTargetResolver::from_resolver_fn(
            move |_service_target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error> {
                Ok(ServiceTarget {
                    endpoint: Endpoint::from_owned(endpoint_url.clone()),
                    auth: AuthData::from_single(api_key.clone()),
                    model: ModelIden::new(provider, &model_clone),
                })
            },
        );

        let client = Client::builder()
            .with_service_target_resolver(resolver)
            .build();

        Ok(Self {
            client,
            model,
            provider,
            timeout,
        })
    }

    fn to_chat_request(request: &CompletionRequest) -> GenAIChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(GenAIChatMessage::system(system));
        }
        messages.push(GenAIChatMessage::user(&request.prompt));
        GenAIChatRequest::new(messages)
    }
}

/// Maps a provider error message onto the backend taxonomy
fn classify_error(provider: &str, message: String) -> BackendError {
    let lowered = message.to_lowercase();
    if lowered.contains("429") || lowered.contains("rate limit") {
        return BackendError::RateLimitError {
            retry_after: parse_retry_hint(&message),
        };
    }
    if lowered.contains("401") || lowered.contains("invalid api key") {
        return BackendError::ConfigurationError {
            message: format!("{} rejected the API key: {}", provider, message),
        };
    }
    BackendError::ApiError {
        message: format!("{} request failed: {}", provider, message),
        status_code: None,
    }
}

#[async_trait]
impl LLMClient for GenAIClient {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, BackendError> {
        let start = Instant::now();
        debug!(model = %self.model, prompt_chars = request.prompt_chars(), "Sending completion");
        let genai_request = Self::to_chat_request(&request);

        let mut options = ChatOptions::default();
        if let Some(temp) = request.temperature {
            options = options.with_temperature(temp as f64);
        }
        if let Some(max_tokens) = request.max_tokens {
            options = options.with_max_tokens(max_tokens);
        }

        let response = match tokio::time::timeout(
            self.timeout,
            self.client
                .exec_chat(&self.model, genai_request, Some(&options)),
        )
        .await
        {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                error!("{} API error: {}", self.provider.as_str(), e);
                return Err(classify_error(self.provider.as_str(), e.to_string()));
            }
            Err(_) => {
                error!(
                    "{} request timed out after {}s",
                    self.provider.as_str(),
                    self.timeout.as_secs()
                );
                return Err(BackendError::TimeoutError {
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        let content = response.first_text().unwrap_or_default().to_string();
        if content.trim().is_empty() {
            return Err(BackendError::InvalidResponse {
                message: "empty completion".to_string(),
            });
        }

        Ok(CompletionResponse::new(content, start.elapsed()).from_model(&self.model))
    }

    fn name(&self) -> &str {
        self.provider.as_str()
    }

    fn model(&self) -> Option<&str> {
        Some(&self.model)
    }
}

impl std::fmt::Debug for GenAIClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenAIClient")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genai_client_creation() {
        let client = GenAIClient::new(
            "gsk_test".to_string(),
            "llama-3.3-70b-versatile".to_string(),
            None,
            Duration::from_secs(30),
        )
        .unwrap();

        assert_eq!(client.name(), "Groq");
        assert_eq!(client.model(), Some("llama-3.3-70b-versatile"));
    }

    #[test]
    fn test_system_instruction_leads() {
        let request = CompletionRequest::new("prompt").with_system("rules");
        let chat = GenAIClient::to_chat_request(&request);
        assert_eq!(chat.messages.len(), 2);

        let chat = GenAIClient::to_chat_request(&CompletionRequest::new("prompt"));
        assert_eq!(chat.messages.len(), 1);
    }

    #[test]
    fn test_empty_key_rejected() {
        let result = GenAIClient::new(
            "  ".to_string(),
            "model".to_string(),
            None,
            Duration::from_secs(30),
        );
        assert!(matches!(
            result,
            Err(BackendError::ConfigurationError { .. })
        ));
    }

    #[test]
    fn test_classify_rate_limit_with_hint() {
        let err = classify_error(
            "Groq",
            "HTTP 429: Rate limit reached for model. Please try again in 2.5s".to_string(),
        );
        match err {
            BackendError::RateLimitError { retry_after } => {
                assert_eq!(retry_after, Some(Duration::from_millis(2500)));
            }
            other => panic!("expected rate limit, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_generic_error() {
        let err = classify_error("Groq", "connection reset".to_string());
        assert!(matches!(err, BackendError::ApiError { .. }));
    }
}
