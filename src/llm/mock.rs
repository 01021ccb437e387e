use super::client::LLMClient;
use super::error::BackendError;
use super::types::{CompletionRequest, CompletionResponse};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Scripted answer for [`MockLLMClient`]
#[derive(Debug, Clone)]
pub enum MockResponse {
    Text(String),
    Error(BackendError),
}

impl MockResponse {
    pub fn text(content: impl Into<String>) -> Self {
        MockResponse::Text(content.into())
    }

    pub fn json(value: serde_json::Value) -> Self {
        MockResponse::Text(value.to_string())
    }

    pub fn error(error: BackendError) -> Self {
        MockResponse::Error(error)
    }
}

#[derive(Default)]
struct MockState {
    script: VecDeque<MockResponse>,
    requests: Vec<CompletionRequest>,
}

/// Completion client answering from a script, in order
///
/// Every request is recorded. Running past the end of the script is an
/// error, which enrichment treats like any other backend failure.
pub struct MockLLMClient {
    state: Mutex<MockState>,
    name: String,
}

impl MockLLMClient {
    pub fn new() -> Self {
        Self::with_name("mock")
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            name: name.into(),
        }
    }

    pub fn add_response(&self, response: MockResponse) {
        self.lock().script.push_back(response);
    }

    pub fn add_responses(&self, responses: impl IntoIterator<Item = MockResponse>) {
        self.lock().script.extend(responses);
    }

    pub fn remaining_responses(&self) -> usize {
        self.lock().script.len()
    }

    pub fn received_requests(&self) -> Vec<CompletionRequest> {
        self.lock().requests.clone()
    }

    /// User prompts received so far, in call order
    pub fn received_prompts(&self) -> Vec<String> {
        self.lock().requests.iter().map(|r| r.prompt.clone()).collect()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MockLLMClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, BackendError> {
        let next = {
            let mut state = self.lock();
            state.requests.push(request);
            state.script.pop_front()
        };

        match next {
            Some(MockResponse::Text(content)) => {
                Ok(CompletionResponse::new(content, Duration::from_millis(1)).from_model("mock"))
            }
            Some(MockResponse::Error(error)) => Err(error),
            None => Err(BackendError::Other {
                message: format!("{}: script exhausted", self.name),
            }),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> Option<&str> {
        Some("mock")
    }
}

impl std::fmt::Debug for MockLLMClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockLLMClient")
            .field("name", &self.name)
            .field("remaining", &self.remaining_responses())
            .finish()
    }
}
