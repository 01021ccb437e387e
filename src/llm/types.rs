//! Completion request/response types
//!
//! Every enrichment call is one instruction plus one prompt and expects a
//! single answer back; there is no conversation state to carry.

use std::time::Duration;

/// One completion call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Standing instructions sent ahead of the prompt
    pub system: Option<String>,
    pub prompt: String,
    /// Sampling temperature (0.0 - 1.0)
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature.clamp(0.0, 1.0));
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Rough prompt size in characters, for logging
    pub fn prompt_chars(&self) -> usize {
        self.system.as_ref().map_or(0, |s| s.len()) + self.prompt.len()
    }
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    /// Model that produced the answer, when the backend reports it
    pub model: Option<String>,
    pub elapsed: Duration,
}

impl CompletionResponse {
    pub fn new(content: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            content: content.into(),
            model: None,
            elapsed,
        }
    }

    pub fn from_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = CompletionRequest::new("List the routes")
            .with_system("Answer in JSON")
            .with_temperature(0.1)
            .with_max_tokens(600);

        assert_eq!(request.system.as_deref(), Some("Answer in JSON"));
        assert_eq!(request.prompt, "List the routes");
        assert_eq!(request.temperature, Some(0.1));
        assert_eq!(request.max_tokens, Some(600));
        assert_eq!(request.prompt_chars(), 29);
    }

    #[test]
    fn test_temperature_is_clamped() {
        let request = CompletionRequest::new("x").with_temperature(3.0);
        assert_eq!(request.temperature, Some(1.0));
    }

    #[test]
    fn test_response_model() {
        let response = CompletionResponse::new("{}", Duration::from_millis(5)).from_model("llama");
        assert_eq!(response.model.as_deref(), Some("llama"));
    }
}
