//! Completion service gateway
//!
//! Trait-based abstraction over the hosted language-model completion API so
//! the enrichment steps can run against GenAI, a retrying decorator, or a mock
//! interchangeably.

mod client;
mod error;
mod genai;
mod json;
mod mock;
mod retrying;
mod types;

pub use client::LLMClient;
pub use error::BackendError;
pub use genai::{GenAIClient, DEFAULT_COMPLETION_ENDPOINT};
pub use json::{extract_json, parse_json_response};
pub use mock::{MockLLMClient, MockResponse};
pub use retrying::RetryingClient;
pub use types::{CompletionRequest, CompletionResponse};
