//! Best-effort enrichment with static fallback
//!
//! Three stages (analysis, matching, generation) optionally ask the
//! completion service to add facts that static extraction cannot see. All of
//! them share one contract: the statically derived value is computed first,
//! enrichment may only add to it through [`Enrichable::merge`], and any
//! enrichment failure is logged and swallowed so the caller always gets at
//! least the static value back.

use crate::llm::{parse_json_response, BackendError, CompletionRequest, LLMClient};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

const ENRICHMENT_TEMPERATURE: f32 = 0.1;

const SYSTEM_PROMPT: &str = "You are a software integration analyst. \
Answer with a single JSON value and nothing else. Never invent fields that are not asked for.";

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("enrichment is not configured")]
    Disabled,

    #[error("completion call failed: {0}")]
    Backend(#[from] BackendError),

    #[error("completion returned unusable JSON: {0}")]
    Parse(String),
}

/// A statically derived value that accepts an additive enrichment patch
pub trait Enrichable {
    type Patch: DeserializeOwned + Send;

    fn merge(&mut self, patch: Self::Patch);
}

/// Handle to the completion service, or nothing when enrichment is off
#[derive(Clone, Default)]
pub struct Enricher {
    client: Option<Arc<dyn LLMClient>>,
}

impl Enricher {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self {
            client: Some(client),
        }
    }

    pub fn disabled() -> Self {
        Self { client: None }
    }

    pub fn from_option(client: Option<Arc<dyn LLMClient>>) -> Self {
        Self { client }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Sends one prompt and decodes the JSON answer into `P`
    pub async fn query<P: DeserializeOwned>(
        &self,
        prompt: String,
        max_tokens: u32,
    ) -> Result<P, EnrichmentError> {
        let client = self.client.as_ref().ok_or(EnrichmentError::Disabled)?;

        let request = CompletionRequest::new(prompt)
            .with_system(SYSTEM_PROMPT)
            .with_temperature(ENRICHMENT_TEMPERATURE)
            .with_max_tokens(max_tokens);

        let response = client.complete(request).await?;
        debug!(
            backend = client.name(),
            response_ms = response.elapsed.as_millis() as u64,
            "Completion received"
        );
        parse_json_response(&response.content).map_err(|e| EnrichmentError::Parse(e.to_string()))
    }
}

impl std::fmt::Debug for Enricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Enricher")
            .field("backend", &self.client.as_ref().map(|c| c.name().to_string()))
            .finish()
    }
}

/// Runs `enrich` against `base` and merges the patch it returns.
///
/// Never fails: on any error `base` comes back unchanged and the error is
/// logged (at debug level when enrichment is simply switched off).
pub async fn with_enrichment<T, F, Fut>(stage: &str, mut base: T, enrich: F) -> T
where
    T: Enrichable,
    F: FnOnce(&T) -> Fut,
    Fut: Future<Output = Result<T::Patch, EnrichmentError>>,
{
    let start = Instant::now();
    match enrich(&base).await {
        Ok(patch) => {
            base.merge(patch);
            info!(
                stage,
                duration_ms = start.elapsed().as_millis() as u64,
                "Enrichment applied"
            );
        }
        Err(EnrichmentError::Disabled) => {
            debug!(stage, "Enrichment disabled, keeping static result");
        }
        Err(e) => {
            warn!(stage, error = %e, "Enrichment failed, keeping static result");
        }
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLLMClient, MockResponse};
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq)]
    struct Facts {
        name: Option<String>,
        tags: Vec<String>,
    }

    #[derive(Debug, Deserialize)]
    struct FactsPatch {
        name: Option<String>,
        #[serde(default)]
        tags: Vec<String>,
    }

    impl Enrichable for Facts {
        type Patch = FactsPatch;

        fn merge(&mut self, patch: FactsPatch) {
            if self.name.is_none() {
                self.name = patch.name;
            }
            for tag in patch.tags {
                if !self.tags.contains(&tag) {
                    self.tags.push(tag);
                }
            }
        }
    }

    fn base() -> Facts {
        Facts {
            name: Some("static".to_string()),
            tags: vec!["a".to_string()],
        }
    }

    #[tokio::test]
    async fn test_patch_is_merged_additively() {
        let mock = Arc::new(MockLLMClient::new());
        mock.add_response(MockResponse::text(
            "```json\n{\"name\": \"model\", \"tags\": [\"a\", \"b\"]}\n```",
        ));
        let enricher = Enricher::new(mock);

        let result = with_enrichment("test", base(), |_| {
            let enricher = enricher.clone();
            async move { enricher.query::<FactsPatch>("prompt".to_string(), 100).await }
        })
        .await;

        assert_eq!(result.name.as_deref(), Some("static"));
        assert_eq!(result.tags, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_backend_failure_returns_base() {
        let mock = Arc::new(MockLLMClient::new());
        mock.add_response(MockResponse::error(BackendError::TimeoutError { seconds: 5 }));
        let enricher = Enricher::new(mock);

        let result = with_enrichment("test", base(), |_| {
            let enricher = enricher.clone();
            async move { enricher.query::<FactsPatch>("prompt".to_string(), 100).await }
        })
        .await;

        assert_eq!(result, base());
    }

    #[tokio::test]
    async fn test_garbage_response_returns_base() {
        let mock = Arc::new(MockLLMClient::new());
        mock.add_response(MockResponse::text("I cannot help with that"));
        let enricher = Enricher::new(mock);

        let result = with_enrichment("test", base(), |_| {
            let enricher = enricher.clone();
            async move { enricher.query::<FactsPatch>("prompt".to_string(), 100).await }
        })
        .await;

        assert_eq!(result, base());
    }

    #[tokio::test]
    async fn test_disabled_enricher_returns_base() {
        let enricher = Enricher::disabled();
        assert!(!enricher.is_enabled());

        let result = with_enrichment("test", base(), |_| {
            let enricher = enricher.clone();
            async move { enricher.query::<FactsPatch>("prompt".to_string(), 100).await }
        })
        .await;

        assert_eq!(result, base());
    }
}
