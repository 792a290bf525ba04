//! Completion capability: system instructions + user content → text.
//!
//! [`CompletionBackend`] is the seam the script stage talks to. The default
//! implementation, [`LlmCompletion`], drives any edgequake-llm provider
//! (OpenAI, Anthropic, Gemini, Ollama, …) with a two-message chat.
//!
//! There is no retry loop here: one request makes one call. Retries belong to
//! the caller, who issues a new request.

use crate::error::ProviderError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Sampling parameters for one completion call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletionParams {
    pub temperature: f32,
    pub max_tokens: usize,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            temperature: 0.6,
            max_tokens: 3000,
        }
    }
}

/// Raw model answer plus usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl Completion {
    /// A completion with no usage data.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// A language model that answers one system+user exchange.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Short provider label for logs and errors.
    fn name(&self) -> &str;

    async fn complete(
        &self,
        system: &str,
        user: &str,
        params: &CompletionParams,
    ) -> Result<Completion, ProviderError>;
}

/// [`CompletionBackend`] over an edgequake-llm provider.
#[derive(Clone)]
pub struct LlmCompletion {
    provider: Arc<dyn LLMProvider>,
    label: String,
}

impl LlmCompletion {
    /// Wrap a provider. `label` names it in logs and errors.
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
        }
    }
}

impl fmt::Debug for LlmCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmCompletion")
            .field("provider", &"<dyn LLMProvider>")
            .field("label", &self.label)
            .finish()
    }
}

#[async_trait]
impl CompletionBackend for LlmCompletion {
    fn name(&self) -> &str {
        &self.label
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        params: &CompletionParams,
    ) -> Result<Completion, ProviderError> {
        let start = Instant::now();
        let messages = vec![ChatMessage::system(system), ChatMessage::user(user)];
        let options = build_options(params);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ProviderError::from_message(&self.label, e.to_string()))?;

        debug!(
            "{}: {} input tokens, {} output tokens, {:?}",
            self.label,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Ok(Completion {
            text: response.content,
            input_tokens: response.prompt_tokens as usize,
            output_tokens: response.completion_tokens as usize,
        })
    }
}

/// Build `CompletionOptions` from the call parameters.
fn build_options(params: &CompletionParams) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(params.temperature),
        max_tokens: Some(params.max_tokens),
        ..Default::default()
    }
}
