//! Chat completion client abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Model parameters sent with every completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".into(),
            max_tokens: 8192,
            temperature: 0.7,
        }
    }
}

/// Raw text answer from a chat model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A single-turn chat completion API.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Provider name (e.g. "anthropic").
    fn name(&self) -> &str;

    async fn complete(&self, system: &str, prompt: &str) -> anyhow::Result<Completion>;
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn complete(&self, system: &str, prompt: &str) -> anyhow::Result<Completion> {
        (**self).complete(system, prompt).await
    }
}
