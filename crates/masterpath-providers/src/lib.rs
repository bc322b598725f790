//! masterpath-providers — LLM-backed content sources.
//!
//! Implements the core `ContentSource` trait on top of Anthropic and
//! OpenAI-compatible chat APIs, plus mocks for tests.

pub mod anthropic;
pub mod client;
pub mod config;
pub mod content;
pub mod error;
pub mod mock;
pub mod openai;

pub use client::{Completion, LlmClient, ModelSettings};
pub use config::{create_content_source, load_config, MasterpathConfig, ProviderConfig};
pub use content::{LlmContentSource, UnavailableSource};
pub use error::ProviderError;
