//! LLM provider abstraction and implementations.
//!
//! Supports Gemini, Anthropic, and `OpenAI` via a common trait.

pub mod anthropic;
pub mod gemini;
pub mod openai;

use std::time::Duration;

use sos_map_config::{LlmConfig, LlmProviderKind};

use crate::AiError;

/// Upper bound on generated tokens. Both analysis and situation answers
/// are a single small JSON object.
pub const MAX_OUTPUT_TOKENS: u32 = 1024;

/// Trait for LLM providers.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Sends a single-turn completion request and returns the text of the
    /// model's answer.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails or the provider reports an
    /// error.
    async fn complete(&self, system_prompt: &str, prompt: &str) -> Result<String, AiError>;
}

/// Creates the LLM provider described by `config`.
///
/// Every request made by the provider is bounded by `timeout`.
///
/// # Errors
///
/// Returns [`AiError::Http`] if the HTTP client cannot be constructed.
pub fn create_provider(
    config: &LlmConfig,
    timeout: Duration,
) -> Result<Box<dyn LlmProvider>, AiError> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let api_key = config.api_key.clone();
    let model = config.model.clone();

    log::info!("Using AI provider {} (model {model})", config.provider);

    Ok(match config.provider {
        LlmProviderKind::Gemini => Box::new(gemini::GeminiProvider::new(
            client,
            api_key,
            model,
            config.base_url.clone(),
        )),
        LlmProviderKind::Anthropic => Box::new(anthropic::AnthropicProvider::new(
            client,
            api_key,
            model,
            config.base_url.clone(),
        )),
        LlmProviderKind::OpenAi => Box::new(openai::OpenAiProvider::new(
            client,
            api_key,
            model,
            config.base_url.clone(),
        )),
    })
}

/// Builds an [`AiError::Provider`] from a non-success response, using the
/// provider's error message when the body carries one.
fn provider_error(status: reqwest::StatusCode, body: &str, message: Option<String>) -> AiError {
    AiError::Provider {
        message: message.unwrap_or_else(|| format!("HTTP {status}: {body}")),
    }
}
