#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! LLM provider abstraction and SOS message analysis.
//!
//! Supports Google Gemini, Anthropic Claude, and `OpenAI` (plus any
//! `OpenAI`-compatible local/self-hosted server via `AI_BASE_URL`) behind
//! the [`providers::LlmProvider`] trait. On top of that, [`analysis`]
//! turns a raw SOS message into structured fields and an authenticity
//! assessment, and [`situation`] produces the short situation blurb shown
//! on the dashboard.

pub mod analysis;
pub mod providers;
pub mod situation;

use thiserror::Error;

/// Errors that can occur during AI operations.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request to LLM provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider-specific error.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// The provider answered without any text content.
    #[error("Provider returned an empty response")]
    EmptyResponse,
}
