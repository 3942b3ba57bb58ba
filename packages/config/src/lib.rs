#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Startup configuration for the SOS map services.
//!
//! [`Config`] is built once from environment variables when a binary
//! starts and is then handed to the components that need it. A missing
//! language-model credential or mapping API key is a fatal
//! [`ConfigError`]: the process must not start serving without them.
//!
//! | Variable | Default |
//! |---|---|
//! | `AI_PROVIDER` | auto-detected from the available API key |
//! | `GEMINI_API_KEY` / `ANTHROPIC_API_KEY` / `OPENAI_API_KEY` | required (one) |
//! | `AI_MODEL` | provider default |
//! | `AI_BASE_URL` | provider default |
//! | `GOOGLE_MAPS_API_KEY` | required |
//! | `SOS_DATA_FILE` | `processed_data.json` |
//! | `RESCUE_HQ_COORDS` | `18.9486,72.8336` |
//! | `GEOCODE_REGION` | `Mumbai` |
//! | `HTTP_TIMEOUT_SECS` | `10` |
//! | `BIND_ADDR` | `127.0.0.1` |
//! | `PORT` | `5000` |

use std::path::PathBuf;
use std::time::Duration;

use sos_map_incident_models::Coordinates;
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Default location of the incident store.
pub const DEFAULT_DATA_FILE: &str = "processed_data.json";

/// Default rescue headquarters (Mumbai), used as the route origin.
pub const DEFAULT_HEADQUARTERS: Coordinates = Coordinates::new(18.9486, 72.8336);

/// Default region appended to extracted locations before geocoding.
pub const DEFAULT_GEOCODE_REGION: &str = "Mumbai";

/// Default timeout applied to every outbound HTTP request.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors raised while building the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("{name} environment variable is not set")]
    Missing {
        /// Variable name.
        name: &'static str,
    },

    /// A variable is set but cannot be parsed.
    #[error("Invalid value for {name}: {message}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// What was wrong with it.
        message: String,
    },
}

/// Which language-model API to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LlmProviderKind {
    /// Google Gemini `generateContent`.
    #[strum(to_string = "gemini", serialize = "google")]
    Gemini,
    /// Anthropic Messages API.
    #[strum(to_string = "anthropic", serialize = "claude")]
    Anthropic,
    /// `OpenAI` Chat Completions, or any compatible server.
    #[strum(to_string = "openai", serialize = "gpt")]
    OpenAi,
}

impl LlmProviderKind {
    /// Environment variable holding this provider's API key.
    #[must_use]
    pub const fn api_key_var(self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }

    /// Model used when `AI_MODEL` is not set.
    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => "gemini-1.5-flash-latest",
            Self::Anthropic => "claude-sonnet-4-20250514",
            Self::OpenAi => "gpt-4o",
        }
    }

    const fn detection_order() -> &'static [Self] {
        &[Self::Gemini, Self::Anthropic, Self::OpenAi]
    }
}

/// Language-model provider settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Provider to use.
    pub provider: LlmProviderKind,
    /// API key for the provider.
    pub api_key: String,
    /// Model name.
    pub model: String,
    /// Overrides the provider's API base URL (e.g. a local
    /// OpenAI-compatible server).
    pub base_url: Option<String>,
}

/// Process-wide configuration, constructed once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Language-model settings.
    pub llm: LlmConfig,
    /// Google Maps Platform API key.
    pub maps_api_key: String,
    /// Path of the incident store JSON document.
    pub data_file: PathBuf,
    /// Route origin when the caller does not supply one.
    pub headquarters: Coordinates,
    /// Region appended to extracted locations before geocoding.
    pub geocode_region: String,
    /// Timeout for every outbound HTTP request.
    pub http_timeout: Duration,
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// Port the HTTP server listens on.
    pub port: u16,
}

impl Config {
    /// Builds the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required credential is missing or a
    /// variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolves only the incident store path from the process
    /// environment. Needs no credentials.
    #[must_use]
    pub fn data_file_from_env() -> PathBuf {
        Self::data_file_from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolves the incident store path (`SOS_DATA_FILE`, or
    /// [`DEFAULT_DATA_FILE`]) from an arbitrary variable lookup.
    #[must_use]
    pub fn data_file_from_lookup<F>(lookup: F) -> PathBuf
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup("SOS_DATA_FILE")
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_DATA_FILE), PathBuf::from)
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required credential is missing or a
    /// variable cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let llm = llm_config(&get)?;

        let maps_api_key = get("GOOGLE_MAPS_API_KEY").ok_or(ConfigError::Missing {
            name: "GOOGLE_MAPS_API_KEY",
        })?;

        let headquarters = match get("RESCUE_HQ_COORDS") {
            Some(raw) => raw.parse::<Coordinates>().map_err(|e| ConfigError::Invalid {
                name: "RESCUE_HQ_COORDS",
                message: e.to_string(),
            })?,
            None => DEFAULT_HEADQUARTERS,
        };

        let http_timeout = match get("HTTP_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(raw.trim().parse::<u64>().map_err(|_| {
                ConfigError::Invalid {
                    name: "HTTP_TIMEOUT_SECS",
                    message: format!("expected whole seconds, got {raw:?}"),
                }
            })?),
            None => DEFAULT_HTTP_TIMEOUT,
        };

        let port = match get("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                message: format!("expected a port number, got {raw:?}"),
            })?,
            None => 5000,
        };

        Ok(Self {
            llm,
            maps_api_key,
            data_file: Self::data_file_from_lookup(&lookup),
            headquarters,
            geocode_region: get("GEOCODE_REGION")
                .unwrap_or_else(|| DEFAULT_GEOCODE_REGION.to_string()),
            http_timeout,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
        })
    }
}

fn llm_config(get: &impl Fn(&str) -> Option<String>) -> Result<LlmConfig, ConfigError> {
    let provider = match get("AI_PROVIDER") {
        Some(raw) => raw.parse::<LlmProviderKind>().map_err(|_| ConfigError::Invalid {
            name: "AI_PROVIDER",
            message: format!("unknown provider {raw:?}; use 'gemini', 'anthropic', or 'openai'"),
        })?,
        None => detect_provider(get),
    };

    let api_key = get(provider.api_key_var()).ok_or(ConfigError::Missing {
        name: provider.api_key_var(),
    })?;

    Ok(LlmConfig {
        provider,
        api_key,
        model: get("AI_MODEL").unwrap_or_else(|| provider.default_model().to_string()),
        base_url: get("AI_BASE_URL"),
    })
}

/// Picks the first provider whose API key is available, falling back to
/// Gemini so the missing-key error names a concrete variable.
fn detect_provider(get: &impl Fn(&str) -> Option<String>) -> LlmProviderKind {
    LlmProviderKind::detection_order()
        .iter()
        .copied()
        .find(|kind| get(kind.api_key_var()).is_some())
        .inspect(|kind| {
            log::info!("Auto-detected AI provider: {kind} ({} found)", kind.api_key_var());
        })
        .unwrap_or_else(|| {
            log::warn!(
                "No AI credentials detected. Set one of GEMINI_API_KEY, \
                 ANTHROPIC_API_KEY, or OPENAI_API_KEY."
            );
            LlmProviderKind::Gemini
        })
}
