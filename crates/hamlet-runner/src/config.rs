//! Configuration types for the operation dispatcher.
//!
//! Infrastructure configuration (NATS, LLM backend, image endpoint) is
//! loaded from environment variables. Behavioral tunables (cooldowns,
//! moderation patterns, pipeline probabilities) live in
//! `hamlet-config.yaml` and are loaded separately by [`crate::town`].

use std::time::Duration;

use crate::error::DispatchError;

/// Complete dispatcher configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// NATS server URL (e.g. `nats://localhost:4222`).
    pub nats_url: String,
    /// Text-generation backend configuration.
    pub llm_backend: LlmBackendConfig,
    /// Image-generation endpoint configuration.
    pub image: ImageEndpointConfig,
    /// Upper bound of the randomized delay before each finishing
    /// completion write. Zero disables the jitter entirely.
    pub completion_jitter: Duration,
    /// Path to the prompt templates directory.
    pub templates_dir: String,
    /// Path to the behavioral configuration file.
    pub town_config_path: String,
}

/// Configuration for the text-generation backend.
#[derive(Debug, Clone)]
pub struct LlmBackendConfig {
    /// The backend type (openai-compatible or anthropic).
    pub backend_type: BackendType,
    /// Base API URL (e.g. `https://api.openai.com/v1`).
    pub api_url: String,
    /// API key for authentication.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
}

/// Supported text-generation backend types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendType {
    /// `OpenAI`-compatible chat completions API (works with `OpenAI`,
    /// `DeepSeek`, Ollama).
    OpenAi,
    /// Anthropic Messages API (different request format).
    Anthropic,
}

/// Configuration for the deterministic image-generation endpoint.
///
/// The endpoint generates on fetch: building the URL is the whole call,
/// so this config fully describes the adapter.
#[derive(Debug, Clone)]
pub struct ImageEndpointConfig {
    /// Base URL of the image service.
    pub api_url: String,
    /// Image model name passed as a query parameter.
    pub model: String,
    /// Optional access token passed as a query parameter.
    pub token: Option<String>,
    /// Generated image width in pixels.
    pub width: u32,
    /// Generated image height in pixels.
    pub height: u32,
}

impl RunnerConfig {
    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `NATS_URL` -- NATS server connection string
    /// - `LLM_BACKEND` -- backend type (`openai` / `anthropic` / ...)
    /// - `LLM_API_URL` -- API base URL
    /// - `LLM_API_KEY` -- API key
    /// - `LLM_MODEL` -- model name
    ///
    /// Optional variables:
    /// - `IMAGE_API_URL` -- image endpoint base (default `https://image.pollinations.ai`)
    /// - `IMAGE_MODEL` -- image model (default `flux`)
    /// - `IMAGE_TOKEN` -- image endpoint access token (default none)
    /// - `IMAGE_WIDTH` / `IMAGE_HEIGHT` -- pixel dimensions (default 512)
    /// - `COMPLETION_JITTER_MS` -- jitter upper bound in ms (default 1000)
    /// - `TEMPLATES_DIR` -- prompt templates path (default `templates`)
    /// - `TOWN_CONFIG` -- behavioral config path (default `hamlet-config.yaml`)
    pub fn from_env() -> Result<Self, DispatchError> {
        let nats_url = env_var("NATS_URL")?;
        let llm_backend = load_backend_config("LLM")?;

        let image = ImageEndpointConfig {
            api_url: std::env::var("IMAGE_API_URL")
                .unwrap_or_else(|_| "https://image.pollinations.ai".to_owned()),
            model: std::env::var("IMAGE_MODEL").unwrap_or_else(|_| "flux".to_owned()),
            token: std::env::var("IMAGE_TOKEN").ok(),
            width: parse_env_or("IMAGE_WIDTH", 512)?,
            height: parse_env_or("IMAGE_HEIGHT", 512)?,
        };

        let jitter_ms: u64 = parse_env_or("COMPLETION_JITTER_MS", 1000)?;

        let templates_dir =
            std::env::var("TEMPLATES_DIR").unwrap_or_else(|_| "templates".to_owned());
        let town_config_path =
            std::env::var("TOWN_CONFIG").unwrap_or_else(|_| "hamlet-config.yaml".to_owned());

        Ok(Self {
            nats_url,
            llm_backend,
            image,
            completion_jitter: Duration::from_millis(jitter_ms),
            templates_dir,
            town_config_path,
        })
    }
}

/// Read a required environment variable.
fn env_var(name: &str) -> Result<String, DispatchError> {
    std::env::var(name)
        .map_err(|e| DispatchError::Config(format!("missing required env var {name}: {e}")))
}

/// Parse an optional environment variable, falling back to a default.
fn parse_env_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T, DispatchError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| DispatchError::Config(format!("invalid {name}: {e}"))),
        Err(_) => Ok(default),
    }
}

/// Load an LLM backend config from a set of prefixed environment variables.
fn load_backend_config(prefix: &str) -> Result<LlmBackendConfig, DispatchError> {
    let backend_str = env_var(&format!("{prefix}_BACKEND"))?;
    let api_url = env_var(&format!("{prefix}_API_URL"))?;
    let api_key = env_var(&format!("{prefix}_API_KEY"))?;
    let model = env_var(&format!("{prefix}_MODEL"))?;

    let backend_type = match backend_str.to_lowercase().as_str() {
        "openai" | "deepseek" | "ollama" => BackendType::OpenAi,
        "anthropic" | "claude" => BackendType::Anthropic,
        other => {
            return Err(DispatchError::Config(format!(
                "unknown backend type: {other}"
            )));
        }
    };

    Ok(LlmBackendConfig {
        backend_type,
        api_url,
        api_key,
        model,
    })
}
