//! Struct definitions and serde defaults for reel configuration.

use serde::{Deserialize, Serialize};

/// Root configuration for reel, deserialized from `config.toml`.
///
/// Every field has a serde default so reel runs with no config file at all.
/// Optional numeric settings fall back to [`crate::constants`] through the
/// accessors in `resolve.rs`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Default model identifier (e.g. `"gpt-4o"`).
    #[serde(default = "default_model")]
    pub model: String,
    /// Default provider name (e.g., "openai", "anthropic").
    #[serde(default)]
    pub default_provider: Option<String>,
    /// Sampling temperature.
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Output length cap per completion.
    #[serde(default)]
    pub max_tokens: Option<u64>,
    /// Instructions placed at the top of every transcript. The function list
    /// is always appended after them.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Function calls allowed for a single user message.
    #[serde(default)]
    pub max_lookups_per_turn: Option<usize>,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// Per-provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Credentials for the movie data services.
    #[serde(default)]
    pub lookup: LookupConfig,
}

/// Returns the default model identifier.
///
/// Used by serde's `#[serde(default)]` attribute during deserialization.
pub(super) fn default_model() -> String {
    crate::constants::DEFAULT_MODEL.to_string()
}

/// Provider-specific configuration map.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ProviderConfig {
    pub openai: Option<ProviderEntry>,
    pub anthropic: Option<ProviderEntry>,
    pub ollama: Option<ProviderEntry>,
    pub openrouter: Option<ProviderEntry>,
}

/// Connection details for a single LLM provider.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ProviderEntry {
    /// API key for authentication. Can also be set via environment variables.
    pub api_key: Option<String>,
    /// Custom base URL for the provider's API.
    pub base_url: Option<String>,
    /// Model identifier to use with this provider.
    pub model: Option<String>,
}

/// Upper bounds for outbound calls, in seconds.
#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct TimeoutConfig {
    pub completion_secs: Option<u64>,
    pub lookup_secs: Option<u64>,
}

/// API keys for TMDB and SerpAPI.
#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct LookupConfig {
    pub tmdb_api_key: Option<String>,
    pub serpapi_api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: default_model(),
            default_provider: None,
            temperature: None,
            max_tokens: None,
            system_prompt: None,
            max_lookups_per_turn: None,
            timeouts: TimeoutConfig::default(),
            provider: ProviderConfig::default(),
            lookup: LookupConfig::default(),
        }
    }
}
