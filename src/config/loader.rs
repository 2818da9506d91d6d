//! File loading and merging for reel configuration.

use anyhow::{Context, Result};
use std::fs;

use super::types::{default_model, Config, LookupConfig, ProviderConfig, ProviderEntry, TimeoutConfig};
use crate::constants::{
    COMPLETION_TIMEOUT_SECS, DEFAULT_PROVIDER, DEFAULT_TEMPERATURE, LOOKUP_TIMEOUT_SECS,
    MAX_LOOKUPS_PER_TURN, MAX_TOKENS,
};

impl Config {
    /// Loads the global config from `~/.config/reel/config.toml`.
    ///
    /// If no config file exists, creates one with sensible defaults
    /// (including `{env:VAR}` placeholders for API keys) and returns it.
    pub(super) fn load_global() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            let default_toml = default_config_toml();
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &default_toml)
                .with_context(|| format!("Failed to write default config to {:?}", path))?;
            tracing::info!(path = %path.display(), "wrote default config");
            let config: Config = toml::from_str(&default_toml)
                .with_context(|| "Failed to parse default config".to_string())?;
            return Ok(config);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config at {:?}", path))?;
        Ok(config)
    }

    /// Look for reel.toml in current dir, then walk up to git root.
    pub(super) fn load_project() -> Result<Option<Config>> {
        let mut dir = std::env::current_dir()?;
        loop {
            let candidate = dir.join(crate::constants::PROJECT_CONFIG_FILENAME);
            if candidate.exists() {
                let contents = fs::read_to_string(&candidate)?;
                let config: Config = toml::from_str(&contents)
                    .with_context(|| format!("Failed to parse {:?}", candidate))?;
                tracing::debug!(path = %candidate.display(), "found project config");
                return Ok(Some(config));
            }
            if dir.join(".git").exists() || !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Merge project config over global config.
    /// Project values win when present, field by field.
    pub(super) fn merge(global: Config, project: Config) -> Config {
        Config {
            model: if project.model != default_model() {
                project.model
            } else {
                global.model
            },
            default_provider: project.default_provider.or(global.default_provider),
            temperature: project.temperature.or(global.temperature),
            max_tokens: project.max_tokens.or(global.max_tokens),
            system_prompt: project.system_prompt.or(global.system_prompt),
            max_lookups_per_turn: project.max_lookups_per_turn.or(global.max_lookups_per_turn),
            timeouts: TimeoutConfig {
                completion_secs: project
                    .timeouts
                    .completion_secs
                    .or(global.timeouts.completion_secs),
                lookup_secs: project.timeouts.lookup_secs.or(global.timeouts.lookup_secs),
            },
            provider: ProviderConfig {
                openai: merge_entry(global.provider.openai, project.provider.openai),
                anthropic: merge_entry(global.provider.anthropic, project.provider.anthropic),
                ollama: merge_entry(global.provider.ollama, project.provider.ollama),
                openrouter: merge_entry(global.provider.openrouter, project.provider.openrouter),
            },
            lookup: LookupConfig {
                tmdb_api_key: project.lookup.tmdb_api_key.or(global.lookup.tmdb_api_key),
                serpapi_api_key: project
                    .lookup
                    .serpapi_api_key
                    .or(global.lookup.serpapi_api_key),
            },
        }
    }
}

fn merge_entry(global: Option<ProviderEntry>, project: Option<ProviderEntry>) -> Option<ProviderEntry> {
    match (global, project) {
        (Some(g), Some(p)) => Some(ProviderEntry {
            api_key: p.api_key.or(g.api_key),
            base_url: p.base_url.or(g.base_url),
            model: p.model.or(g.model),
        }),
        (g, p) => p.or(g),
    }
}

/// Contents written on first run.
fn default_config_toml() -> String {
    format!(
        r#"model = "{model}"
default_provider = "{provider}"
temperature = {temperature}
max_tokens = {max_tokens}
max_lookups_per_turn = {max_lookups}

[timeouts]
completion_secs = {completion_secs}
lookup_secs = {lookup_secs}

[provider]

[provider.openai]
api_key = "{{env:OPENAI_API_KEY}}"

[provider.anthropic]
api_key = "{{env:ANTHROPIC_API_KEY}}"

[provider.openrouter]
api_key = "{{env:OPENROUTER_API_KEY}}"

[provider.ollama]
base_url = "http://localhost:11434"

[lookup]
tmdb_api_key = "{{env:TMDB_API_KEY}}"
serpapi_api_key = "{{env:SERPAPI_KEY}}"
"#,
        model = default_model(),
        provider = DEFAULT_PROVIDER,
        temperature = DEFAULT_TEMPERATURE,
        max_tokens = MAX_TOKENS,
        max_lookups = MAX_LOOKUPS_PER_TURN,
        completion_secs = COMPLETION_TIMEOUT_SECS,
        lookup_secs = LOOKUP_TIMEOUT_SECS,
    )
}
