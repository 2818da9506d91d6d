//! Environment variable substitution, key resolution and setting accessors.

use super::types::{Config, ProviderEntry};

use crate::calls::CallName;
use crate::constants::{
    COMPLETION_TIMEOUT_SECS, DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPERATURE, LOOKUP_TIMEOUT_SECS,
    MAX_LOOKUPS_PER_TURN, MAX_TOKENS, SERPAPI_KEY_ENV, TMDB_API_KEY_ENV,
};

impl Config {
    /// Resolve {env:VAR_NAME} patterns in string fields.
    pub(super) fn resolve_substitutions(&mut self) {
        self.model = Self::resolve_str(&self.model);
        if let Some(ref mut sp) = self.system_prompt {
            *sp = Self::resolve_str(sp);
        }
        if let Some(ref mut dp) = self.default_provider {
            *dp = Self::resolve_str(dp);
        }
        Self::resolve_provider_entry(&mut self.provider.openai);
        Self::resolve_provider_entry(&mut self.provider.anthropic);
        Self::resolve_provider_entry(&mut self.provider.ollama);
        Self::resolve_provider_entry(&mut self.provider.openrouter);
        if let Some(ref mut key) = self.lookup.tmdb_api_key {
            *key = Self::resolve_str(key);
        }
        if let Some(ref mut key) = self.lookup.serpapi_api_key {
            *key = Self::resolve_str(key);
        }
    }

    /// Resolves `{env:VAR}` patterns in a single provider entry's `api_key` and `base_url`.
    fn resolve_provider_entry(entry: &mut Option<ProviderEntry>) {
        if let Some(ref mut e) = entry {
            if let Some(ref mut key) = e.api_key {
                *key = Self::resolve_str(key);
            }
            if let Some(ref mut url) = e.base_url {
                *url = Self::resolve_str(url);
            }
        }
    }

    /// Replace {env:VAR} with the environment variable value.
    /// Unset variables become empty strings.
    fn resolve_str(s: &str) -> String {
        let mut result = s.to_string();
        while let Some(start) = result.find("{env:") {
            let Some(end) = result[start..].find('}') else {
                break;
            };
            let var_name = &result[start + 5..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
        }
        result
    }

    /// Resolve API key for a provider: env var first, then config value.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        let env_key = format!("{}_API_KEY", provider.to_uppercase());
        if let Some(val) = non_empty_env(&env_key) {
            return Some(val);
        }

        let entry = match provider {
            "openai" => &self.provider.openai,
            "anthropic" => &self.provider.anthropic,
            "ollama" => &self.provider.ollama,
            "openrouter" => &self.provider.openrouter,
            _ => &None,
        };
        entry
            .as_ref()
            .and_then(|e| e.api_key.clone())
            .filter(|k| !k.is_empty())
    }

    /// Resolve a movie data key (`"tmdb"` or `"serpapi"`): env var first, then config.
    pub fn resolve_lookup_key(&self, service: &str) -> Option<String> {
        let (env_key, configured) = match service {
            "tmdb" => (TMDB_API_KEY_ENV, &self.lookup.tmdb_api_key),
            "serpapi" => (SERPAPI_KEY_ENV, &self.lookup.serpapi_api_key),
            _ => return None,
        };
        non_empty_env(env_key).or_else(|| configured.clone().filter(|k| !k.is_empty()))
    }

    /// Get the configured default provider name, if any.
    pub fn provider_name(&self) -> Option<&str> {
        self.default_provider.as_deref()
    }

    /// Get the model name from config, stripping provider prefix if present.
    /// Returns None if the model is the compile-time default (meaning user hasn't configured it).
    pub fn model_name(&self) -> Option<String> {
        let m = &self.model;
        if m == crate::constants::DEFAULT_MODEL {
            return None;
        }
        if let Some((_prov, model)) = m.split_once('/') {
            Some(model.to_string())
        } else {
            Some(m.to_string())
        }
    }

    pub fn temperature(&self) -> f64 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn max_tokens(&self) -> u64 {
        self.max_tokens.unwrap_or(MAX_TOKENS)
    }

    pub fn max_lookups_per_turn(&self) -> usize {
        self.max_lookups_per_turn.unwrap_or(MAX_LOOKUPS_PER_TURN)
    }

    pub fn completion_timeout_secs(&self) -> u64 {
        self.timeouts.completion_secs.unwrap_or(COMPLETION_TIMEOUT_SECS)
    }

    pub fn lookup_timeout_secs(&self) -> u64 {
        self.timeouts.lookup_secs.unwrap_or(LOOKUP_TIMEOUT_SECS)
    }

    /// The full system prompt: configured (or default) instructions followed
    /// by the list of callable functions.
    pub fn system_prompt(&self) -> String {
        let instructions = self
            .system_prompt
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);
        let functions: Vec<String> = CallName::ALL.iter().map(|c| c.signature()).collect();
        format!(
            "{}\n\nYou have access to the following functions:\n\n{}\n",
            instructions.trim_end(),
            functions.join("\n")
        )
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
