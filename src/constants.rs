//! Centralized constants for reel.
//!
//! All magic numbers, default strings, and configuration constants live here
//! so they can be changed in one place.

/// Application name used in CLI output and directory paths.
pub const APP_NAME: &str = "reel";

/// Default LLM model identifier.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Default sampling temperature for completions.
pub const DEFAULT_TEMPERATURE: f64 = 0.2;

/// Maximum tokens for LLM completions.
pub const MAX_TOKENS: u64 = 500;

/// Default system prompt placed first in every transcript.
///
/// The function list is appended from the call grammar table at runtime.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful movie chatbot that helps people explore movies that are out in \
theaters. If a user asks for recent information, output a function call and the system \
will add the result to the context. If you need to call a function, only output the \
function call. Call functions using Python syntax in plain text, no code blocks.";

/// Configuration filename.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Per-project configuration filename.
pub const PROJECT_CONFIG_FILENAME: &str = "reel.toml";

/// Readline history filename.
pub const HISTORY_FILENAME: &str = "chat_history.txt";

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV: &str = "REEL_LOG";

// --- Provider defaults ---

/// Default provider when none is configured.
pub const DEFAULT_PROVIDER: &str = "openai";

/// Default LLM model identifier for Anthropic.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-6";

/// Default LLM model identifier for OpenRouter.
pub const DEFAULT_OPENROUTER_MODEL: &str = "openai/gpt-4o";

/// Default base URL for local Ollama server.
pub const OLLAMA_DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default LLM model identifier for Ollama.
pub const OLLAMA_DEFAULT_MODEL: &str = "llama3";

// --- Dispatch loop ---

/// Maximum number of function calls dispatched for a single user message.
pub const MAX_LOOKUPS_PER_TURN: usize = 5;

/// Upper bound for one completion call, from request to the last fragment.
pub const COMPLETION_TIMEOUT_SECS: u64 = 60;

/// Upper bound for one external lookup call.
pub const LOOKUP_TIMEOUT_SECS: u64 = 15;

/// Prefix used when a mid-transcript system message is sent in a user slot.
pub const SYSTEM_CONTEXT_PREFIX: &str = "[system]";

// --- Lookup services ---

/// TMDB "now playing" endpoint.
pub const TMDB_NOW_PLAYING_URL: &str = "https://api.themoviedb.org/3/movie/now_playing";

/// SerpAPI search endpoint used for Google showtimes.
pub const SERPAPI_SEARCH_URL: &str = "https://serpapi.com/search.json";

/// Environment variable for the TMDB read access token.
pub const TMDB_API_KEY_ENV: &str = "TMDB_API_KEY";

/// Environment variable for the SerpAPI key.
pub const SERPAPI_KEY_ENV: &str = "SERPAPI_KEY";
