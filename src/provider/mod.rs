//! LLM provider abstraction for reel.
//!
//! [`CompletionClient`] is the boundary the dispatch loop talks to: a
//! transcript goes in, a lazy stream of text fragments comes out.
//! [`Provider`] implements it on top of rig-core for Anthropic, OpenAI,
//! OpenRouter, and Ollama (local) via [`kind::ProviderKind`].

mod client;
mod completion;
mod kind;
mod resolve;

pub use client::Provider;
pub use completion::{
    CompletionClient, CompletionError, CompletionEvent, CompletionStream, GenerationParams,
};
pub use resolve::{resolve_model, ModelSelection};
