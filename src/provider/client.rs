//! rig-core backed implementation of the completion boundary.
//!
//! Contains the [`Provider`] struct which wraps rig-core provider clients
//! behind enum dispatch, keeping provider-specific details out of the
//! dispatch loop. Supports Anthropic, OpenAI, OpenRouter, and Ollama.

use anyhow::{Context, Result};
use futures::{future, stream, StreamExt};
use rig::agent::MultiTurnStreamItem;
use rig::client::CompletionClient as _;
use rig::message::{Message as RigMessage, Text};
use rig::providers::{anthropic, openai, openrouter};
use rig::streaming::{StreamedAssistantContent, StreamingChat};

use super::completion::{
    CompletionClient, CompletionError, CompletionEvent, CompletionStream, GenerationParams,
};
use super::kind::ProviderKind;
use super::resolve::ModelSelection;
use crate::config::Config;
use crate::constants::SYSTEM_CONTEXT_PREFIX;
use crate::message::{Message, Role};

/// Internal enum wrapping provider-specific clients.
enum ClientKind {
    Anthropic(anthropic::Client),
    OpenAI(openai::Client),
    OpenRouter(openrouter::Client),
    Ollama(openai::Client),
}

/// A configured LLM provider ready to stream completions.
///
/// Agents are constructed on each call since they are cheap to create and
/// the generation parameters travel with the request.
pub struct Provider {
    client: ClientKind,
}

/// Builds an agent from the given client and generation parameters, then
/// executes the provided block with the agent bound to `$agent`.
macro_rules! with_agent {
    ($client:expr, $params:expr, $sys:expr, |$agent:ident| $body:expr) => {{
        let $agent = if let Some(sys) = $sys {
            $client
                .agent($params.model.as_str())
                .preamble(sys)
                .temperature($params.temperature)
                .max_tokens($params.max_tokens)
                .build()
        } else {
            $client
                .agent($params.model.as_str())
                .temperature($params.temperature)
                .max_tokens($params.max_tokens)
                .build()
        };
        $body
    }};
}

/// Dispatches an operation across provider-specific clients.
///
/// Matches on [`ClientKind`] and executes the same block for each variant,
/// letting the compiler monomorphize per provider.
macro_rules! dispatch {
    ($self:expr, |$client:ident| $body:expr) => {
        match &$self.client {
            ClientKind::Anthropic($client) => $body,
            ClientKind::OpenAI($client) => $body,
            ClientKind::OpenRouter($client) => $body,
            ClientKind::Ollama($client) => $body,
        }
    };
}

/// Turns a rig-core multi-turn stream into [`CompletionEvent`]s.
///
/// Text chunks become tokens, `FinalResponse` becomes `Complete` and errors
/// end the turn. Tool calls and reasoning carry nothing the dispatch loop
/// reads. A stream that stops before `FinalResponse` yields no `Complete`.
macro_rules! into_fragments {
    ($stream:expr) => {
        $stream
            .filter_map(|item| {
                future::ready(match item {
                    Ok(MultiTurnStreamItem::StreamAssistantItem(
                        StreamedAssistantContent::Text(Text { text }),
                    )) => Some(Ok(CompletionEvent::Token(text))),
                    Ok(MultiTurnStreamItem::FinalResponse(_)) => Some(Ok(CompletionEvent::Complete)),
                    Ok(_) => None,
                    Err(err) => Some(Err(CompletionError::Stream(err.to_string()))),
                })
            })
            .boxed_local()
    };
}

impl Provider {
    /// Creates a new [`Provider`] from the loaded application config.
    ///
    /// Resolves the API key through reel's config precedence chain
    /// (env var → config file → substitution) and builds the appropriate
    /// provider client.
    ///
    /// # Errors
    ///
    /// Returns an error if no API key is found for the selected provider
    /// or if client construction fails.
    pub fn from_config(config: &Config, selection: &ModelSelection) -> Result<Self> {
        let client = match selection.provider {
            ProviderKind::Anthropic => {
                let api_key = config
                    .resolve_api_key("anthropic")
                    .context("No API key found for Anthropic. Set ANTHROPIC_API_KEY or configure it in config.toml")?;
                ClientKind::Anthropic(
                    anthropic::Client::new(&api_key)
                        .context("Failed to create Anthropic client")?,
                )
            }
            ProviderKind::OpenAI => {
                let api_key = config
                    .resolve_api_key("openai")
                    .context("No API key found for OpenAI. Set OPENAI_API_KEY or configure it in config.toml")?;
                ClientKind::OpenAI(
                    openai::Client::new(&api_key).context("Failed to create OpenAI client")?,
                )
            }
            ProviderKind::OpenRouter => {
                let api_key = config
                    .resolve_api_key("openrouter")
                    .context("No API key found for OpenRouter. Set OPENROUTER_API_KEY or configure it in config.toml")?;
                ClientKind::OpenRouter(
                    openrouter::Client::new(&api_key)
                        .context("Failed to create OpenRouter client")?,
                )
            }
            ProviderKind::Ollama => {
                let base_url = config
                    .provider
                    .ollama
                    .as_ref()
                    .and_then(|o| o.base_url.as_deref())
                    .unwrap_or(crate::constants::OLLAMA_DEFAULT_BASE_URL);
                ClientKind::Ollama(
                    openai::Client::builder()
                        .api_key("ollama")
                        .base_url(format!("{}/v1", base_url))
                        .build()
                        .context("Failed to create Ollama client")?,
                )
            }
        };
        Ok(Self { client })
    }
}

impl CompletionClient for Provider {
    fn stream_completion<'a>(
        &'a self,
        messages: &'a [Message],
        params: &'a GenerationParams,
    ) -> CompletionStream<'a> {
        let plan = ChatPlan::from_messages(messages);
        tracing::debug!(
            model = %params.model,
            history = plan.history.len(),
            "opening completion stream"
        );

        // Nothing is sent until the stream is first polled.
        let opened = async move {
            let history: Vec<RigMessage> = plan.history.iter().map(to_rig_message).collect();
            let prompt = plan.prompt;
            let fragments: CompletionStream<'a> = dispatch!(self, |client| {
                let rig_stream = with_agent!(client, params, plan.preamble.as_deref(), |agent| {
                    agent.stream_chat(prompt.clone(), history.clone()).await
                });
                into_fragments!(rig_stream)
            });
            fragments
        };

        stream::once(opened).flatten().boxed_local()
    }
}

/// A transcript split the way rig-core chat requests expect it.
#[derive(Debug, PartialEq)]
struct ChatPlan {
    /// Leading system message, sent as the agent preamble.
    preamble: Option<String>,
    /// Everything between the preamble and the prompt.
    history: Vec<Message>,
    /// The last message, sent as the prompt.
    prompt: String,
}

impl ChatPlan {
    /// Splits `messages` into preamble, history and prompt.
    ///
    /// rig-core chat history only carries user and assistant turns, so any
    /// system message after the first is re-sent as a user message tagged
    /// with [`SYSTEM_CONTEXT_PREFIX`].
    fn from_messages(messages: &[Message]) -> Self {
        let (preamble, body) = match messages.split_first() {
            Some((first, rest)) if first.role() == Role::System => {
                (Some(first.text().to_string()), rest)
            }
            _ => (None, messages),
        };

        let (prompt, history) = match body.split_last() {
            Some((last, history)) => (user_slot_text(last), history),
            None => (String::new(), body),
        };

        let history = history
            .iter()
            .map(|m| match m.role() {
                Role::System => Message::user(user_slot_text(m)),
                _ => m.clone(),
            })
            .collect();

        Self {
            preamble,
            history,
            prompt,
        }
    }
}

fn user_slot_text(msg: &Message) -> String {
    match msg.role() {
        Role::System => format!("{} {}", SYSTEM_CONTEXT_PREFIX, msg.text()),
        _ => msg.text().to_string(),
    }
}

fn to_rig_message(msg: &Message) -> RigMessage {
    match msg.role() {
        Role::Assistant => RigMessage::assistant(msg.text()),
        _ => RigMessage::user(msg.text()),
    }
}
