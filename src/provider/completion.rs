//! The streaming completion boundary.

use futures::stream::LocalBoxStream;
use thiserror::Error;

use crate::config::Config;
use crate::message::Message;

use super::resolve::ModelSelection;

/// One item of a completion stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionEvent {
    /// A text fragment to append to the reply.
    Token(String),
    /// The service finished the reply. Nothing follows this event.
    Complete,
}

/// Transport failure of a completion call. Fatal to the current turn.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompletionError {
    #[error("streaming error: {0}")]
    Stream(String),
    #[error("completion timed out after {0}s")]
    Timeout(u64),
    #[error("stream ended before the reply was complete")]
    Truncated,
}

/// Lazy, cancellable sequence of completion events. Dropping it cancels the
/// underlying request.
pub type CompletionStream<'a> = LocalBoxStream<'a, Result<CompletionEvent, CompletionError>>;

/// Model settings shared by every completion call of a process.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u64,
}

impl GenerationParams {
    pub fn from_config(config: &Config, selection: &ModelSelection) -> Self {
        Self {
            model: selection.model.clone(),
            temperature: config.temperature(),
            max_tokens: config.max_tokens(),
        }
    }
}

/// A streaming text generator.
///
/// Implementations must not do network work before the returned stream is
/// first polled, and must finish a successful reply with
/// [`CompletionEvent::Complete`].
pub trait CompletionClient {
    fn stream_completion<'a>(
        &'a self,
        messages: &'a [Message],
        params: &'a GenerationParams,
    ) -> CompletionStream<'a>;
}
