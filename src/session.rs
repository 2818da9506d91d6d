//! In-memory chat sessions.
//!
//! A [`ChatSession`] owns one [`Transcript`] and an identifier for log
//! correlation. Sessions are not persisted; each one lives for a single
//! `reel chat` run (or until `/new`). Several sessions may share one
//! [`Dispatcher`] since all per-conversation state lives here.

use tracing::info_span;
use tracing::Instrument;
use uuid::Uuid;

use crate::dispatch::{Dispatcher, TurnOutcome};
use crate::output::Renderer;
use crate::provider::CompletionError;
use crate::transcript::Transcript;

pub struct ChatSession {
    id: Uuid,
    transcript: Transcript,
}

impl ChatSession {
    /// Starts a session whose transcript holds only `system_prompt`.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            transcript: Transcript::new(system_prompt),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// First 8 characters of the id, for display.
    pub fn short_id(&self) -> String {
        self.id.to_string()[..8].to_string()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Runs one user turn against this session's transcript.
    pub async fn send(
        &mut self,
        dispatcher: &Dispatcher<'_>,
        text: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<TurnOutcome, CompletionError> {
        let span = info_span!("turn", session = %self.id());
        dispatcher
            .run_turn(&mut self.transcript, text, renderer)
            .instrument(span)
            .await
    }
}
