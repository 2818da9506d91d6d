//! The dispatch loop: generate, look for a call, run it, feed it back.
//!
//! [`Dispatcher::run_turn`] drives one user message to completion. Each
//! iteration streams one reply, appends it, and inspects it with
//! [`calls::detect`]. A detected call is executed and its result appended as
//! a system message before the model is asked again. The loop ends when a
//! reply contains no call, or when the per-turn call budget is spent.
//!
//! Extraction and lookup failures never end a turn: their text is handed to
//! the model as context. Only transport failures of the completion call do,
//! and those leave no assistant entry behind.

use futures::StreamExt;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::calls::{self, CallName, DetectedCall, ExtractionError};
use crate::config::Config;
use crate::lookup::{tickets, LookupError, MovieLookup};
use crate::message::Message;
use crate::output::Renderer;
use crate::provider::{
    CompletionClient, CompletionError, CompletionEvent, CompletionStream, GenerationParams,
};
use crate::transcript::Transcript;

/// Bounds applied to every turn.
#[derive(Debug, Clone)]
pub struct DispatchLimits {
    /// Function calls dispatched per user message before the turn is aborted.
    pub max_lookups: usize,
    pub completion_timeout: Duration,
    pub lookup_timeout: Duration,
}

impl DispatchLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_lookups: config.max_lookups_per_turn(),
            completion_timeout: Duration::from_secs(config.completion_timeout_secs()),
            lookup_timeout: Duration::from_secs(config.lookup_timeout_secs()),
        }
    }
}

impl Default for DispatchLimits {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// What to do after inspecting one reply.
#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    /// Append this system context and ask the model again.
    Continue(String),
    /// The reply is final.
    Terminate(String),
    /// Stop without a final reply.
    Aborted(String),
}

/// How a turn ended. Transport failures are reported as errors instead.
#[derive(Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed { reply: String, completions: usize },
    Aborted { reason: String, completions: usize },
}

/// Runs turns against one completion client and one lookup backend.
///
/// Holds no conversation state; any number of sessions can share it.
pub struct Dispatcher<'a> {
    client: &'a dyn CompletionClient,
    lookup: &'a dyn MovieLookup,
    params: &'a GenerationParams,
    limits: DispatchLimits,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        client: &'a dyn CompletionClient,
        lookup: &'a dyn MovieLookup,
        params: &'a GenerationParams,
        limits: DispatchLimits,
    ) -> Self {
        Self {
            client,
            lookup,
            params,
            limits,
        }
    }

    /// Appends `user_text` and loops until the model gives a final answer.
    ///
    /// # Errors
    ///
    /// Returns a [`CompletionError`] if a completion call fails, times out,
    /// or its stream ends early. Entries appended before the failure stay;
    /// the failed reply is never appended.
    pub async fn run_turn(
        &self,
        transcript: &mut Transcript,
        user_text: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<TurnOutcome, CompletionError> {
        transcript.push(Message::user(user_text));

        let mut completions = 0;
        let mut lookups = 0;
        loop {
            debug!(completion = completions + 1, transcript_len = transcript.len(), "requesting completion");
            let reply = self.generate(transcript, renderer).await?;
            completions += 1;
            transcript.push(Message::assistant(reply.clone()));

            match self.step(&reply, lookups, renderer).await {
                Step::Continue(context) => {
                    transcript.push(Message::system(context));
                    lookups += 1;
                }
                Step::Terminate(reply) => {
                    debug!(completions, lookups, "turn complete");
                    return Ok(TurnOutcome::Completed { reply, completions });
                }
                Step::Aborted(reason) => {
                    warn!(completions, lookups, %reason, "turn aborted");
                    renderer.render_error(&reason);
                    return Ok(TurnOutcome::Aborted {
                        reason,
                        completions,
                    });
                }
            }
        }
    }

    /// Streams one reply to the renderer and returns its full text.
    async fn generate(
        &self,
        transcript: &Transcript,
        renderer: &mut dyn Renderer,
    ) -> Result<String, CompletionError> {
        renderer.render_start();
        let stream = self
            .client
            .stream_completion(transcript.messages(), self.params);
        let result = tokio::time::timeout(self.limits.completion_timeout, drain(stream, renderer))
            .await
            .unwrap_or_else(|_| {
                Err(CompletionError::Timeout(
                    self.limits.completion_timeout.as_secs(),
                ))
            });

        match &result {
            Ok(_) => renderer.render_done(),
            Err(err) => {
                warn!(%err, "completion failed");
                renderer.render_error(&err.to_string());
            }
        }
        result
    }

    /// Decides what follows `reply`, running the call it contains if any.
    async fn step(&self, reply: &str, lookups_done: usize, renderer: &mut dyn Renderer) -> Step {
        let Some(detected) = calls::detect(reply) else {
            return Step::Terminate(reply.to_string());
        };

        if lookups_done >= self.limits.max_lookups {
            return Step::Aborted(format!(
                "stopped after {} function calls in one turn",
                lookups_done
            ));
        }

        let context = match detected {
            Ok(call) => {
                info!(call = %call.name, args = ?call.arguments, "dispatching function call");
                renderer.lookup_start(call.name.as_str(), &call.arguments);
                let text = self.execute(&call).await;
                renderer.lookup_result(call.name.as_str(), &text);
                text
            }
            Err(err) => {
                warn!(%err, "could not read function call");
                format!("Error extracting function call: {}", err)
            }
        };
        Step::Continue(context)
    }

    /// Runs `call` and returns the text for the transcript, success or not.
    async fn execute(&self, call: &DetectedCall) -> String {
        let name = call.name;
        match name {
            CallName::GetNowPlaying => self
                .bounded(self.lookup.now_playing())
                .await
                .unwrap_or_else(|err| lookup_failure(name, err)),
            CallName::GetShowtimes => {
                let (title, location) = match two_args(call) {
                    Ok(args) => args,
                    Err(err) => return extraction_failure(name, err),
                };
                self.bounded(self.lookup.showtimes(title, location))
                    .await
                    .unwrap_or_else(|err| lookup_failure(name, err))
            }
            CallName::BuyTicket => match three_args(call) {
                Ok((theater, movie, showtime)) => {
                    tickets::purchase_confirmation_request(theater, movie, showtime)
                }
                Err(err) => extraction_failure(name, err),
            },
            CallName::ConfirmTicketPurchase => match three_args(call) {
                Ok((theater, movie, showtime)) => {
                    tickets::purchase_confirmed(theater, movie, showtime)
                }
                Err(err) => extraction_failure(name, err),
            },
        }
    }

    /// Applies the lookup timeout to one lookup future.
    async fn bounded(
        &self,
        lookup: impl Future<Output = Result<String, LookupError>>,
    ) -> Result<String, LookupError> {
        tokio::time::timeout(self.limits.lookup_timeout, lookup)
            .await
            .unwrap_or_else(|_| Err(LookupError::Timeout(self.limits.lookup_timeout.as_secs())))
    }
}

/// Collects a reply, forwarding each token. Requires the `Complete` event.
async fn drain(
    mut stream: CompletionStream<'_>,
    renderer: &mut dyn Renderer,
) -> Result<String, CompletionError> {
    let mut full = String::new();
    while let Some(event) = stream.next().await {
        match event? {
            CompletionEvent::Token(token) => {
                renderer.render_token(&token);
                full.push_str(&token);
            }
            CompletionEvent::Complete => return Ok(full),
        }
    }
    Err(CompletionError::Truncated)
}

fn two_args(call: &DetectedCall) -> Result<(&str, &str), ExtractionError> {
    Ok((call.arg(0)?, call.arg(1)?))
}

fn three_args(call: &DetectedCall) -> Result<(&str, &str, &str), ExtractionError> {
    Ok((call.arg(0)?, call.arg(1)?, call.arg(2)?))
}

fn extraction_failure(name: CallName, err: ExtractionError) -> String {
    warn!(call = %name, %err, "bad function call arguments");
    format!("Error extracting arguments for {}(): {}", name, err)
}

fn lookup_failure(name: CallName, err: LookupError) -> String {
    warn!(call = %name, %err, "lookup failed");
    format!("Error calling {}(): {}", name, err)
}

#[cfg(test)]
mod tests;
