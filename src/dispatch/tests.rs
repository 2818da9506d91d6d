use super::*;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::message::Role;

const SYSTEM: &str = "You are a movie assistant.";

enum Reply {
    Text(&'static str),
    Fail(&'static str),
    Truncated,
    Hang,
}

/// Plays back canned replies, one per completion call.
struct ScriptedClient {
    replies: RefCell<VecDeque<Reply>>,
    seen: RefCell<Vec<(usize, String)>>,
}

impl ScriptedClient {
    fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            seen: RefCell::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.seen.borrow().len()
    }
}

impl CompletionClient for ScriptedClient {
    fn stream_completion<'a>(
        &'a self,
        messages: &'a [Message],
        _params: &'a GenerationParams,
    ) -> CompletionStream<'a> {
        let last = messages.last().map(|m| m.text().to_string()).unwrap_or_default();
        self.seen.borrow_mut().push((messages.len(), last));

        let reply = self.replies.borrow_mut().pop_front();
        match reply {
            Some(Reply::Text(text)) => {
                let mut events: Vec<_> = text
                    .split_inclusive(' ')
                    .map(|t| Ok(CompletionEvent::Token(t.to_string())))
                    .collect();
                events.push(Ok(CompletionEvent::Complete));
                stream::iter(events).boxed_local()
            }
            Some(Reply::Fail(msg)) => stream::iter(vec![
                Ok(CompletionEvent::Token("partial ".to_string())),
                Err(CompletionError::Stream(msg.to_string())),
            ])
            .boxed_local(),
            Some(Reply::Truncated) => {
                stream::iter(vec![Ok(CompletionEvent::Token("half a".to_string()))]).boxed_local()
            }
            Some(Reply::Hang) => stream::pending().boxed_local(),
            None => stream::iter(vec![Err(CompletionError::Stream(
                "script exhausted".to_string(),
            ))])
            .boxed_local(),
        }
    }
}

/// Replies with the last user message after yielding once, so concurrent
/// turns interleave.
struct EchoClient;

impl CompletionClient for EchoClient {
    fn stream_completion<'a>(
        &'a self,
        messages: &'a [Message],
        _params: &'a GenerationParams,
    ) -> CompletionStream<'a> {
        stream::once(async move {
            tokio::task::yield_now().await;
            let last_user = messages
                .iter()
                .rev()
                .find(|m| m.role() == Role::User)
                .map(|m| m.text().to_string())
                .unwrap_or_default();
            Ok(CompletionEvent::Token(format!("echo: {}", last_user)))
        })
        .chain(stream::once(async { Ok(CompletionEvent::Complete) }))
        .boxed_local()
    }
}

#[derive(Default)]
struct FakeLookup {
    now_playing_calls: AtomicUsize,
    showtimes_args: Mutex<Vec<(String, String)>>,
    fail: bool,
    slow: bool,
}

#[async_trait]
impl MovieLookup for FakeLookup {
    async fn now_playing(&self) -> Result<String, LookupError> {
        self.now_playing_calls.fetch_add(1, Ordering::SeqCst);
        if self.slow {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        if self.fail {
            return Err(LookupError::MissingCredentials("TMDB_API_KEY"));
        }
        Ok("Now Playing Movies:\nTitle: Dune\n".to_string())
    }

    async fn showtimes(&self, title: &str, location: &str) -> Result<String, LookupError> {
        self.showtimes_args
            .lock()
            .unwrap()
            .push((title.to_string(), location.to_string()));
        if self.fail {
            return Err(LookupError::NoResults(format!(
                "No showtimes found for {} in {}.",
                title, location
            )));
        }
        Ok(format!(
            "Showtimes for {} in {}:\n\nToday (Oct 19)\n  AMC 12: 7:00pm\n",
            title, location
        ))
    }
}

#[derive(Default)]
struct RecordingRenderer {
    events: Vec<String>,
}

impl Renderer for RecordingRenderer {
    fn render_start(&mut self) {
        self.events.push("start".to_string());
    }

    fn render_token(&mut self, token: &str) {
        self.events.push(format!("token:{}", token));
    }

    fn render_done(&mut self) {
        self.events.push("done".to_string());
    }

    fn render_error(&mut self, err: &str) {
        self.events.push(format!("error:{}", err));
    }

    fn lookup_start(&mut self, name: &str, args: &[String]) {
        self.events.push(format!("call:{}({})", name, args.join("|")));
    }

    fn lookup_result(&mut self, name: &str, _text: &str) {
        self.events.push(format!("result:{}", name));
    }
}

fn params() -> GenerationParams {
    GenerationParams {
        model: "test-model".to_string(),
        temperature: 0.2,
        max_tokens: 500,
    }
}

fn limits() -> DispatchLimits {
    DispatchLimits {
        max_lookups: 5,
        completion_timeout: Duration::from_secs(5),
        lookup_timeout: Duration::from_secs(5),
    }
}

fn texts(transcript: &Transcript) -> Vec<(Role, String)> {
    transcript
        .messages()
        .iter()
        .map(|m| (m.role(), m.text().to_string()))
        .collect()
}

#[tokio::test]
async fn test_plain_reply_needs_one_completion() {
    let client = ScriptedClient::new(vec![Reply::Text("Hello! Ask me about movies.")]);
    let lookup = FakeLookup::default();
    let params = params();
    let dispatcher = Dispatcher::new(&client, &lookup, &params, limits());
    let mut transcript = Transcript::new(SYSTEM);
    let mut renderer = RecordingRenderer::default();

    let outcome = dispatcher
        .run_turn(&mut transcript, "hi", &mut renderer)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        TurnOutcome::Completed {
            reply: "Hello! Ask me about movies.".to_string(),
            completions: 1,
        }
    );
    assert_eq!(
        texts(&transcript),
        [
            (Role::System, SYSTEM.to_string()),
            (Role::User, "hi".to_string()),
            (Role::Assistant, "Hello! Ask me about movies.".to_string()),
        ]
    );
    assert_eq!(client.calls(), 1);
    assert_eq!(lookup.now_playing_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_showtimes_result_is_fed_back() {
    let client = ScriptedClient::new(vec![
        Reply::Text("get_showtimes('Dune', 'Seattle')"),
        Reply::Text("Dune plays at AMC 12 at 7pm."),
    ]);
    let lookup = FakeLookup::default();
    let params = params();
    let dispatcher = Dispatcher::new(&client, &lookup, &params, limits());
    let mut transcript = Transcript::new(SYSTEM);
    let mut renderer = RecordingRenderer::default();

    let outcome = dispatcher
        .run_turn(&mut transcript, "When is Dune on in Seattle?", &mut renderer)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        TurnOutcome::Completed {
            reply: "Dune plays at AMC 12 at 7pm.".to_string(),
            completions: 2,
        }
    );
    assert_eq!(
        *lookup.showtimes_args.lock().unwrap(),
        [("Dune".to_string(), "Seattle".to_string())]
    );

    let entries = texts(&transcript);
    assert_eq!(entries.len(), 5);
    assert_eq!(entries[2].0, Role::Assistant);
    assert_eq!(entries[3].0, Role::System);
    assert!(entries[3].1.starts_with("Showtimes for Dune in Seattle:"));
    assert_eq!(entries[4].0, Role::Assistant);

    // The second completion saw the injected result as its last message.
    let seen = client.seen.borrow();
    assert_eq!(seen[0].0, 2);
    assert_eq!(seen[1].0, 4);
    assert!(seen[1].1.starts_with("Showtimes for Dune in Seattle:"));
}

#[tokio::test]
async fn test_buy_then_confirm_across_turns() {
    let client = ScriptedClient::new(vec![
        Reply::Text("buy_ticket('AMC 12', 'Dune', '7pm')"),
        Reply::Text("Shall I buy one ticket for Dune at AMC 12 at 7pm?"),
        Reply::Text("confirm_ticket_purchase(AMC 12, Dune, 7pm)"),
        Reply::Text("Done, enjoy the movie!"),
    ]);
    let lookup = FakeLookup::default();
    let params = params();
    let dispatcher = Dispatcher::new(&client, &lookup, &params, limits());
    let mut transcript = Transcript::new(SYSTEM);
    let mut renderer = RecordingRenderer::default();

    dispatcher
        .run_turn(&mut transcript, "Buy a ticket for Dune at 7pm", &mut renderer)
        .await
        .unwrap();
    assert_eq!(
        transcript.messages()[3].text(),
        "Ask user for purchase ticket confirmation for Dune at AMC 12 for 7pm."
    );

    dispatcher
        .run_turn(&mut transcript, "yes", &mut renderer)
        .await
        .unwrap();
    assert_eq!(
        transcript.messages()[7].text(),
        "Ticket purchased for Dune at AMC 12 for 7pm."
    );
    assert_eq!(transcript.len(), 9);
    assert_eq!(client.calls(), 4);
}

#[tokio::test]
async fn test_unclosed_call_is_reported_to_model() {
    let client = ScriptedClient::new(vec![
        Reply::Text("get_showtimes('Dune', 'Seattle'"),
        Reply::Text("Sorry, let me answer without that."),
    ]);
    let lookup = FakeLookup::default();
    let params = params();
    let dispatcher = Dispatcher::new(&client, &lookup, &params, limits());
    let mut transcript = Transcript::new(SYSTEM);
    let mut renderer = RecordingRenderer::default();

    let outcome = dispatcher
        .run_turn(&mut transcript, "showtimes?", &mut renderer)
        .await
        .unwrap();

    assert!(matches!(outcome, TurnOutcome::Completed { completions: 2, .. }));
    assert_eq!(
        transcript.messages()[3].text(),
        "Error extracting function call: no closing parenthesis after `get_showtimes(`"
    );
    assert!(lookup.showtimes_args.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_argument_is_reported_to_model() {
    let client = ScriptedClient::new(vec![
        Reply::Text("get_showtimes('Dune')"),
        Reply::Text("Which city are you in?"),
    ]);
    let lookup = FakeLookup::default();
    let params = params();
    let dispatcher = Dispatcher::new(&client, &lookup, &params, limits());
    let mut transcript = Transcript::new(SYSTEM);
    let mut renderer = RecordingRenderer::default();

    dispatcher
        .run_turn(&mut transcript, "When is Dune on?", &mut renderer)
        .await
        .unwrap();

    assert_eq!(
        transcript.messages()[3].text(),
        "Error extracting arguments for get_showtimes(): \
get_showtimes() is missing argument 1 (location)"
    );
    assert!(lookup.showtimes_args.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_lookup_failure_is_reported_to_model() {
    let client = ScriptedClient::new(vec![
        Reply::Text("get_showtimes('Dune', 'Nowhere')"),
        Reply::Text("I couldn't find showtimes there."),
    ]);
    let lookup = FakeLookup {
        fail: true,
        ..Default::default()
    };
    let params = params();
    let dispatcher = Dispatcher::new(&client, &lookup, &params, limits());
    let mut transcript = Transcript::new(SYSTEM);
    let mut renderer = RecordingRenderer::default();

    let outcome = dispatcher
        .run_turn(&mut transcript, "Dune in Nowhere?", &mut renderer)
        .await
        .unwrap();

    assert!(matches!(outcome, TurnOutcome::Completed { .. }));
    assert_eq!(
        transcript.messages()[3].text(),
        "Error calling get_showtimes(): No showtimes found for Dune in Nowhere."
    );
}

#[tokio::test]
async fn test_slow_lookup_times_out() {
    let client = ScriptedClient::new(vec![
        Reply::Text("get_now_playing()"),
        Reply::Text("The listings service is slow right now."),
    ]);
    let lookup = FakeLookup {
        slow: true,
        ..Default::default()
    };
    let params = params();
    let dispatcher = Dispatcher::new(
        &client,
        &lookup,
        &params,
        DispatchLimits {
            lookup_timeout: Duration::from_millis(20),
            ..limits()
        },
    );
    let mut transcript = Transcript::new(SYSTEM);
    let mut renderer = RecordingRenderer::default();

    let outcome = dispatcher
        .run_turn(&mut transcript, "what's on?", &mut renderer)
        .await
        .unwrap();

    assert!(matches!(outcome, TurnOutcome::Completed { completions: 2, .. }));
    assert!(transcript.messages()[3]
        .text()
        .starts_with("Error calling get_now_playing(): timed out"));
}

#[tokio::test]
async fn test_only_first_call_per_reply_runs() {
    let client = ScriptedClient::new(vec![
        Reply::Text("get_now_playing() and then get_showtimes('Dune', 'Seattle')"),
        Reply::Text("Here is what's playing."),
    ]);
    let lookup = FakeLookup::default();
    let params = params();
    let dispatcher = Dispatcher::new(&client, &lookup, &params, limits());
    let mut transcript = Transcript::new(SYSTEM);
    let mut renderer = RecordingRenderer::default();

    dispatcher
        .run_turn(&mut transcript, "what's on?", &mut renderer)
        .await
        .unwrap();

    assert_eq!(lookup.now_playing_calls.load(Ordering::SeqCst), 1);
    assert!(lookup.showtimes_args.lock().unwrap().is_empty());
    assert_eq!(transcript.len(), 5);
}

#[tokio::test]
async fn test_call_budget_aborts_turn() {
    let client = ScriptedClient::new(vec![
        Reply::Text("get_now_playing()"),
        Reply::Text("get_now_playing()"),
        Reply::Text("get_now_playing()"),
        Reply::Text("never requested"),
    ]);
    let lookup = FakeLookup::default();
    let params = params();
    let dispatcher = Dispatcher::new(
        &client,
        &lookup,
        &params,
        DispatchLimits {
            max_lookups: 2,
            ..limits()
        },
    );
    let mut transcript = Transcript::new(SYSTEM);
    let mut renderer = RecordingRenderer::default();

    let outcome = dispatcher
        .run_turn(&mut transcript, "loop forever", &mut renderer)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        TurnOutcome::Aborted {
            reason: "stopped after 2 function calls in one turn".to_string(),
            completions: 3,
        }
    );
    assert_eq!(lookup.now_playing_calls.load(Ordering::SeqCst), 2);
    assert_eq!(client.calls(), 3);
    // sys, user, then (assistant, system) twice, then the final assistant.
    assert_eq!(transcript.len(), 7);
    assert_eq!(transcript.messages().last().map(|m| m.role()), Some(Role::Assistant));
    assert_eq!(
        renderer.events.last().map(String::as_str),
        Some("error:stopped after 2 function calls in one turn")
    );
}

#[tokio::test]
async fn test_transport_failure_appends_no_reply() {
    let client = ScriptedClient::new(vec![Reply::Fail("connection reset"), Reply::Text("Back online.")]);
    let lookup = FakeLookup::default();
    let params = params();
    let dispatcher = Dispatcher::new(&client, &lookup, &params, limits());
    let mut transcript = Transcript::new(SYSTEM);
    let mut renderer = RecordingRenderer::default();

    let err = dispatcher
        .run_turn(&mut transcript, "hi", &mut renderer)
        .await
        .unwrap_err();

    assert_eq!(err, CompletionError::Stream("connection reset".to_string()));
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript.messages().last().map(|m| m.role()), Some(Role::User));
    assert_eq!(
        renderer.events.last().map(String::as_str),
        Some("error:streaming error: connection reset")
    );

    // The session is still usable.
    let outcome = dispatcher
        .run_turn(&mut transcript, "hi again", &mut renderer)
        .await
        .unwrap();
    assert!(matches!(outcome, TurnOutcome::Completed { .. }));
    assert_eq!(transcript.len(), 4);
}

#[tokio::test]
async fn test_failure_after_lookup_keeps_earlier_entries() {
    let client = ScriptedClient::new(vec![Reply::Text("get_now_playing()"), Reply::Fail("boom")]);
    let lookup = FakeLookup::default();
    let params = params();
    let dispatcher = Dispatcher::new(&client, &lookup, &params, limits());
    let mut transcript = Transcript::new(SYSTEM);
    let mut renderer = RecordingRenderer::default();

    let result = dispatcher
        .run_turn(&mut transcript, "what's on?", &mut renderer)
        .await;

    assert!(result.is_err());
    let roles: Vec<Role> = transcript.messages().iter().map(|m| m.role()).collect();
    assert_eq!(
        roles,
        [Role::System, Role::User, Role::Assistant, Role::System]
    );
}

#[tokio::test]
async fn test_stream_without_complete_is_truncated() {
    let client = ScriptedClient::new(vec![Reply::Truncated]);
    let lookup = FakeLookup::default();
    let params = params();
    let dispatcher = Dispatcher::new(&client, &lookup, &params, limits());
    let mut transcript = Transcript::new(SYSTEM);
    let mut renderer = RecordingRenderer::default();

    let err = dispatcher
        .run_turn(&mut transcript, "hi", &mut renderer)
        .await
        .unwrap_err();

    assert_eq!(err, CompletionError::Truncated);
    assert_eq!(transcript.len(), 2);
}

#[tokio::test]
async fn test_hung_completion_times_out() {
    let client = ScriptedClient::new(vec![Reply::Hang]);
    let lookup = FakeLookup::default();
    let params = params();
    let dispatcher = Dispatcher::new(
        &client,
        &lookup,
        &params,
        DispatchLimits {
            completion_timeout: Duration::from_millis(20),
            ..limits()
        },
    );
    let mut transcript = Transcript::new(SYSTEM);
    let mut renderer = RecordingRenderer::default();

    let err = dispatcher
        .run_turn(&mut transcript, "hi", &mut renderer)
        .await
        .unwrap_err();

    assert!(matches!(err, CompletionError::Timeout(_)));
    assert_eq!(transcript.len(), 2);
}

#[tokio::test]
async fn test_transcript_only_grows() {
    let client = ScriptedClient::new(vec![
        Reply::Text("get_now_playing()"),
        Reply::Text("Dune is playing."),
        Reply::Text("get_showtimes(Dune, Seattle)"),
        Reply::Text("7pm at AMC 12."),
        Reply::Text("You're welcome."),
    ]);
    let lookup = FakeLookup::default();
    let params = params();
    let dispatcher = Dispatcher::new(&client, &lookup, &params, limits());
    let mut transcript = Transcript::new(SYSTEM);
    let mut renderer = RecordingRenderer::default();

    let mut previous = transcript.messages().to_vec();
    for text in ["what's on?", "when in Seattle?", "thanks"] {
        dispatcher
            .run_turn(&mut transcript, text, &mut renderer)
            .await
            .unwrap();
        assert!(transcript.len() > previous.len());
        assert_eq!(&transcript.messages()[..previous.len()], previous.as_slice());
        assert_eq!(transcript.messages()[0], Message::system(SYSTEM));
        previous = transcript.messages().to_vec();
    }
    assert_eq!(transcript.len(), 1 + 4 + 4 + 2);
}

#[tokio::test]
async fn test_sessions_share_dispatcher_without_mixing() {
    let client = EchoClient;
    let lookup = FakeLookup::default();
    let params = params();
    let dispatcher = Dispatcher::new(&client, &lookup, &params, limits());

    let mut first = Transcript::new(SYSTEM);
    let mut second = Transcript::new(SYSTEM);
    let mut first_renderer = RecordingRenderer::default();
    let mut second_renderer = RecordingRenderer::default();

    let (a, b) = tokio::join!(
        dispatcher.run_turn(&mut first, "alpha", &mut first_renderer),
        dispatcher.run_turn(&mut second, "beta", &mut second_renderer),
    );

    assert_eq!(
        a.unwrap(),
        TurnOutcome::Completed {
            reply: "echo: alpha".to_string(),
            completions: 1,
        }
    );
    assert_eq!(
        b.unwrap(),
        TurnOutcome::Completed {
            reply: "echo: beta".to_string(),
            completions: 1,
        }
    );
    assert_eq!(first.messages()[1].text(), "alpha");
    assert_eq!(second.messages()[1].text(), "beta");
    assert_eq!(first.len(), 3);
    assert_eq!(second.len(), 3);
}

#[tokio::test]
async fn test_renderer_sees_each_message_open_tokens_close() {
    let client = ScriptedClient::new(vec![
        Reply::Text("get_now_playing()"),
        Reply::Text("Dune is playing."),
    ]);
    let lookup = FakeLookup::default();
    let params = params();
    let dispatcher = Dispatcher::new(&client, &lookup, &params, limits());
    let mut transcript = Transcript::new(SYSTEM);
    let mut renderer = RecordingRenderer::default();

    dispatcher
        .run_turn(&mut transcript, "what's on?", &mut renderer)
        .await
        .unwrap();

    assert_eq!(
        renderer.events,
        [
            "start",
            "token:get_now_playing()",
            "done",
            "call:get_now_playing()",
            "result:get_now_playing",
            "start",
            "token:Dune ",
            "token:is ",
            "token:playing.",
            "done",
        ]
    );
}

#[tokio::test]
async fn test_step_without_call_terminates() {
    let client = ScriptedClient::new(Vec::new());
    let lookup = FakeLookup::default();
    let params = params();
    let dispatcher = Dispatcher::new(&client, &lookup, &params, limits());
    let mut renderer = RecordingRenderer::default();

    let step = dispatcher
        .step("Dune is great, see it in IMAX.", 0, &mut renderer)
        .await;
    assert_eq!(step, Step::Terminate("Dune is great, see it in IMAX.".to_string()));

    // The budget is checked before anything runs, even for a malformed call.
    let step = dispatcher
        .step("get_showtimes(Dune", 5, &mut renderer)
        .await;
    assert_eq!(
        step,
        Step::Aborted("stopped after 5 function calls in one turn".to_string())
    );
    assert!(renderer.events.is_empty());
}

#[tokio::test]
async fn test_dropping_turn_during_stream_stops_mutation() {
    let client = ScriptedClient::new(vec![Reply::Hang]);
    let lookup = FakeLookup::default();
    let params = params();
    let dispatcher = Dispatcher::new(&client, &lookup, &params, limits());
    let mut transcript = Transcript::new(SYSTEM);
    let mut renderer = RecordingRenderer::default();

    let finished = tokio::select! {
        result = dispatcher.run_turn(&mut transcript, "hi", &mut renderer) => Some(result),
        _ = tokio::time::sleep(Duration::from_millis(20)) => None,
    };
    assert!(finished.is_none());

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(
        texts(&transcript),
        [
            (Role::System, SYSTEM.to_string()),
            (Role::User, "hi".to_string()),
        ]
    );
    assert_eq!(renderer.events, ["start"]);
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn test_dropping_turn_during_lookup_stops_mutation() {
    let client = ScriptedClient::new(vec![
        Reply::Text("get_now_playing()"),
        Reply::Text("never requested"),
    ]);
    let lookup = FakeLookup {
        slow: true,
        ..Default::default()
    };
    let params = params();
    let dispatcher = Dispatcher::new(&client, &lookup, &params, limits());
    let mut transcript = Transcript::new(SYSTEM);
    let mut renderer = RecordingRenderer::default();

    let finished = tokio::select! {
        result = dispatcher.run_turn(&mut transcript, "what's on?", &mut renderer) => Some(result),
        _ = tokio::time::sleep(Duration::from_millis(50)) => None,
    };
    assert!(finished.is_none());

    tokio::time::sleep(Duration::from_millis(50)).await;
    let roles: Vec<Role> = transcript.messages().iter().map(|m| m.role()).collect();
    assert_eq!(roles, [Role::System, Role::User, Role::Assistant]);
    assert_eq!(transcript.messages()[2].text(), "get_now_playing()");
    assert_eq!(lookup.now_playing_calls.load(Ordering::SeqCst), 1);
    assert_eq!(client.calls(), 1);
    assert_eq!(
        renderer.events.last().map(String::as_str),
        Some("call:get_now_playing()")
    );
}
