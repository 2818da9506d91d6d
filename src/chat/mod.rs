//! Interactive chat REPL for reel.
//!
//! Provides a multi-turn conversation loop using [`rustyline`] for readline
//! support (history, line editing). Each line is one turn of the dispatch
//! loop against the current [`ChatSession`]; the whole transcript, injected
//! lookup results included, is sent with every completion call.

mod commands;

use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, info};

use crate::config::Config;
use crate::dispatch::{Dispatcher, TurnOutcome};
use crate::output::StdoutRenderer;
use crate::session::ChatSession;

/// Runs the interactive chat REPL.
///
/// # Readline behavior
///
/// - **Ctrl+C** at the prompt: cancels current input, stays in REPL
/// - **Ctrl+C** while a reply streams: drops the turn, stays in REPL
/// - **Ctrl+D**: exits cleanly with "goodbye."
/// - Readline history is persisted to `~/.cache/reel/chat_history.txt`
pub async fn run_chat(dispatcher: &Dispatcher<'_>, system_prompt: &str, model: &str) -> Result<()> {
    let mut session = ChatSession::new(system_prompt);
    print_banner(&session, model);

    let mut rl = DefaultEditor::new()?;
    let history_path = Config::cache_dir()?.join(crate::constants::HISTORY_FILENAME);
    if history_path.exists() {
        let _ = rl.load_history(&history_path);
    }

    loop {
        let readline = rl.readline(&format!("{} ", ">".green().bold()));

        match readline {
            Ok(line) => {
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }

                if line.starts_with('/') {
                    match commands::handle_slash_command(&line, &session) {
                        commands::CommandAction::Continue => {}
                        commands::CommandAction::NewSession => {
                            info!(old = %session.short_id(), "starting new session");
                            session = ChatSession::new(system_prompt);
                            print_banner(&session, model);
                        }
                        commands::CommandAction::Unknown(cmd) => {
                            println!("{} Unknown command: {}", "?".yellow(), cmd);
                        }
                    }
                    continue;
                }

                let _ = rl.add_history_entry(&line);
                println!();

                let mut renderer = StdoutRenderer::new(true);
                let outcome = tokio::select! {
                    result = session.send(dispatcher, &line, &mut renderer) => Some(result),
                    _ = tokio::signal::ctrl_c() => None,
                };

                match outcome {
                    Some(Ok(TurnOutcome::Completed { completions, .. })) => {
                        debug!(completions, "reply complete");
                    }
                    // The renderer has already shown why.
                    Some(Ok(TurnOutcome::Aborted { .. })) | Some(Err(_)) => {}
                    None => {
                        println!();
                        println!("{}", "cancelled.".dimmed());
                    }
                }
                println!();
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".dimmed());
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "goodbye.".dimmed());
                break;
            }
            Err(e) => {
                eprintln!("{} {}", "error:".red().bold(), e);
                break;
            }
        }
    }

    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = rl.save_history(&history_path);

    Ok(())
}

fn print_banner(session: &ChatSession, model: &str) {
    println!(
        "{} [session: {}] [model: {}] (/help for commands, Ctrl+D to exit)",
        "reel chat".bold().cyan(),
        session.short_id().yellow(),
        model.yellow(),
    );
    println!();
}
