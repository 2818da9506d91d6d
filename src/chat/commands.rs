//! Slash command handlers for the chat REPL.
//!
//! Dispatches `/history`, `/new` and `/help`. Returns a [`CommandAction`] so
//! the REPL loop can decide how to proceed.

use colored::Colorize;

use crate::format;
use crate::session::ChatSession;

/// Action returned by slash command handling.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum CommandAction {
    /// Command was handled; continue the REPL loop.
    Continue,
    /// Replace the current session with a fresh one.
    NewSession,
    /// Unknown command was entered.
    Unknown(String),
}

/// Dispatch and handle a slash command.
pub(crate) fn handle_slash_command(command: &str, session: &ChatSession) -> CommandAction {
    match command {
        "/history" => {
            // Skip the instructions at index 0; injected lookup results stay visible.
            for msg in &session.transcript().messages()[1..] {
                println!("{}", format::format_message(msg));
                println!();
            }
            CommandAction::Continue
        }
        "/new" => CommandAction::NewSession,
        "/help" => {
            println!("{}", "Commands:".bold());
            println!("  {} - show conversation history", "/history".cyan());
            println!("  {} - start a new conversation", "/new".cyan());
            println!("  {} - show this help", "/help".cyan());
            println!("  {} - cancel the current reply", "Ctrl+C".cyan());
            println!("  {} - exit", "Ctrl+D".cyan());
            CommandAction::Continue
        }
        _ => CommandAction::Unknown(command.to_string()),
    }
}
