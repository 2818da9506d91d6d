//! Output rendering abstraction for reel.
//!
//! Defines the [`Renderer`] trait that decouples the dispatch loop from the
//! display layer. Every generated message is rendered as an open / token /
//! close sequence; injected lookup results get their own hooks so a UI can
//! show what the assistant looked up.

use colored::Colorize;
use std::io::{self, Write};

/// Sink for everything the dispatch loop produces while a turn runs.
pub trait Renderer {
    /// A new assistant message is about to stream.
    fn render_start(&mut self);

    /// Render a single token as it arrives.
    fn render_token(&mut self, token: &str);

    /// Called when the full response is complete.
    fn render_done(&mut self);

    /// Called when a turn fails or is cut short.
    fn render_error(&mut self, err: &str);

    /// A function call was read from the reply and is about to run.
    fn lookup_start(&mut self, name: &str, args: &[String]);

    /// The text that will be handed back to the model for `name`.
    fn lookup_result(&mut self, name: &str, text: &str);
}

/// Renders streaming LLM output directly to stdout.
///
/// Each token is printed immediately with an explicit flush so the user
/// sees a "typing" effect.
pub struct StdoutRenderer {
    token_count: usize,
    show_lookups: bool,
}

impl StdoutRenderer {
    pub fn new(show_lookups: bool) -> Self {
        Self {
            token_count: 0,
            show_lookups,
        }
    }
}

impl Renderer for StdoutRenderer {
    fn render_start(&mut self) {
        self.token_count = 0;
        print!("{} ", "reel:".cyan().bold());
        io::stdout().flush().ok();
    }

    fn render_token(&mut self, token: &str) {
        print!("{}", token);
        io::stdout().flush().ok();
        self.token_count += 1;
    }

    fn render_done(&mut self) {
        println!();
        println!("{}", format!("[{} chunks]", self.token_count).dimmed());
    }

    fn render_error(&mut self, err: &str) {
        eprintln!();
        eprintln!("{} {}", "error:".red().bold(), err);
    }

    fn lookup_start(&mut self, name: &str, args: &[String]) {
        if self.show_lookups {
            println!("{}", format!("-> {}({})", name, args.join(", ")).yellow());
        }
    }

    fn lookup_result(&mut self, name: &str, text: &str) {
        if self.show_lookups {
            let first = text.lines().next().unwrap_or_default();
            let lines = text.lines().count();
            println!(
                "{}",
                format!("<- {}: {} ({} lines)", name, first, lines).dimmed()
            );
        }
    }
}
