//! Terminal formatting of transcript entries for `/history`.

use colored::Colorize;

use crate::message::{Message, Role};

/// Injected context longer than this many lines is folded in `/history`.
const CONTEXT_PREVIEW_LINES: usize = 3;

/// Format a message for terminal display with role label and colors.
pub fn format_message(msg: &Message) -> String {
    let label = format!("{}:", msg.role());
    let label = match msg.role() {
        Role::User => label.green().bold(),
        Role::Assistant => label.cyan().bold(),
        Role::System => label.dimmed(),
    };
    format!("{}\n{}", label, format_body(msg))
}

fn format_body(msg: &Message) -> String {
    match msg.role() {
        Role::System => preview(msg.text(), CONTEXT_PREVIEW_LINES).dimmed().to_string(),
        _ => msg.text().to_string(),
    }
}

/// First `max_lines` lines of `text`, with a count of what was left out.
fn preview(text: &str, max_lines: usize) -> String {
    let total = text.lines().count();
    if total <= max_lines {
        return text.to_string();
    }
    let mut shown: Vec<&str> = text.lines().take(max_lines).collect();
    let hidden = format!("... ({} more lines)", total - max_lines);
    shown.push(&hidden);
    shown.join("\n")
}
