//! Detection of function calls written as plain text in model replies.
//!
//! The model is told to answer with Python-style calls such as
//! `get_showtimes('Dune', 'Seattle')` when it needs live data. This module
//! finds such a call in a reply and splits out its arguments.
//!
//! The grammar is deliberately small and has known limits:
//! - names are tried in [`CallName::ALL`] order and the first one whose
//!   `name(` substring appears anywhere in the reply wins;
//! - the argument list ends at the first `)` after the opening parenthesis,
//!   so nested parentheses or a `)` inside a quoted argument cut it short;
//! - arguments are split on every `,`, quoted or not;
//! - only one call is read per reply.

use thiserror::Error;

/// A function the model may call, in detection precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallName {
    GetNowPlaying,
    GetShowtimes,
    BuyTicket,
    ConfirmTicketPurchase,
}

impl CallName {
    /// Every recognized call. Detection walks this slice front to back.
    pub const ALL: &'static [CallName] = &[
        CallName::GetNowPlaying,
        CallName::GetShowtimes,
        CallName::BuyTicket,
        CallName::ConfirmTicketPurchase,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CallName::GetNowPlaying => "get_now_playing",
            CallName::GetShowtimes => "get_showtimes",
            CallName::BuyTicket => "buy_ticket",
            CallName::ConfirmTicketPurchase => "confirm_ticket_purchase",
        }
    }

    /// Parameter names, in positional order.
    pub fn params(&self) -> &'static [&'static str] {
        match self {
            CallName::GetNowPlaying => &[],
            CallName::GetShowtimes => &["title", "location"],
            CallName::BuyTicket | CallName::ConfirmTicketPurchase => {
                &["theater", "movie", "showtime"]
            }
        }
    }

    /// Signature line as shown to the model, e.g. `get_showtimes(title, location)`.
    pub fn signature(&self) -> String {
        format!("{}({})", self.as_str(), self.params().join(", "))
    }
}

impl std::fmt::Display for CallName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure to read a call out of a reply that names one.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("no closing parenthesis after `{0}(`")]
    Unclosed(CallName),
    #[error("{call}() is missing argument {index} ({param})")]
    MissingArgument {
        call: CallName,
        index: usize,
        param: &'static str,
    },
}

/// A call found in a model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedCall {
    pub name: CallName,
    pub arguments: Vec<String>,
}

impl DetectedCall {
    /// Positional argument `index`, or an error naming the missing parameter.
    ///
    /// Arity is never checked up front; this is where a short argument list
    /// surfaces.
    pub fn arg(&self, index: usize) -> Result<&str, ExtractionError> {
        self.arguments
            .get(index)
            .map(String::as_str)
            .ok_or(ExtractionError::MissingArgument {
                call: self.name,
                index,
                param: self.name.params().get(index).copied().unwrap_or("?"),
            })
    }
}

/// Looks for the first recognized call in `text`.
///
/// Returns `None` when no `name(` substring is present, which is the normal
/// end of a dispatch loop rather than an error.
pub fn detect(text: &str) -> Option<Result<DetectedCall, ExtractionError>> {
    CallName::ALL.iter().find_map(|&name| {
        let opener = format!("{}(", name.as_str());
        let start = text.find(&opener)? + opener.len();
        Some(extract(text, start, name))
    })
}

/// Reads the argument list starting right after the opening parenthesis.
fn extract(text: &str, start: usize, name: CallName) -> Result<DetectedCall, ExtractionError> {
    let end = text[start..]
        .find(')')
        .map(|offset| start + offset)
        .ok_or(ExtractionError::Unclosed(name))?;
    let inner = &text[start..end];

    let arguments = if inner.trim().is_empty() {
        Vec::new()
    } else {
        inner.split(',').map(clean_argument).collect()
    };

    Ok(DetectedCall { name, arguments })
}

/// Trims whitespace, then one quote character from each end.
fn clean_argument(raw: &str) -> String {
    let is_quote = |c: char| c == '\'' || c == '"';
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix(is_quote).unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix(is_quote).unwrap_or(trimmed);
    trimmed.to_string()
}
