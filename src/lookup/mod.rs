//! Movie data lookups the model can trigger.
//!
//! [`MovieLookup`] is the seam between the dispatch loop and whatever backs
//! the live data. [`LiveLookup`] talks to TMDB and SerpAPI; tests use
//! in-memory fakes. Ticket purchase has no backing service and is plain text
//! synthesis in [`tickets`].

mod live;
mod serpapi;
pub mod tickets;
mod tmdb;

use async_trait::async_trait;
use thiserror::Error;

pub use live::LiveLookup;

/// Failure of a single lookup call.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("no API key configured (set {0})")]
    MissingCredentials(&'static str),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{service} returned HTTP {status}")]
    Status {
        service: &'static str,
        status: reqwest::StatusCode,
    },
    #[error("{0}")]
    NoResults(String),
    #[error("timed out after {0}s")]
    Timeout(u64),
}

/// Live movie data, returned as text ready to hand to the model.
#[async_trait]
pub trait MovieLookup: Send + Sync {
    /// Movies currently in theaters.
    async fn now_playing(&self) -> Result<String, LookupError>;

    /// Showtimes for `title` near `location`.
    async fn showtimes(&self, title: &str, location: &str) -> Result<String, LookupError>;
}
