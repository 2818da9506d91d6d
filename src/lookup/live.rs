//! Live movie data over HTTP.
//!
//! One shared `reqwest` client serves both services. Keys are resolved once
//! from config and the environment when the backend is built.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{serpapi, tmdb, LookupError, MovieLookup};
use crate::config::Config;
use crate::constants::{SERPAPI_KEY_ENV, TMDB_API_KEY_ENV};

/// [`MovieLookup`] backed by TMDB (listings) and SerpAPI (showtimes).
///
/// Missing keys are not an error at construction time; the call that needs
/// the key fails with [`LookupError::MissingCredentials`] instead, so the
/// model can tell the user what is unavailable.
pub struct LiveLookup {
    client: Client,
    tmdb_api_key: Option<String>,
    serpapi_api_key: Option<String>,
}

impl LiveLookup {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.lookup_timeout_secs()))
            .build()
            .context("Failed to build HTTP client for lookups")?;
        Ok(Self {
            client,
            tmdb_api_key: config.resolve_lookup_key("tmdb"),
            serpapi_api_key: config.resolve_lookup_key("serpapi"),
        })
    }
}

#[async_trait]
impl MovieLookup for LiveLookup {
    async fn now_playing(&self) -> Result<String, LookupError> {
        let token = self
            .tmdb_api_key
            .as_deref()
            .ok_or(LookupError::MissingCredentials(TMDB_API_KEY_ENV))?;
        tmdb::fetch_now_playing(&self.client, token).await
    }

    async fn showtimes(&self, title: &str, location: &str) -> Result<String, LookupError> {
        if title.trim().is_empty() {
            return Err(LookupError::InvalidInput("title is empty".to_string()));
        }
        if location.trim().is_empty() {
            return Err(LookupError::InvalidInput("location is empty".to_string()));
        }
        let api_key = self
            .serpapi_api_key
            .as_deref()
            .ok_or(LookupError::MissingCredentials(SERPAPI_KEY_ENV))?;
        serpapi::fetch_showtimes(&self.client, api_key, title, location).await
    }
}
