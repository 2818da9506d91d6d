//! TMDB "now playing" listing.

use reqwest::{Client, Url};
use serde::Deserialize;

use super::LookupError;
use crate::constants::TMDB_NOW_PLAYING_URL;

#[derive(Debug, Deserialize)]
pub(super) struct NowPlayingPage {
    #[serde(default)]
    results: Vec<TmdbMovie>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovie {
    id: u64,
    title: String,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    overview: Option<String>,
}

pub(super) async fn fetch_now_playing(client: &Client, token: &str) -> Result<String, LookupError> {
    let url = Url::parse_with_params(TMDB_NOW_PLAYING_URL, &[("language", "en-US"), ("page", "1")])
        .map_err(|e| LookupError::InvalidInput(e.to_string()))?;

    let response = client
        .get(url)
        .bearer_auth(token)
        .header("accept", "application/json")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(LookupError::Status {
            service: "TMDB",
            status,
        });
    }

    let page: NowPlayingPage = response.json().await?;
    render_now_playing(&page)
}

/// Formats the listing as one block per movie.
pub(super) fn render_now_playing(page: &NowPlayingPage) -> Result<String, LookupError> {
    if page.results.is_empty() {
        return Err(LookupError::NoResults(
            "No movies are listed as now playing.".to_string(),
        ));
    }

    let mut out = String::from("Now Playing Movies:\n");
    for movie in &page.results {
        out.push('\n');
        out.push_str(&format!("Title: {}\n", movie.title));
        out.push_str(&format!("Movie ID: {}\n", movie.id));
        if let Some(date) = movie.release_date.as_deref().filter(|d| !d.is_empty()) {
            out.push_str(&format!("Release Date: {}\n", date));
        }
        if let Some(overview) = movie.overview.as_deref().filter(|o| !o.is_empty()) {
            out.push_str(&format!("Overview: {}\n", overview));
        }
    }
    Ok(out)
}
