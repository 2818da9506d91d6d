//! Google showtimes through SerpAPI.

use reqwest::{Client, Url};
use serde::Deserialize;

use super::LookupError;
use crate::constants::SERPAPI_SEARCH_URL;

#[derive(Debug, Deserialize)]
pub(super) struct SearchResponse {
    #[serde(default)]
    showtimes: Vec<ShowtimesDay>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ShowtimesDay {
    #[serde(default)]
    day: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    theaters: Vec<Theater>,
}

#[derive(Debug, Deserialize)]
struct Theater {
    name: String,
    #[serde(default)]
    showing: Vec<Showing>,
}

#[derive(Debug, Deserialize)]
struct Showing {
    #[serde(default)]
    time: Vec<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

pub(super) async fn fetch_showtimes(
    client: &Client,
    api_key: &str,
    title: &str,
    location: &str,
) -> Result<String, LookupError> {
    let query = format!("showtimes for {}", title);
    let url = Url::parse_with_params(
        SERPAPI_SEARCH_URL,
        &[
            ("engine", "google"),
            ("q", query.as_str()),
            ("location", location),
            ("hl", "en"),
            ("gl", "us"),
            ("api_key", api_key),
        ],
    )
    .map_err(|e| LookupError::InvalidInput(e.to_string()))?;

    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(LookupError::Status {
            service: "SerpAPI",
            status,
        });
    }

    let body: SearchResponse = response.json().await?;
    render_showtimes(&body, title, location)
}

/// Formats one header per day followed by `theater: times` lines.
pub(super) fn render_showtimes(
    body: &SearchResponse,
    title: &str,
    location: &str,
) -> Result<String, LookupError> {
    if body.showtimes.is_empty() {
        let reason = body
            .error
            .clone()
            .unwrap_or_else(|| format!("No showtimes found for {} in {}.", title, location));
        return Err(LookupError::NoResults(reason));
    }

    let mut out = format!("Showtimes for {} in {}:\n", title, location);
    for day in &body.showtimes {
        out.push('\n');
        match (day.day.is_empty(), day.date.is_empty()) {
            (false, false) => out.push_str(&format!("{} ({})\n", day.day, day.date)),
            (false, true) => out.push_str(&format!("{}\n", day.day)),
            (true, false) => out.push_str(&format!("{}\n", day.date)),
            (true, true) => {}
        }
        for theater in &day.theaters {
            let times: Vec<String> = theater
                .showing
                .iter()
                .map(|s| match s.kind.as_deref() {
                    Some(kind) if !kind.is_empty() => format!("{} [{}]", s.time.join(", "), kind),
                    _ => s.time.join(", "),
                })
                .collect();
            out.push_str(&format!("  {}: {}\n", theater.name, times.join("; ")));
        }
    }
    Ok(out)
}
