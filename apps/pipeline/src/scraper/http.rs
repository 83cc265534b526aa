//! Client for the scraping service's paged `POST /scrape` endpoint.

use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{PostingSource, ScrapeFilters, SourceError};
use crate::models::posting::Posting;

#[derive(Debug, Serialize)]
struct ScrapeRequest<'a> {
    #[serde(flatten)]
    filters: &'a ScrapeFilters,
    page: u32,
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    jobs: Vec<Posting>,
    #[serde(default)]
    has_more: bool,
}

struct PageState {
    client: Client,
    endpoint: String,
    source: String,
    filters: ScrapeFilters,
    page: u32,
    done: bool,
}

#[derive(Clone)]
pub struct HttpPostingSource {
    client: Client,
    base_url: String,
    source: String,
}

impl HttpPostingSource {
    pub fn new(base_url: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            source: source.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/scrape", self.base_url.trim_end_matches('/'))
    }
}

impl PostingSource for HttpPostingSource {
    fn batches(
        &self,
        filters: ScrapeFilters,
    ) -> BoxStream<'static, Result<Vec<Posting>, SourceError>> {
        let state = PageState {
            client: self.client.clone(),
            endpoint: self.endpoint(),
            source: self.source.clone(),
            filters,
            page: 1,
            done: false,
        };

        stream::unfold(state, |mut state| async move {
            if state.done {
                return None;
            }
            match fetch_page(&state).await {
                Ok(response) => {
                    state.done = !response.has_more || response.jobs.is_empty();
                    state.page += 1;
                    if response.jobs.is_empty() {
                        return None;
                    }
                    let jobs = tag_source(response.jobs, &state.source);
                    Some((Ok(jobs), state))
                }
                Err(e) => {
                    // The sequence is not resumable mid-stream.
                    state.done = true;
                    Some((Err(e), state))
                }
            }
        })
        .boxed()
    }
}

async fn fetch_page(state: &PageState) -> Result<ScrapeResponse, SourceError> {
    let timeout = state.filters.request_timeout;
    debug!(page = state.page, endpoint = %state.endpoint, "Requesting scrape page");

    let response = state
        .client
        .post(&state.endpoint)
        .timeout(timeout)
        .json(&ScrapeRequest {
            filters: &state.filters,
            page: state.page,
        })
        .send()
        .await
        .map_err(|e| transport_error(e, timeout))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SourceError::Transport(format!("status {status}: {body}")));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| transport_error(e, timeout))?;
    serde_json::from_slice(&body).map_err(|e| SourceError::Decode(e.to_string()))
}

fn transport_error(err: reqwest::Error, timeout: std::time::Duration) -> SourceError {
    if err.is_timeout() {
        SourceError::Timeout(timeout)
    } else {
        SourceError::Transport(err.to_string())
    }
}

/// Scrapers often omit the source; fill in the configured one.
fn tag_source(mut jobs: Vec<Posting>, source: &str) -> Vec<Posting> {
    for job in jobs.iter_mut().filter(|j| j.source.trim().is_empty()) {
        job.source = source.to_string();
    }
    jobs
}
