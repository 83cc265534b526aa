//! Posting sources — lazy, pull-based sequences of posting batches.

pub mod http;

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::posting::Posting;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("posting source timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("posting source transport error: {0}")]
    Transport(String),

    #[error("posting source returned an unreadable response: {0}")]
    Decode(String),
}

/// Query parameters for one scrape. The sequence restarts from the first page
/// each time `batches` is called with them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScrapeFilters {
    pub min_salary: Option<f64>,
    pub employment_location: Option<String>,
    pub posted_after: Option<DateTime<Utc>>,
    #[serde(skip, default = "default_request_timeout")]
    pub request_timeout: Duration,
    /// URLs already stored, so the scraper can skip them.
    #[serde(default)]
    pub existing_urls: Vec<String>,
}

impl Default for ScrapeFilters {
    fn default() -> Self {
        Self {
            min_salary: None,
            employment_location: None,
            posted_after: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            existing_urls: Vec::new(),
        }
    }
}

fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

pub trait PostingSource: Send + Sync {
    /// Batches are fetched only when polled; nothing is buffered ahead.
    fn batches(&self, filters: ScrapeFilters) -> BoxStream<'static, Result<Vec<Posting>, SourceError>>;
}
