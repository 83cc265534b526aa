//! Axum route handlers for runs, single postings and job lookup.

use std::time::Duration;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::job::StoredJob;
use crate::models::posting::{CandidateContext, Posting};
use crate::pipeline::ingestion::RunBudget;
use crate::pipeline::result::ProcessingResult;
use crate::pipeline::summary::PipelineSummary;
use crate::scraper::{ScrapeFilters, DEFAULT_REQUEST_TIMEOUT};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub cv_text: String,
    pub min_salary: Option<f64>,
    pub employment_location: Option<String>,
    pub posted_after: Option<DateTime<Utc>>,
    pub request_timeout_secs: Option<u64>,
    pub time_budget_secs: Option<u64>,
    pub max_postings: Option<usize>,
}

impl RunRequest {
    fn filters(&self) -> ScrapeFilters {
        ScrapeFilters {
            min_salary: self.min_salary,
            employment_location: self.employment_location.clone(),
            posted_after: self.posted_after,
            request_timeout: self
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            existing_urls: Vec::new(),
        }
    }

    fn budget(&self) -> RunBudget {
        RunBudget {
            time_budget: self.time_budget_secs.map(Duration::from_secs),
            max_postings: self.max_postings,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProcessPostingRequest {
    pub posting: Posting,
    #[serde(default)]
    pub cv_text: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/runs
///
/// Runs one ingestion pass and returns its counters.
pub async fn handle_start_run(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> Result<Json<PipelineSummary>, AppError> {
    if request.request_timeout_secs == Some(0) || request.time_budget_secs == Some(0) {
        return Err(AppError::Validation(
            "timeouts must be at least one second".to_string(),
        ));
    }

    let candidate = CandidateContext::new(request.cv_text.clone());
    let summary = state
        .runner
        .run(request.filters(), &candidate, request.budget())
        .await?;

    Ok(Json(summary))
}

/// POST /api/v1/postings/process
pub async fn handle_process_posting(
    State(state): State<AppState>,
    Json(request): Json<ProcessPostingRequest>,
) -> Result<Json<ProcessingResult>, AppError> {
    let mut posting = request.posting;
    if posting.external_id.trim().is_empty() {
        return Err(AppError::Validation("posting.external_id cannot be empty".to_string()));
    }
    if posting.source.trim().is_empty() {
        posting.source = state.config.scraper.source.clone();
    }

    let candidate = CandidateContext::new(request.cv_text);
    let result = state.pipeline.process(&posting, &candidate).await;
    Ok(Json(result))
}

/// GET /api/v1/jobs/:source/:external_id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path((source, external_id)): Path<(String, String)>,
) -> Result<Json<StoredJob>, AppError> {
    let job = state
        .store
        .find_by_external_id(&external_id, &source)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("job '{external_id}' from '{source}'")))?;

    Ok(Json(job))
}
