use std::sync::Arc;

use crate::config::Config;
use crate::pipeline::engine::JobPipeline;
use crate::pipeline::ingestion::IngestionRunner;
use crate::store::JobStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn JobStore>,
    pub pipeline: Arc<JobPipeline>,
    pub runner: Arc<IngestionRunner>,
    pub config: Config,
}
