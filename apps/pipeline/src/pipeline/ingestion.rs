//! Batch Ingestion Adapter — pulls posting batches on demand and feeds them
//! through the pipeline under a time and volume budget.

use std::sync::Arc;
use std::time::Duration;

use futures::future;
use futures::stream::{self, StreamExt};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::engine::JobPipeline;
use super::prefilter::PostingFilter;
use super::summary::{PipelineSummary, RunSummary};
use crate::models::posting::{CandidateContext, Posting};
use crate::scraper::{PostingSource, ScrapeFilters, SourceError};
use crate::store::JobStore;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("ingestion timed out after {}s without receiving any postings", .0.as_secs())]
    Timeout(Duration),

    #[error("posting source failed before the first batch: {0}")]
    Source(SourceError),
}

/// Limits for one run. The time budget bounds pulling batches only; a batch
/// already pulled is always processed to completion.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunBudget {
    pub time_budget: Option<Duration>,
    pub max_postings: Option<usize>,
}

pub struct IngestionRunner {
    source: Arc<dyn PostingSource>,
    pipeline: Arc<JobPipeline>,
    store: Arc<dyn JobStore>,
    source_name: String,
    url_lookback: Option<chrono::Duration>,
    concurrency: usize,
}

impl IngestionRunner {
    pub fn new(
        source: Arc<dyn PostingSource>,
        pipeline: Arc<JobPipeline>,
        store: Arc<dyn JobStore>,
        source_name: impl Into<String>,
    ) -> Self {
        Self {
            source,
            pipeline,
            store,
            source_name: source_name.into(),
            url_lookback: Some(chrono::Duration::days(60)),
            concurrency: 4,
        }
    }

    pub fn with_url_lookback(mut self, lookback: Option<chrono::Duration>) -> Self {
        self.url_lookback = lookback;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn run(
        &self,
        filters: ScrapeFilters,
        candidate: &CandidateContext,
        budget: RunBudget,
    ) -> Result<PipelineSummary, IngestError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("ingestion_run", %run_id, source = %self.source_name);
        self.run_inner(filters, candidate, budget)
            .instrument(span)
            .await
    }

    async fn run_inner(
        &self,
        mut filters: ScrapeFilters,
        candidate: &CandidateContext,
        budget: RunBudget,
    ) -> Result<PipelineSummary, IngestError> {
        let started = Instant::now();
        let deadline = budget.time_budget.map(|b| started + b);
        info!(
            time_budget_secs = budget.time_budget.map(|b| b.as_secs()),
            max_postings = budget.max_postings,
            "Ingestion run started"
        );

        let filter = Arc::new(self.pipeline.filter_for(&filters));
        filters.existing_urls.extend(self.known_urls().await);
        let summary = RunSummary::new();
        let mut batches = self.source.batches(filters);
        let mut batch_count = 0usize;
        let mut pulled = 0usize;

        loop {
            let next = match deadline {
                Some(deadline) if Instant::now() >= deadline => None,
                Some(deadline) => tokio::time::timeout_at(deadline, batches.next()).await.ok(),
                None => Some(batches.next().await),
            };

            let batch = match next {
                // Deadline reached while waiting.
                None if batch_count == 0 => {
                    return Err(IngestError::Timeout(started.elapsed()));
                }
                None => {
                    info!(batches = batch_count, "Time budget exhausted, ending run");
                    break;
                }
                Some(None) => {
                    debug!(batches = batch_count, "Posting source exhausted");
                    break;
                }
                Some(Some(Ok(batch))) => batch,
                Some(Some(Err(SourceError::Timeout(waited)))) if batch_count == 0 => {
                    return Err(IngestError::Timeout(waited));
                }
                Some(Some(Err(e))) if batch_count == 0 => {
                    return Err(IngestError::Source(e));
                }
                Some(Some(Err(e))) => {
                    warn!(error = %e, batches = batch_count, "Posting source failed mid-run, ending run early");
                    break;
                }
            };

            batch_count += 1;
            let (batch, limit_reached) = apply_limit(batch, pulled, budget.max_postings);
            pulled += batch.len();
            debug!(batch = batch_count, size = batch.len(), "Processing batch");
            self.process_batch(batch, &filter, candidate, &summary).await;

            if limit_reached {
                info!(max_postings = pulled, "Posting limit reached, ending run");
                break;
            }
        }

        let snapshot = summary.snapshot();
        info!(
            total_scraped = snapshot.total_scraped,
            total_filtered = snapshot.total_filtered,
            total_processed = snapshot.total_processed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Ingestion run complete"
        );
        Ok(snapshot)
    }

    async fn process_batch(
        &self,
        batch: Vec<Posting>,
        filter: &Arc<PostingFilter>,
        candidate: &CandidateContext,
        summary: &RunSummary,
    ) {
        summary.add_scraped(batch.len() as u64);
        let candidate = Arc::new(candidate.clone());
        stream::iter(batch)
            .map(|posting| {
                let pipeline = self.pipeline.clone();
                let filter = filter.clone();
                let candidate = candidate.clone();
                async move { pipeline.process_with(&filter, &posting, &candidate).await }
            })
            .buffer_unordered(self.concurrency)
            .for_each(|result| {
                summary.record(result.status);
                future::ready(())
            })
            .await;
    }

    /// Failure here only costs the scraper a hint, so the run continues.
    async fn known_urls(&self) -> Vec<String> {
        match self
            .store
            .existing_urls_by_source(&self.source_name, self.url_lookback)
            .await
        {
            Ok(urls) => {
                debug!(count = urls.len(), "Loaded known posting URLs");
                urls
            }
            Err(e) => {
                warn!(error = %e, "Could not load known posting URLs, scraping without them");
                Vec::new()
            }
        }
    }
}

/// Truncates the batch that crosses `max_postings`; the flag says to stop pulling.
fn apply_limit(
    mut batch: Vec<Posting>,
    pulled: usize,
    max_postings: Option<usize>,
) -> (Vec<Posting>, bool) {
    let Some(max) = max_postings else {
        return (batch, false);
    };
    let remaining = max.saturating_sub(pulled);
    if batch.len() >= remaining {
        batch.truncate(remaining);
        (batch, true)
    } else {
        (batch, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::Capabilities;
    use crate::models::job::NewJob;
    use crate::pipeline::prefilter::{FilterConfig, PostingFilter};
    use crate::store::memory::MemoryJobStore;
    use crate::testing::{posting, ScriptedClassifier, ScriptedExtractor, ScriptedSource, Step};

    struct Setup {
        source: Arc<ScriptedSource>,
        store: Arc<MemoryJobStore>,
        runner: IngestionRunner,
    }

    fn setup(source: ScriptedSource, classifier: ScriptedClassifier, filter: FilterConfig) -> Setup {
        let source = Arc::new(source);
        let store = Arc::new(MemoryJobStore::new());
        let capabilities = Capabilities::new(
            Arc::new(classifier),
            Arc::new(ScriptedExtractor::new()),
            Duration::from_secs(60),
        );
        let pipeline = Arc::new(JobPipeline::new(
            PostingFilter::new(filter),
            capabilities,
            store.clone(),
        ));
        let runner = IngestionRunner::new(source.clone(), pipeline, store.clone(), "djinni");
        Setup {
            source,
            store,
            runner,
        }
    }

    fn cv() -> CandidateContext {
        CandidateContext::new("Rust, PostgreSQL")
    }

    fn postings(ids: &[&str]) -> Vec<Posting> {
        ids.iter().map(|id| posting(id, "Dev")).collect()
    }

    #[tokio::test]
    async fn test_mixed_batch_summary() {
        let mut batch = postings(&["1", "2", "3"]);
        batch[0].salary.as_mut().unwrap().max = Some(2000.0);
        batch[0].salary.as_mut().unwrap().min = Some(1500.0);

        let s = setup(
            ScriptedSource::batches_of(vec![batch]),
            ScriptedClassifier::relevant().reject("2"),
            FilterConfig {
                min_salary: Some(3000.0),
                ..FilterConfig::default()
            },
        );

        let summary = s
            .runner
            .run(ScrapeFilters::default(), &cv(), RunBudget::default())
            .await
            .unwrap();

        assert_eq!(
            summary,
            PipelineSummary {
                total_scraped: 3,
                total_filtered: 1,
                total_processed: 1,
            }
        );
        assert_eq!(s.store.job_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_classifier_timeout_does_not_sink_the_batch() {
        let s = setup(
            ScriptedSource::batches_of(vec![postings(&["1", "2", "3", "4", "5"])]),
            ScriptedClassifier::relevant().slow("3", Duration::from_secs(600)),
            FilterConfig::default(),
        );

        let summary = s
            .runner
            .run(ScrapeFilters::default(), &cv(), RunBudget::default())
            .await
            .unwrap();

        assert_eq!(summary.total_scraped, 5);
        assert_eq!(summary.total_filtered, 0);
        assert_eq!(summary.total_processed, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_before_first_batch_is_fatal() {
        let s = setup(
            ScriptedSource::new(vec![Step::Stall]),
            ScriptedClassifier::relevant(),
            FilterConfig::default(),
        );
        let budget = RunBudget {
            time_budget: Some(Duration::from_secs(30)),
            max_postings: None,
        };

        let err = s
            .runner
            .run(ScrapeFilters::default(), &cv(), budget)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_source_timeout_before_first_batch_is_fatal() {
        let s = setup(
            ScriptedSource::new(vec![Step::Fail(SourceError::Timeout(Duration::from_secs(30)))]),
            ScriptedClassifier::relevant(),
            FilterConfig::default(),
        );

        let err = s
            .runner
            .run(ScrapeFilters::default(), &cv(), RunBudget::default())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Timeout(d) if d == Duration::from_secs(30)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_after_first_batch_returns_partial_summary() {
        let s = setup(
            ScriptedSource::new(vec![Step::Batch(postings(&["1", "2"])), Step::Stall]),
            ScriptedClassifier::relevant(),
            FilterConfig::default(),
        );
        let budget = RunBudget {
            time_budget: Some(Duration::from_secs(30)),
            max_postings: None,
        };

        let summary = s
            .runner
            .run(ScrapeFilters::default(), &cv(), budget)
            .await
            .unwrap();
        assert_eq!(summary.total_scraped, 2);
        assert_eq!(summary.total_processed, 2);
    }

    #[tokio::test]
    async fn test_source_timeout_after_first_batch_ends_cleanly() {
        let s = setup(
            ScriptedSource::new(vec![
                Step::Batch(postings(&["1"])),
                Step::Fail(SourceError::Timeout(Duration::from_secs(30))),
                Step::Batch(postings(&["2"])),
            ]),
            ScriptedClassifier::relevant(),
            FilterConfig::default(),
        );

        let summary = s
            .runner
            .run(ScrapeFilters::default(), &cv(), RunBudget::default())
            .await
            .unwrap();
        assert_eq!(summary.total_scraped, 1);
        assert_eq!(summary.total_processed, 1);
    }

    #[tokio::test]
    async fn test_transport_error_before_first_batch_is_fatal() {
        let s = setup(
            ScriptedSource::new(vec![Step::Fail(SourceError::Transport(
                "connection refused".to_string(),
            ))]),
            ScriptedClassifier::relevant(),
            FilterConfig::default(),
        );

        let err = s
            .runner
            .run(ScrapeFilters::default(), &cv(), RunBudget::default())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Source(SourceError::Transport(_))));
    }

    #[tokio::test]
    async fn test_max_postings_truncates_and_stops_pulling() {
        let s = setup(
            ScriptedSource::batches_of(vec![
                postings(&["1", "2", "3"]),
                postings(&["4", "5", "6"]),
                postings(&["7", "8", "9"]),
            ]),
            ScriptedClassifier::relevant(),
            FilterConfig::default(),
        );
        let budget = RunBudget {
            time_budget: None,
            max_postings: Some(4),
        };

        let summary = s
            .runner
            .run(ScrapeFilters::default(), &cv(), budget)
            .await
            .unwrap();
        assert_eq!(summary.total_scraped, 4);
        assert_eq!(summary.total_processed, 4);
        assert_eq!(s.source.pulls(), 2);
    }

    #[tokio::test]
    async fn test_store_outage_fails_postings_but_run_completes() {
        let s = setup(
            ScriptedSource::batches_of(vec![postings(&["1", "2", "3"])]),
            ScriptedClassifier::relevant(),
            FilterConfig::default(),
        );
        s.store.fail_with("database unavailable").await;

        let summary = s
            .runner
            .run(ScrapeFilters::default(), &cv(), RunBudget::default())
            .await
            .unwrap();
        assert_eq!(
            summary,
            PipelineSummary {
                total_scraped: 3,
                total_filtered: 0,
                total_processed: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_scrape_query_is_rechecked_by_prefilter() {
        let mut underpaid = posting("1", "Dev");
        underpaid.salary.as_mut().unwrap().min = Some(600.0);
        underpaid.salary.as_mut().unwrap().max = Some(800.0);
        let mut office = posting("2", "Dev");
        office.employment_type = "office".to_string();
        let batch = vec![underpaid, office, posting("3", "Dev")];

        let s = setup(
            ScriptedSource::batches_of(vec![batch]),
            ScriptedClassifier::relevant(),
            FilterConfig::default(),
        );
        let filters = ScrapeFilters {
            min_salary: Some(4000.0),
            employment_location: Some("remote".to_string()),
            ..ScrapeFilters::default()
        };

        let summary = s
            .runner
            .run(filters, &cv(), RunBudget::default())
            .await
            .unwrap();

        assert_eq!(
            summary,
            PipelineSummary {
                total_scraped: 3,
                total_filtered: 2,
                total_processed: 1,
            }
        );
        assert_eq!(s.store.job_count().await, 1);
        assert_eq!(s.source.last_filters().unwrap().min_salary, Some(4000.0));
    }

    #[tokio::test]
    async fn test_known_urls_are_passed_to_source() {
        let s = setup(
            ScriptedSource::batches_of(vec![]),
            ScriptedClassifier::relevant(),
            FilterConfig::default(),
        );
        s.store
            .create(&NewJob::filtered(posting("old", "Dev")))
            .await
            .unwrap();

        let summary = s
            .runner
            .run(ScrapeFilters::default(), &cv(), RunBudget::default())
            .await
            .unwrap();

        assert_eq!(summary, PipelineSummary::default());
        let filters = s.source.last_filters().unwrap();
        assert_eq!(filters.existing_urls, vec!["https://jobs.example/old".to_string()]);
    }

    #[test]
    fn test_apply_limit() {
        let (batch, stop) = apply_limit(postings(&["1", "2"]), 0, None);
        assert_eq!((batch.len(), stop), (2, false));

        let (batch, stop) = apply_limit(postings(&["1", "2", "3"]), 2, Some(4));
        assert_eq!((batch.len(), stop), (2, true));

        let (batch, stop) = apply_limit(postings(&["1"]), 0, Some(4));
        assert_eq!((batch.len(), stop), (1, false));
    }
}
