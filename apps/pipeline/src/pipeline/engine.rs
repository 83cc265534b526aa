//! Pipeline Engine — filter, relevance, skill extraction, store.
//!
//! Each posting runs the stages strictly in order and may stop at any of them.
//! Stage errors are folded into the returned `ProcessingResult`; `process` never
//! fails, so one bad posting cannot abort its siblings.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::prefilter::PostingFilter;
use super::result::{ProcessingResult, Stage};
use crate::classification::{Capabilities, SkillMode};
use crate::models::job::NewJob;
use crate::models::posting::{CandidateContext, Posting};
use crate::models::skills::SkillExpression;
use crate::scraper::ScrapeFilters;
use crate::store::JobStore;

pub struct JobPipeline {
    filter: PostingFilter,
    capabilities: Capabilities,
    store: Arc<dyn JobStore>,
    record_rejections: bool,
}

impl JobPipeline {
    pub fn new(filter: PostingFilter, capabilities: Capabilities, store: Arc<dyn JobStore>) -> Self {
        Self {
            filter,
            capabilities,
            store,
            record_rejections: false,
        }
    }

    /// Also store filtered and not-relevant postings, flagged as such.
    pub fn with_rejection_recording(mut self, enabled: bool) -> Self {
        self.record_rejections = enabled;
        self
    }

    /// The configured pre-filter narrowed by one run's scrape query.
    pub fn filter_for(&self, filters: &ScrapeFilters) -> PostingFilter {
        self.filter.narrowed_by(filters)
    }

    pub async fn process(&self, posting: &Posting, candidate: &CandidateContext) -> ProcessingResult {
        self.process_with(&self.filter, posting, candidate).await
    }

    #[instrument(
        skip_all,
        fields(external_id = %posting.external_id, source = %posting.source)
    )]
    pub async fn process_with(
        &self,
        filter: &PostingFilter,
        posting: &Posting,
        candidate: &CandidateContext,
    ) -> ProcessingResult {
        if let Err(rejection) = filter.check(posting) {
            debug!(%rejection, "Posting filtered");
            self.record_rejection(NewJob::filtered(posting.clone())).await;
            return ProcessingResult::filtered(posting, rejection);
        }

        match self.capabilities.classifier.is_relevant(posting, candidate).await {
            Ok(true) => debug!("Posting judged relevant"),
            Ok(false) => {
                debug!("Posting judged not relevant");
                self.record_rejection(NewJob::not_relevant(posting.clone())).await;
                return ProcessingResult::not_relevant(posting);
            }
            Err(e) => {
                warn!(error = %e, stage = "relevance", "Relevance check failed");
                return ProcessingResult::failed(posting, Stage::Relevance, e.to_string());
            }
        }

        let must_have = self.extract_skills(posting, SkillMode::Required).await;
        let nice_to_have = self.extract_skills(posting, SkillMode::Preferred).await;
        let job = NewJob::accepted(posting.clone(), must_have, nice_to_have);

        match self.store.create(&job).await {
            Ok(stored) => {
                info!(job_id = stored.id, "Posting accepted and stored");
                ProcessingResult::accepted(job, Some(stored.id))
            }
            Err(e) if e.is_already_exists() => {
                info!("Posting already stored, nothing written");
                ProcessingResult::accepted(job, None)
            }
            Err(e) => {
                warn!(error = %e, stage = "store", "Storing posting failed");
                ProcessingResult::failed_after_enrichment(job, e.to_string())
            }
        }
    }

    /// Best-effort: a failed extraction yields an empty expression.
    async fn extract_skills(&self, posting: &Posting, mode: SkillMode) -> SkillExpression {
        match self.capabilities.extractor.extract(posting, mode).await {
            Ok(skills) => {
                debug!(%mode, skills = %skills, "Skills extracted");
                skills
            }
            Err(e) => {
                warn!(error = %e, %mode, "Skill extraction failed, continuing without skills");
                SkillExpression::empty()
            }
        }
    }

    async fn record_rejection(&self, job: NewJob) {
        if !self.record_rejections {
            return;
        }
        match self.store.create(&job).await {
            Ok(stored) => debug!(job_id = stored.id, "Rejected posting recorded"),
            Err(e) if e.is_already_exists() => {}
            Err(e) => warn!(error = %e, "Recording rejected posting failed"),
        }
    }
}
