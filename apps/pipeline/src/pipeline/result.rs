use serde::Serialize;

use super::prefilter::FilterRejection;
use crate::models::job::NewJob;
use crate::models::posting::Posting;
use crate::models::skills::SkillExpression;

/// Terminal outcome of one posting. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Accepted,
    Filtered,
    NotRelevant,
    Failed,
}

/// Stage at which a posting failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Relevance,
    Store,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageFailure {
    pub stage: Stage,
    pub message: String,
}

/// What the pipeline learned about a posting. Fields are filled only up to the
/// stage the posting reached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingResult {
    pub external_id: String,
    pub source: String,
    pub status: ProcessingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_relevant: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub must_have_skills: Option<SkillExpression>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nice_to_have_skills: Option<SkillExpression>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<NewJob>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored_job_id: Option<i64>,
    /// True when the store already held this posting and nothing was written.
    pub already_stored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<FilterRejection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<StageFailure>,
}

impl ProcessingResult {
    fn base(posting: &Posting, status: ProcessingStatus) -> Self {
        Self {
            external_id: posting.external_id.clone(),
            source: posting.source.clone(),
            status,
            is_relevant: None,
            must_have_skills: None,
            nice_to_have_skills: None,
            job: None,
            stored_job_id: None,
            already_stored: false,
            rejection: None,
            failure: None,
        }
    }

    pub fn filtered(posting: &Posting, rejection: FilterRejection) -> Self {
        Self {
            rejection: Some(rejection),
            ..Self::base(posting, ProcessingStatus::Filtered)
        }
    }

    pub fn not_relevant(posting: &Posting) -> Self {
        Self {
            is_relevant: Some(false),
            ..Self::base(posting, ProcessingStatus::NotRelevant)
        }
    }

    pub fn failed(posting: &Posting, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            failure: Some(StageFailure {
                stage,
                message: message.into(),
            }),
            ..Self::base(posting, ProcessingStatus::Failed)
        }
    }

    /// `stored_job_id` is `None` when the posting was already stored.
    pub fn accepted(job: NewJob, stored_job_id: Option<i64>) -> Self {
        Self {
            is_relevant: Some(true),
            must_have_skills: Some(job.must_have_skills.clone()),
            nice_to_have_skills: Some(job.nice_to_have_skills.clone()),
            stored_job_id,
            already_stored: stored_job_id.is_none(),
            ..Self::base(&job.posting, ProcessingStatus::Accepted)
        }
        .with_job(job)
    }

    /// Relevance was judged but storing failed.
    pub fn failed_after_enrichment(job: NewJob, message: impl Into<String>) -> Self {
        Self {
            is_relevant: Some(true),
            must_have_skills: Some(job.must_have_skills.clone()),
            nice_to_have_skills: Some(job.nice_to_have_skills.clone()),
            ..Self::failed(&job.posting, Stage::Store, message)
        }
        .with_job(job)
    }

    fn with_job(mut self, job: NewJob) -> Self {
        self.job = Some(job);
        self
    }
}
