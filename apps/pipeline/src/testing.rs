//! Test doubles and fixtures. Compiled only for tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, BoxStream, StreamExt};

use crate::classification::{ClassifierError, RelevanceClassifier, SkillExtractor, SkillMode};
use crate::models::posting::{CandidateContext, Company, Location, Posting, Salary};
use crate::models::skills::SkillExpression;
use crate::scraper::{PostingSource, ScrapeFilters, SourceError};

/// A posting that passes the default pre-filter.
pub fn posting(external_id: &str, title: &str) -> Posting {
    Posting {
        external_id: external_id.to_string(),
        source: "djinni".to_string(),
        title: title.to_string(),
        url: format!("https://jobs.example/{external_id}"),
        text: "Must have: Rust, PostgreSQL. Docker is a plus.".to_string(),
        company: Company {
            name: "Acme".to_string(),
            website: None,
        },
        category_name: "Backend".to_string(),
        employment_type: "remote".to_string(),
        date_posted: Utc::now(),
        valid_through: None,
        salary: Some(Salary {
            min: Some(4000.0),
            max: Some(6000.0),
            currency: "USD".to_string(),
        }),
        location: Some(Location {
            region: "EU".to_string(),
            is_remote: true,
            can_apply: true,
        }),
        experience_months: Some(24.0),
        industry: Some("Software".to_string()),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Relevance classifier
// ────────────────────────────────────────────────────────────────────────────

/// Relevance double scripted per external id, with call tracking.
#[derive(Default)]
pub struct ScriptedClassifier {
    default_relevant: bool,
    not_relevant: HashSet<String>,
    failing: HashSet<String>,
    slow: HashMap<String, Duration>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    pub fn relevant() -> Self {
        Self {
            default_relevant: true,
            ..Default::default()
        }
    }

    pub fn not_relevant() -> Self {
        Self::default()
    }

    pub fn reject(mut self, external_id: &str) -> Self {
        self.not_relevant.insert(external_id.to_string());
        self
    }

    pub fn fail(mut self, external_id: &str) -> Self {
        self.failing.insert(external_id.to_string());
        self
    }

    pub fn slow(mut self, external_id: &str, delay: Duration) -> Self {
        self.slow.insert(external_id.to_string(), delay);
        self
    }

    /// Every call sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RelevanceClassifier for ScriptedClassifier {
    async fn is_relevant(
        &self,
        posting: &Posting,
        _candidate: &CandidateContext,
    ) -> Result<bool, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let id = &posting.external_id;
        if let Some(delay) = self.slow.get(id).copied().or(self.delay) {
            tokio::time::sleep(delay).await;
        }
        if self.failing.contains(id) {
            return Err(ClassifierError::Backend(format!("scripted failure for {id}")));
        }
        Ok(self.default_relevant && !self.not_relevant.contains(id))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Skill extractor
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct ScriptedExtractor {
    required: SkillExpression,
    preferred: SkillExpression,
    failing: Vec<SkillMode>,
    calls: AtomicUsize,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_skills(mut self, required: SkillExpression, preferred: SkillExpression) -> Self {
        self.required = required;
        self.preferred = preferred;
        self
    }

    pub fn failing(mut self, mode: SkillMode) -> Self {
        self.failing.push(mode);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SkillExtractor for ScriptedExtractor {
    async fn extract(
        &self,
        _posting: &Posting,
        mode: SkillMode,
    ) -> Result<SkillExpression, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&mode) {
            return Err(ClassifierError::Backend(format!("scripted {mode} failure")));
        }
        Ok(match mode {
            SkillMode::Required => self.required.clone(),
            SkillMode::Preferred => self.preferred.clone(),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Posting source
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum Step {
    Batch(Vec<Posting>),
    Fail(SourceError),
    /// Never yields; only a deadline gets past it.
    Stall,
}

/// Replays a fixed script and remembers the filters of the last call.
pub struct ScriptedSource {
    steps: Mutex<Vec<Step>>,
    last_filters: Mutex<Option<ScrapeFilters>>,
    pulls: std::sync::Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps),
            last_filters: Mutex::new(None),
            pulls: Default::default(),
        }
    }

    pub fn batches_of(batches: Vec<Vec<Posting>>) -> Self {
        Self::new(batches.into_iter().map(Step::Batch).collect())
    }

    pub fn last_filters(&self) -> Option<ScrapeFilters> {
        self.last_filters.lock().unwrap().clone()
    }

    /// Steps consumed so far.
    pub fn pulls(&self) -> usize {
        self.pulls.load(Ordering::SeqCst)
    }
}

impl PostingSource for ScriptedSource {
    fn batches(
        &self,
        filters: ScrapeFilters,
    ) -> BoxStream<'static, Result<Vec<Posting>, SourceError>> {
        *self.last_filters.lock().unwrap() = Some(filters);
        let steps = std::mem::take(&mut *self.steps.lock().unwrap());
        let pulls = self.pulls.clone();

        stream::iter(steps)
            .then(move |step| {
                pulls.fetch_add(1, Ordering::SeqCst);
                async move {
                    match step {
                        Step::Batch(batch) => Ok(batch),
                        Step::Fail(err) => Err(err),
                        Step::Stall => std::future::pending().await,
                    }
                }
            })
            .boxed()
    }
}
