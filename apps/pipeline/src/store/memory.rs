//! In-memory job store for tests and dry runs. Data is lost on restart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::types::Json;
use tokio::sync::Mutex;

use crate::models::job::{Dimension, NewJob, StoredJob};
use crate::store::{dimension_name, JobStore, StoreError};

#[derive(Default)]
struct Inner {
    jobs: HashMap<(String, String), StoredJob>,
    dimensions: HashMap<(Dimension, String), i64>,
    websites: HashMap<i64, String>,
    next_job_id: i64,
    next_dimension_id: i64,
    failure: Option<String>,
}

impl Inner {
    fn check_failure(&self) -> Result<(), StoreError> {
        match &self.failure {
            Some(message) => Err(StoreError::Backend(message.clone())),
            None => Ok(()),
        }
    }

    fn upsert(&mut self, dimension: Dimension, name: &str) -> i64 {
        let key = (dimension, name.to_string());
        if let Some(id) = self.dimensions.get(&key) {
            return *id;
        }
        self.next_dimension_id += 1;
        let id = self.next_dimension_id;
        self.dimensions.insert(key, id);
        id
    }

    fn upsert_optional(&mut self, dimension: Dimension, name: &str) -> Option<i64> {
        dimension_name(name).map(|name| self.upsert(dimension, name))
    }
}

/// Single lock over all tables, so `create` is atomic like the Postgres transaction.
#[derive(Default)]
pub struct MemoryJobStore {
    inner: Mutex<Inner>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent operation fail with `StoreError::Backend`.
    pub async fn fail_with(&self, message: impl Into<String>) {
        self.inner.lock().await.failure = Some(message.into());
    }

    pub async fn clear_failure(&self) {
        self.inner.lock().await.failure = None;
    }

    pub async fn job_count(&self) -> usize {
        self.inner.lock().await.jobs.len()
    }

    pub async fn dimension_count(&self, dimension: Dimension) -> usize {
        self.inner
            .lock()
            .await
            .dimensions
            .keys()
            .filter(|(d, _)| *d == dimension)
            .count()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, job: &NewJob) -> Result<StoredJob, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.check_failure()?;

        let posting = &job.posting;
        let key = (posting.external_id.clone(), posting.source.clone());
        let existing = inner.jobs.get(&key).map(|j| (j.id, j.is_relevant, j.created_at));
        let (id, created_at) = match existing {
            Some((id, was_relevant, created_at)) if job.promotes(was_relevant) => (id, created_at),
            Some(_) => {
                return Err(StoreError::already_exists(&posting.external_id, &posting.source));
            }
            None => {
                inner.next_job_id += 1;
                (inner.next_job_id, Utc::now())
            }
        };

        let company_id = inner.upsert_optional(Dimension::Company, &posting.company.name);
        if let (Some(id), Some(website)) = (company_id, posting.company.website.as_ref()) {
            inner.websites.entry(id).or_insert_with(|| website.clone());
        }
        let location_id = posting
            .location
            .as_ref()
            .and_then(|l| inner.upsert_optional(Dimension::Location, &l.region));
        let category_id = inner.upsert_optional(Dimension::Category, &posting.category_name);
        let industry_id = posting
            .industry
            .as_deref()
            .and_then(|i| inner.upsert_optional(Dimension::Industry, i));

        let salary = posting.salary.as_ref();
        let stored = StoredJob {
            id,
            external_id: posting.external_id.clone(),
            source: posting.source.clone(),
            title: posting.title.clone(),
            description: posting.text.clone(),
            source_url: Some(posting.url.clone()),
            company_id,
            location_id,
            category_id,
            industry_id,
            job_type: Some(posting.employment_type.clone()),
            experience_months: posting.experience_months,
            salary_min: salary.and_then(|s| s.min),
            salary_max: salary.and_then(|s| s.max),
            salary_currency: salary.map(|s| s.currency.clone()),
            is_remote: posting.location.as_ref().is_some_and(|l| l.is_remote),
            is_relevant: job.is_relevant,
            is_filtered: job.is_filtered,
            must_have_skills: Json(job.must_have_skills.clone()),
            nice_to_have_skills: Json(job.nice_to_have_skills.clone()),
            posted_at: Some(posting.date_posted),
            expires_at: posting.valid_through,
            created_at,
            updated_at: Utc::now(),
        };
        inner.jobs.insert(key, stored.clone());
        Ok(stored)
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
        source: &str,
    ) -> Result<Option<StoredJob>, StoreError> {
        let inner = self.inner.lock().await;
        inner.check_failure()?;
        Ok(inner
            .jobs
            .get(&(external_id.to_string(), source.to_string()))
            .cloned())
    }

    async fn get_or_create_company(
        &self,
        name: &str,
        website: Option<&str>,
    ) -> Result<i64, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.check_failure()?;
        let id = inner.upsert(Dimension::Company, name.trim());
        if let Some(website) = website {
            inner.websites.entry(id).or_insert_with(|| website.to_string());
        }
        Ok(id)
    }

    async fn get_or_create_location(&self, region: &str) -> Result<i64, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.check_failure()?;
        Ok(inner.upsert(Dimension::Location, region.trim()))
    }

    async fn get_or_create_category(&self, name: &str) -> Result<i64, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.check_failure()?;
        Ok(inner.upsert(Dimension::Category, name.trim()))
    }

    async fn get_or_create_industry(&self, name: &str) -> Result<i64, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.check_failure()?;
        Ok(inner.upsert(Dimension::Industry, name.trim()))
    }

    async fn existing_urls_by_source(
        &self,
        source: &str,
        lookback: Option<Duration>,
    ) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.lock().await;
        inner.check_failure()?;
        let since = lookback.map(|window| Utc::now() - window);
        let mut urls: Vec<String> = inner
            .jobs
            .values()
            .filter(|job| job.source == source)
            .filter(|job| match (since, job.posted_at) {
                (Some(since), Some(posted_at)) => posted_at >= since,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .filter_map(|job| job.source_url.clone())
            .collect();
        urls.sort();
        Ok(urls)
    }
}
