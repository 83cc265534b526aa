//! Job Record Store — durable, deduplicated storage for processed postings.
//!
//! `create` is the single idempotent write: it either inserts or reports
//! `StoreError::AlreadyExists` for the `(external_id, source)` key. Callers never
//! check for existence before writing. The one exception is a recorded
//! rejection, which an accepted job replaces in place.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::Duration;
use crate::models::job::{NewJob, StoredJob};

#[derive(Debug)]
pub enum StoreError {
    AlreadyExists { external_id: String, source: String },

    Database(sqlx::Error),

    Backend(String),
}

// Implemented by hand: thiserror would treat the `source` field as the error
// cause, which a `String` cannot be.
impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::AlreadyExists {
                external_id,
                source,
            } => write!(f, "job '{external_id}' from '{source}' already exists"),
            StoreError::Database(e) => write!(f, "database error: {e}"),
            StoreError::Backend(msg) => write!(f, "store backend error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e)
    }
}

impl StoreError {
    pub fn already_exists(external_id: &str, source: &str) -> Self {
        StoreError::AlreadyExists {
            external_id: external_id.to_string(),
            source: source.to_string(),
        }
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists { .. })
    }
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Inserts the job and resolves its dimension rows through the same upserts
    /// as the `get_or_create_*` lookups. Fails with `AlreadyExists` when the key
    /// is taken, unless the stored row is a rejection and `job` is accepted, in
    /// which case the row is replaced and keeps its id.
    async fn create(&self, job: &NewJob) -> Result<StoredJob, StoreError>;

    async fn find_by_external_id(
        &self,
        external_id: &str,
        source: &str,
    ) -> Result<Option<StoredJob>, StoreError>;

    // Standalone dimension lookups for callers outside the pipeline; `create`
    // resolves dimensions itself inside its transaction.

    /// Stable id for the company row; the website is only filled in if unset.
    async fn get_or_create_company(
        &self,
        name: &str,
        website: Option<&str>,
    ) -> Result<i64, StoreError>;

    async fn get_or_create_location(&self, region: &str) -> Result<i64, StoreError>;

    async fn get_or_create_category(&self, name: &str) -> Result<i64, StoreError>;

    async fn get_or_create_industry(&self, name: &str) -> Result<i64, StoreError>;

    /// URLs already stored for `source`, optionally limited to postings newer
    /// than `lookback`.
    async fn existing_urls_by_source(
        &self,
        source: &str,
        lookback: Option<Duration>,
    ) -> Result<Vec<String>, StoreError>;
}

/// Trimmed, non-empty name or nothing.
pub(crate) fn dimension_name(name: &str) -> Option<&str> {
    let name = name.trim();
    (!name.is_empty()).then_some(name)
}
