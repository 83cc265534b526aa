use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::models::posting::Posting;
use crate::models::skills::SkillExpression;

/// An enriched posting ready to be written to the job store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewJob {
    pub posting: Posting,
    pub is_relevant: bool,
    pub is_filtered: bool,
    pub must_have_skills: SkillExpression,
    pub nice_to_have_skills: SkillExpression,
}

impl NewJob {
    pub fn accepted(
        posting: Posting,
        must_have_skills: SkillExpression,
        nice_to_have_skills: SkillExpression,
    ) -> Self {
        Self {
            posting,
            is_relevant: true,
            is_filtered: false,
            must_have_skills,
            nice_to_have_skills,
        }
    }

    /// Rejected before classification; kept so later runs can skip it.
    pub fn filtered(posting: Posting) -> Self {
        Self {
            posting,
            is_relevant: false,
            is_filtered: true,
            must_have_skills: SkillExpression::empty(),
            nice_to_have_skills: SkillExpression::empty(),
        }
    }

    pub fn not_relevant(posting: Posting) -> Self {
        Self {
            is_filtered: false,
            ..Self::filtered(posting)
        }
    }

    /// Whether writing this job may replace a row stored with the given
    /// relevance: only an accepted job over a recorded rejection.
    pub fn promotes(&self, stored_is_relevant: bool) -> bool {
        self.is_relevant && !stored_is_relevant
    }
}

/// Persisted job row with normalized dimension references.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StoredJob {
    pub id: i64,
    pub external_id: String,
    pub source: String,
    pub title: String,
    pub description: String,
    pub source_url: Option<String>,
    pub company_id: Option<i64>,
    pub location_id: Option<i64>,
    pub category_id: Option<i64>,
    pub industry_id: Option<i64>,
    pub job_type: Option<String>,
    pub experience_months: Option<f64>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub salary_currency: Option<String>,
    pub is_remote: bool,
    pub is_relevant: bool,
    pub is_filtered: bool,
    pub must_have_skills: Json<SkillExpression>,
    pub nice_to_have_skills: Json<SkillExpression>,
    pub posted_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The four kinds of shared reference rows a job points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Company,
    Location,
    Category,
    Industry,
}

impl Dimension {
    pub fn table(&self) -> &'static str {
        match self {
            Dimension::Company => "jobs.companies",
            Dimension::Location => "jobs.locations",
            Dimension::Category => "jobs.categories",
            Dimension::Industry => "jobs.industries",
        }
    }

    /// Natural-key column.
    pub fn key_column(&self) -> &'static str {
        match self {
            Dimension::Location => "region",
            _ => "name",
        }
    }
}
