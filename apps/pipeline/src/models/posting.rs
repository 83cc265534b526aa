use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A scraped job posting. Identity for dedup purposes is `(external_id, source)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Posting {
    #[serde(alias = "job_id", deserialize_with = "string_or_number")]
    pub external_id: String,
    #[serde(default)]
    pub source: String,
    pub title: String,
    pub url: String,
    #[serde(alias = "description", default)]
    pub text: String,
    pub company: Company,
    #[serde(alias = "category")]
    pub category_name: String,
    pub employment_type: String,
    pub date_posted: DateTime<Utc>,
    #[serde(default)]
    pub valid_through: Option<DateTime<Utc>>,
    #[serde(default)]
    pub salary: Option<Salary>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub experience_months: Option<f64>,
    #[serde(default)]
    pub industry: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Company {
    pub name: String,
    #[serde(default)]
    pub website: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Salary {
    #[serde(alias = "min_value", default)]
    pub min: Option<f64>,
    #[serde(alias = "max_value", default)]
    pub max: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub region: String,
    #[serde(default)]
    pub is_remote: bool,
    #[serde(default)]
    pub can_apply: bool,
}

/// Candidate-side input to relevance checks (PII-free CV text).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateContext {
    pub cv_text: String,
}

impl CandidateContext {
    pub fn new(cv_text: impl Into<String>) -> Self {
        Self {
            cv_text: cv_text.into(),
        }
    }
}

impl Posting {
    /// Title and body, the text handed to classification.
    pub fn full_text(&self) -> String {
        format!("{}\n\n{}", self.title, self.text)
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Scrapers emit numeric ids; everything downstream keys on strings.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}
