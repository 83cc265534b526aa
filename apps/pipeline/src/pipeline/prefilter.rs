//! Pre-filter — cheap local checks that run before any external call.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::posting::Posting;
use crate::scraper::ScrapeFilters;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub max_experience_months: Option<f64>,
    /// Reject postings whose location does not allow the candidate to apply.
    pub require_can_apply: bool,
    pub min_salary: Option<f64>,
    /// Lowercase; empty accepts every employment type.
    pub employment_types: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_experience_months: Some(60.0),
            require_can_apply: true,
            min_salary: None,
            employment_types: Vec::new(),
        }
    }
}

/// Why a posting was rejected. Expected outcome, not an error condition.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FilterRejection {
    #[error("requires {required} months of experience, limit is {limit}")]
    ExperienceTooHigh { required: f64, limit: f64 },

    #[error("location '{region}' does not allow applying")]
    LocationNotApplicable { region: String },

    #[error("salary {offered} is below minimum {minimum}")]
    SalaryBelowMinimum { offered: f64, minimum: f64 },

    #[error("employment type '{employment_type}' is not accepted")]
    EmploymentTypeMismatch { employment_type: String },
}

#[derive(Debug, Clone, Default)]
pub struct PostingFilter {
    config: FilterConfig,
    /// Employment type the scrape query asked for, checked on top of the
    /// configured list.
    query_employment: Option<String>,
}

impl PostingFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            query_employment: None,
        }
    }

    /// Re-checks what a scrape query already asked the source for. Where both
    /// set a limit, the stricter one applies.
    pub fn narrowed_by(&self, filters: &ScrapeFilters) -> Self {
        let mut config = self.config.clone();
        config.min_salary = match (config.min_salary, filters.min_salary) {
            (Some(configured), Some(queried)) => Some(configured.max(queried)),
            (configured, queried) => configured.or(queried),
        };
        let query_employment = filters
            .employment_location
            .as_deref()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .or_else(|| self.query_employment.clone());
        Self {
            config,
            query_employment,
        }
    }

    /// Checks run in a fixed order; the first failing one is reported.
    pub fn check(&self, posting: &Posting) -> Result<(), FilterRejection> {
        if let (Some(limit), Some(required)) =
            (self.config.max_experience_months, posting.experience_months)
        {
            if required > limit {
                return Err(FilterRejection::ExperienceTooHigh { required, limit });
            }
        }

        // A posting without location data can't be judged, so it passes.
        if self.config.require_can_apply {
            if let Some(location) = posting.location.as_ref().filter(|l| !l.can_apply) {
                return Err(FilterRejection::LocationNotApplicable {
                    region: location.region.clone(),
                });
            }
        }

        if let Some(minimum) = self.config.min_salary {
            let offered = posting.salary.as_ref().and_then(|s| s.max.or(s.min));
            if let Some(offered) = offered.filter(|o| *o < minimum) {
                return Err(FilterRejection::SalaryBelowMinimum { offered, minimum });
            }
        }

        // Same as salary and location: an unknown employment type passes.
        let employment_type = posting.employment_type.trim().to_lowercase();
        if !employment_type.is_empty() {
            let listed = self.config.employment_types.is_empty()
                || self.config.employment_types.contains(&employment_type);
            let queried = self
                .query_employment
                .as_ref()
                .map_or(true, |q| *q == employment_type);
            if !(listed && queried) {
                return Err(FilterRejection::EmploymentTypeMismatch { employment_type });
            }
        }

        Ok(())
    }
}
