use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::classification::ClassifierBackend;
use crate::llm_client::DEFAULT_MODEL;
use crate::pipeline::prefilter::FilterConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable '{0}' is not set")]
    Missing(&'static str),

    #[error("invalid value for '{key}': {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::Invalid {
                key: "JOB_STORE",
                message: format!("unknown store '{other}', expected postgres or memory"),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub backend: ClassifierBackend,
    pub anthropic_api_key: Option<String>,
    pub llm_model: String,
    /// Minimum share of required skill groups the CV must cover (keyword backend).
    pub relevance_threshold: f64,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub url: String,
    pub source: String,
    pub url_lookback_days: i64,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub run_migrations: bool,
    pub classifier: ClassifierConfig,
    pub scraper: ScraperConfig,
    pub filter: FilterConfig,
    pub pipeline_concurrency: usize,
    pub record_rejections: bool,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Self::from_lookup(|key| std::env::var(key).ok())?)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);
        let store: StoreBackend = env.parse_or("JOB_STORE", StoreBackend::Postgres)?;
        let database_url = env.get("DATABASE_URL");
        if store == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let relevance_threshold: f64 = env.parse_or("RELEVANCE_THRESHOLD", 0.25)?;
        if !(0.0..=1.0).contains(&relevance_threshold) {
            return Err(ConfigError::Invalid {
                key: "RELEVANCE_THRESHOLD",
                message: format!("{relevance_threshold} is outside 0.0..=1.0"),
            });
        }

        let pipeline_concurrency: usize = env.parse_or("PIPELINE_CONCURRENCY", 4)?;
        if pipeline_concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "PIPELINE_CONCURRENCY",
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Config {
            store,
            database_url,
            database_max_connections: env.parse_or("DATABASE_MAX_CONNECTIONS", 10)?,
            run_migrations: env.parse_or("RUN_MIGRATIONS", true)?,
            classifier: ClassifierConfig {
                backend: env.parse_or("CLASSIFIER_BACKEND", ClassifierBackend::Keyword)?,
                anthropic_api_key: env.get("ANTHROPIC_API_KEY"),
                llm_model: env
                    .get("LLM_MODEL")
                    .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                relevance_threshold,
                timeout: Duration::from_secs(env.parse_or("CLASSIFIER_TIMEOUT_SECS", 60)?),
            },
            scraper: ScraperConfig {
                url: env.require("SCRAPER_URL")?,
                source: env.get("SCRAPER_SOURCE").unwrap_or_else(|| "djinni".to_string()),
                url_lookback_days: env.parse_or("URL_LOOKBACK_DAYS", 60)?,
            },
            filter: FilterConfig {
                max_experience_months: Some(env.parse_or("FILTER_MAX_EXPERIENCE_MONTHS", 60.0)?),
                require_can_apply: env.parse_or("FILTER_REQUIRE_CAN_APPLY", true)?,
                min_salary: env.parse_opt("FILTER_MIN_SALARY")?,
                employment_types: env
                    .get("FILTER_EMPLOYMENT_TYPES")
                    .map(|v| split_list(&v))
                    .unwrap_or_default(),
            },
            pipeline_concurrency,
            record_rejections: env.parse_or("RECORD_REJECTIONS", false)?,
            port: env.parse_or("PORT", 8080)?,
            rust_log: env.get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Unset and blank are the same thing.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn require(&self, key: &'static str) -> Result<String, ConfigError> {
        self.get(key).ok_or(ConfigError::Missing(key))
    }

    fn parse_opt<T>(&self, key: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|raw| {
                raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                    key,
                    message: e.to_string(),
                })
            })
            .transpose()
    }

    fn parse_or<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        Ok(self.parse_opt(key)?.unwrap_or(default))
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
