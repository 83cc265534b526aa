//! Classification capabilities — relevance judgment and skill extraction.
//!
//! Both are request/response capabilities behind traits. The backend is picked
//! once at startup by `build_capabilities` and carried as `Arc<dyn _>`, so the
//! pipeline never knows what computes the answer.

pub mod always;
pub mod guard;
pub mod keyword;
pub mod llm;
pub mod prompts;
pub mod vocabulary;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::{ClassifierConfig, ConfigError};
use crate::llm_client::{LlmClient, LlmError};
use crate::models::posting::{CandidateContext, Posting};
use crate::models::skills::SkillExpression;

use self::always::{AlwaysRelevant, NoSkills};
use self::guard::{GuardedClassifier, GuardedExtractor};
use self::keyword::{KeywordExtractor, KeywordRelevance};
use self::llm::{LlmExtractor, LlmRelevance};

/// Which skill category an extraction call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillMode {
    /// Must-have skills.
    Required,
    /// Nice-to-have skills.
    Preferred,
}

impl fmt::Display for SkillMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkillMode::Required => f.write_str("required"),
            SkillMode::Preferred => f.write_str("preferred"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classification timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("classifier backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait RelevanceClassifier: Send + Sync {
    async fn is_relevant(
        &self,
        posting: &Posting,
        candidate: &CandidateContext,
    ) -> Result<bool, ClassifierError>;
}

#[async_trait]
pub trait SkillExtractor: Send + Sync {
    async fn extract(
        &self,
        posting: &Posting,
        mode: SkillMode,
    ) -> Result<SkillExpression, ClassifierError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierBackend {
    Always,
    Keyword,
    Llm,
}

impl ClassifierBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassifierBackend::Always => "always",
            ClassifierBackend::Keyword => "keyword",
            ClassifierBackend::Llm => "llm",
        }
    }
}

impl FromStr for ClassifierBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(ClassifierBackend::Always),
            "keyword" => Ok(ClassifierBackend::Keyword),
            "llm" => Ok(ClassifierBackend::Llm),
            other => Err(ConfigError::Invalid {
                key: "CLASSIFIER_BACKEND",
                message: format!("unknown backend '{other}', expected always, keyword or llm"),
            }),
        }
    }
}

/// The pair of capabilities the pipeline consumes, both bounded by the
/// per-call timeout.
#[derive(Clone)]
pub struct Capabilities {
    pub classifier: Arc<dyn RelevanceClassifier>,
    pub extractor: Arc<dyn SkillExtractor>,
}

impl Capabilities {
    pub fn new(
        classifier: Arc<dyn RelevanceClassifier>,
        extractor: Arc<dyn SkillExtractor>,
        timeout: Duration,
    ) -> Self {
        Self {
            classifier: Arc::new(GuardedClassifier::new(classifier, timeout)),
            extractor: Arc::new(GuardedExtractor::new(extractor, timeout)),
        }
    }
}

pub fn build_capabilities(config: &ClassifierConfig) -> Result<Capabilities, ConfigError> {
    let (classifier, extractor): (Arc<dyn RelevanceClassifier>, Arc<dyn SkillExtractor>) =
        match config.backend {
            ClassifierBackend::Always => (Arc::new(AlwaysRelevant), Arc::new(NoSkills)),
            ClassifierBackend::Keyword => (
                Arc::new(KeywordRelevance::new(config.relevance_threshold)),
                Arc::new(KeywordExtractor::new()),
            ),
            ClassifierBackend::Llm => {
                let api_key = config
                    .anthropic_api_key
                    .clone()
                    .ok_or(ConfigError::Missing("ANTHROPIC_API_KEY"))?;
                let client =
                    LlmClient::new(api_key, config.llm_model.clone()).map_err(|e| {
                        ConfigError::Invalid {
                            key: "ANTHROPIC_API_KEY",
                            message: e.to_string(),
                        }
                    })?;
                info!(model = client.model(), "Using model-backed classification");
                (
                    Arc::new(LlmRelevance::new(client.clone())),
                    Arc::new(LlmExtractor::new(client)),
                )
            }
        };

    info!(
        backend = config.backend.as_str(),
        timeout_secs = config.timeout.as_secs(),
        "Classification capabilities initialized"
    );
    Ok(Capabilities::new(classifier, extractor, config.timeout))
}
