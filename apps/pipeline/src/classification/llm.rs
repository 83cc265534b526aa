//! Model-backed backend. Output is parsed leniently: flat skill lists become
//! singleton groups and empty groups are dropped.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::prompts::{
    skills_category, RELEVANCE_PROMPT_TEMPLATE, RELEVANCE_SYSTEM, SKILLS_PROMPT_TEMPLATE,
};
use super::{ClassifierError, RelevanceClassifier, SkillExtractor, SkillMode};
use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, NO_INFERENCE_INSTRUCTION};
use crate::llm_client::LlmClient;
use crate::models::posting::{CandidateContext, Posting};
use crate::models::skills::{LooseSkillList, SkillExpression};

#[derive(Debug, Deserialize)]
struct RelevanceResponse {
    is_relevant: bool,
}

#[derive(Debug, Deserialize)]
struct SkillsResponse {
    #[serde(default)]
    skills: Option<LooseSkillList>,
}

impl From<SkillsResponse> for SkillExpression {
    fn from(response: SkillsResponse) -> Self {
        response.skills.map(Into::into).unwrap_or_default()
    }
}

pub struct LlmRelevance {
    client: LlmClient,
}

impl LlmRelevance {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RelevanceClassifier for LlmRelevance {
    async fn is_relevant(
        &self,
        posting: &Posting,
        candidate: &CandidateContext,
    ) -> Result<bool, ClassifierError> {
        let prompt = RELEVANCE_PROMPT_TEMPLATE
            .replace("{cv_text}", &candidate.cv_text)
            .replace("{posting_text}", &posting.full_text());
        let response: RelevanceResponse = self.client.call_json(&prompt, RELEVANCE_SYSTEM).await?;
        debug!(
            external_id = %posting.external_id,
            is_relevant = response.is_relevant,
            "LLM relevance judged"
        );
        Ok(response.is_relevant)
    }
}

pub struct LlmExtractor {
    client: LlmClient,
    system: String,
}

impl LlmExtractor {
    pub fn new(client: LlmClient) -> Self {
        Self {
            client,
            system: format!("{JSON_ONLY_SYSTEM} {NO_INFERENCE_INSTRUCTION}"),
        }
    }
}

#[async_trait]
impl SkillExtractor for LlmExtractor {
    async fn extract(
        &self,
        posting: &Posting,
        mode: SkillMode,
    ) -> Result<SkillExpression, ClassifierError> {
        let (category, exclusion) = skills_category(mode);
        let prompt = SKILLS_PROMPT_TEMPLATE
            .replace("{category}", category)
            .replace("{exclusion}", exclusion)
            .replace("{posting_text}", &posting.text);
        let response: SkillsResponse = self.client.call_json(&prompt, &self.system).await?;
        Ok(response.into())
    }
}
