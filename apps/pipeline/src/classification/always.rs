//! Trivial backend: every posting is relevant and has no extractable skills.

use async_trait::async_trait;

use super::{ClassifierError, RelevanceClassifier, SkillExtractor, SkillMode};
use crate::models::posting::{CandidateContext, Posting};
use crate::models::skills::SkillExpression;

pub struct AlwaysRelevant;

#[async_trait]
impl RelevanceClassifier for AlwaysRelevant {
    async fn is_relevant(
        &self,
        _posting: &Posting,
        _candidate: &CandidateContext,
    ) -> Result<bool, ClassifierError> {
        Ok(true)
    }
}

pub struct NoSkills;

#[async_trait]
impl SkillExtractor for NoSkills {
    async fn extract(
        &self,
        _posting: &Posting,
        _mode: SkillMode,
    ) -> Result<SkillExpression, ClassifierError> {
        Ok(SkillExpression::empty())
    }
}
