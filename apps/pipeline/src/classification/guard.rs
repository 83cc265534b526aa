//! Rules every backend shares: blank inputs short-circuit, and each call is
//! bounded by a timeout.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{ClassifierError, RelevanceClassifier, SkillExtractor, SkillMode};
use crate::models::posting::{CandidateContext, Posting};
use crate::models::skills::SkillExpression;

pub struct GuardedClassifier {
    inner: Arc<dyn RelevanceClassifier>,
    timeout: Duration,
}

impl GuardedClassifier {
    pub fn new(inner: Arc<dyn RelevanceClassifier>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl RelevanceClassifier for GuardedClassifier {
    async fn is_relevant(
        &self,
        posting: &Posting,
        candidate: &CandidateContext,
    ) -> Result<bool, ClassifierError> {
        // Nothing to compare against: keep the posting.
        if candidate.cv_text.trim().is_empty() || posting.text.trim().is_empty() {
            debug!(external_id = %posting.external_id, "Blank CV or posting text, judged relevant");
            return Ok(true);
        }
        tokio::time::timeout(self.timeout, self.inner.is_relevant(posting, candidate))
            .await
            .map_err(|_| ClassifierError::Timeout(self.timeout))?
    }
}

pub struct GuardedExtractor {
    inner: Arc<dyn SkillExtractor>,
    timeout: Duration,
}

impl GuardedExtractor {
    pub fn new(inner: Arc<dyn SkillExtractor>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl SkillExtractor for GuardedExtractor {
    async fn extract(
        &self,
        posting: &Posting,
        mode: SkillMode,
    ) -> Result<SkillExpression, ClassifierError> {
        if posting.text.trim().is_empty() {
            return Ok(SkillExpression::empty());
        }
        tokio::time::timeout(self.timeout, self.inner.extract(posting, mode))
            .await
            .map_err(|_| ClassifierError::Timeout(self.timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{posting, ScriptedClassifier, ScriptedExtractor};

    #[tokio::test(start_paused = true)]
    async fn test_slow_classifier_times_out() {
        let slow = Arc::new(ScriptedClassifier::relevant().with_delay(Duration::from_secs(120)));
        let guarded = GuardedClassifier::new(slow.clone(), Duration::from_secs(60));

        let err = guarded
            .is_relevant(&posting("1", "Dev"), &CandidateContext::new("Rust"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClassifierError::Timeout(d) if d == Duration::from_secs(60)));
        assert_eq!(slow.calls(), 1);
    }

    #[tokio::test]
    async fn test_blank_cv_skips_backend() {
        let backend = Arc::new(ScriptedClassifier::not_relevant());
        let guarded = GuardedClassifier::new(backend.clone(), Duration::from_secs(60));

        let relevant = guarded
            .is_relevant(&posting("1", "Dev"), &CandidateContext::new("   "))
            .await
            .unwrap();
        assert!(relevant);
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_blank_posting_text_yields_no_skills() {
        let backend = Arc::new(ScriptedExtractor::new());
        let guarded = GuardedExtractor::new(backend.clone(), Duration::from_secs(60));
        let mut empty = posting("1", "Dev");
        empty.text = String::new();

        let skills = guarded.extract(&empty, SkillMode::Required).await.unwrap();
        assert!(skills.is_empty());
        assert_eq!(backend.calls(), 0);
    }
}
