//! Rule-based backend built on the skill vocabulary.
//!
//! Posting text is cut into segments (lines, then sentences). Each segment is
//! either required or preferred: an inline marker ("nice to have", "a plus",
//! "must", ...) decides, otherwise the last section header seen does. Inside a
//! segment, skills joined by `or` or `/` form one alternative group.

use async_trait::async_trait;
use tracing::debug;

use super::vocabulary::{Mention, Vocabulary};
use super::{ClassifierError, RelevanceClassifier, SkillExtractor, SkillMode};
use crate::models::posting::{CandidateContext, Posting};
use crate::models::skills::SkillExpression;

const PREFERRED_MARKERS: &[&str] = &[
    "nice to have",
    "nice-to-have",
    "a plus",
    "plus:",
    "preferred",
    "bonus",
    "would be great",
    "advantage",
    "desirable",
    "optional",
    "буде плюсом",
    "буде перевагою",
    "перевагою",
    "бажано",
    "будет плюсом",
    "преимуществом",
    "желательно",
];

const REQUIRED_MARKERS: &[&str] = &[
    "must",
    "required",
    "requirement",
    "mandatory",
    "proficient",
    "strong experience",
    "обов'язково",
    "обов’язково",
    "вимоги",
    "обязательно",
    "требования",
];

const ALTERNATION: &[&str] = &["/", "|", "or", ", or", "або", ", або", "или", ", или"];

/// Required and preferred skills found in one text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub required: SkillExpression,
    pub preferred: SkillExpression,
}

impl Extraction {
    pub fn for_mode(self, mode: SkillMode) -> SkillExpression {
        match mode {
            SkillMode::Required => self.required,
            SkillMode::Preferred => self.preferred,
        }
    }
}

#[derive(Default)]
pub struct KeywordExtractor {
    vocabulary: Vocabulary,
}

impl KeywordExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analyze(&self, text: &str) -> Extraction {
        let lowered = text.to_lowercase();
        let mut required: Vec<Vec<&'static str>> = Vec::new();
        let mut preferred: Vec<Vec<&'static str>> = Vec::new();
        let mut section = SkillMode::Required;

        for line in lowered.lines() {
            let line = line.trim().trim_start_matches(['-', '*', '•', '–']).trim();
            if line.is_empty() {
                continue;
            }

            if line.ends_with(':') && self.vocabulary.mentions(line).is_empty() {
                section = marker_mode(line).unwrap_or(SkillMode::Required);
                continue;
            }

            for segment in sentences(line) {
                let mentions = self.vocabulary.mentions(segment);
                if mentions.is_empty() {
                    continue;
                }
                let groups = group_alternatives(segment, &mentions);
                match marker_mode(segment).unwrap_or(section) {
                    SkillMode::Required => required.extend(groups),
                    SkillMode::Preferred => preferred.extend(groups),
                }
            }
        }

        Extraction {
            required: SkillExpression::from_groups_lossy(required),
            preferred: SkillExpression::from_groups_lossy(preferred),
        }
    }
}

#[async_trait]
impl SkillExtractor for KeywordExtractor {
    async fn extract(
        &self,
        posting: &Posting,
        mode: SkillMode,
    ) -> Result<SkillExpression, ClassifierError> {
        Ok(self.analyze(&posting.text).for_mode(mode))
    }
}

/// Judges relevance by the share of the posting's required skill groups the CV
/// covers.
pub struct KeywordRelevance {
    extractor: KeywordExtractor,
    threshold: f64,
}

impl KeywordRelevance {
    pub fn new(threshold: f64) -> Self {
        Self {
            extractor: KeywordExtractor::new(),
            threshold,
        }
    }

    /// Share of required groups satisfied by the CV, or `None` when the posting
    /// names no known skills at all.
    pub fn overlap(&self, posting_text: &str, cv_text: &str) -> Option<f64> {
        let extraction = self.extractor.analyze(posting_text);
        let wanted = if extraction.required.is_empty() {
            extraction.preferred
        } else {
            extraction.required
        };
        if wanted.is_empty() {
            return None;
        }

        let cv_skills: Vec<&str> = self
            .extractor
            .vocabulary
            .skills_in(cv_text)
            .into_iter()
            .collect();
        let covered = wanted
            .groups()
            .iter()
            .filter(|group| cv_skills.iter().any(|s| group.contains(s)))
            .count();
        Some(covered as f64 / wanted.len() as f64)
    }
}

#[async_trait]
impl RelevanceClassifier for KeywordRelevance {
    async fn is_relevant(
        &self,
        posting: &Posting,
        candidate: &CandidateContext,
    ) -> Result<bool, ClassifierError> {
        let Some(score) = self.overlap(&posting.full_text(), &candidate.cv_text) else {
            return Ok(true);
        };
        debug!(
            external_id = %posting.external_id,
            score,
            threshold = self.threshold,
            "Keyword relevance scored"
        );
        Ok(score >= self.threshold)
    }
}

fn marker_mode(text: &str) -> Option<SkillMode> {
    if PREFERRED_MARKERS.iter().any(|m| text.contains(m)) {
        Some(SkillMode::Preferred)
    } else if REQUIRED_MARKERS.iter().any(|m| text.contains(m)) {
        Some(SkillMode::Required)
    } else {
        None
    }
}

/// Splits on `;`, `!`, `?` and on a `.` that ends a sentence (so `Node.js` stays whole).
fn sentences(line: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = line.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let ends = match c {
            ';' | '!' | '?' => true,
            '.' => chars.peek().map_or(true, |(_, next)| next.is_whitespace()),
            _ => false,
        };
        if ends {
            out.push(line[start..i].trim());
            start = i + c.len_utf8();
        }
    }
    out.push(line[start..].trim());
    out.retain(|s| !s.is_empty());
    out
}

fn group_alternatives(segment: &str, mentions: &[Mention]) -> Vec<Vec<&'static str>> {
    let mut groups: Vec<Vec<&'static str>> = Vec::new();
    let mut prev_end: Option<usize> = None;
    for mention in mentions {
        let joined = prev_end
            .map(|end| ALTERNATION.contains(&segment[end..mention.start].trim()))
            .unwrap_or(false);
        match groups.last_mut() {
            Some(group) if joined => group.push(mention.skill),
            _ => groups.push(vec![mention.skill]),
        }
        prev_end = Some(mention.end);
    }
    groups
}
