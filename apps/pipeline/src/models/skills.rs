//! Skill requirement expressions.
//!
//! An expression is an ordered list of groups. Skills inside a group are
//! interchangeable (OR); every group must be satisfied (AND). Order is
//! presentation only: equality compares the groups as a set of sets.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SkillExpressionError {
    #[error("skill group {index} is empty")]
    EmptyGroup { index: usize },
}

/// A non-empty set of interchangeable skill names.
#[derive(Debug, Clone)]
pub struct SkillGroup(Vec<String>);

impl SkillGroup {
    /// Trims names, drops blanks and duplicates. `None` when nothing is left.
    fn new<G, S>(names: G) -> Option<Self>
    where
        G: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut skills: Vec<String> = Vec::new();
        for name in names {
            let name: String = name.into();
            let name = name.trim();
            if name.is_empty() || skills.iter().any(|s| s == name) {
                continue;
            }
            skills.push(name.to_string());
        }
        (!skills.is_empty()).then_some(Self(skills))
    }

    pub fn skills(&self) -> &[String] {
        &self.0
    }

    /// Case-insensitive membership.
    pub fn contains(&self, skill: &str) -> bool {
        self.0.iter().any(|s| s.eq_ignore_ascii_case(skill.trim()))
    }

    fn canonical(&self) -> BTreeSet<String> {
        self.0.iter().cloned().collect()
    }
}

/// AND-of-OR skill requirement. The empty expression means "no requirement".
#[derive(Debug, Clone, Default)]
pub struct SkillExpression {
    groups: Vec<SkillGroup>,
}

impl SkillExpression {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Strict construction: any group that is empty after trimming is rejected.
    pub fn try_from_groups<I, G, S>(groups: I) -> Result<Self, SkillExpressionError>
    where
        I: IntoIterator<Item = G>,
        G: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut expression = Self::empty();
        for (index, group) in groups.into_iter().enumerate() {
            let group = SkillGroup::new(group).ok_or(SkillExpressionError::EmptyGroup { index })?;
            expression.push_group(group);
        }
        Ok(expression)
    }

    /// Lenient construction for untrusted producers: empty groups are dropped.
    pub fn from_groups_lossy<I, G, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut expression = Self::empty();
        for group in groups.into_iter().filter_map(SkillGroup::new) {
            expression.push_group(group);
        }
        expression
    }

    /// Legacy flat list: every skill becomes its own required group.
    pub fn from_flat<I, S>(skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_groups_lossy(skills.into_iter().map(|s| [s]))
    }

    fn push_group(&mut self, group: SkillGroup) {
        let canonical = group.canonical();
        if !self.groups.iter().any(|g| g.canonical() == canonical) {
            self.groups.push(group);
        }
    }

    pub fn groups(&self) -> &[SkillGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// True when every group has at least one skill in `skills`.
    pub fn is_satisfied_by<S: AsRef<str>>(&self, skills: &[S]) -> bool {
        self.groups
            .iter()
            .all(|group| skills.iter().any(|s| group.contains(s.as_ref())))
    }

    fn canonical(&self) -> BTreeSet<BTreeSet<String>> {
        self.groups.iter().map(SkillGroup::canonical).collect()
    }
}

impl PartialEq for SkillExpression {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for SkillExpression {}

impl fmt::Display for SkillExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.groups.is_empty() {
            return write!(f, "(none)");
        }
        let rendered: Vec<String> = self
            .groups
            .iter()
            .map(|g| match g.0.as_slice() {
                [single] => single.clone(),
                many => format!("({})", many.join(" OR ")),
            })
            .collect();
        write!(f, "{}", rendered.join(" AND "))
    }
}

impl Serialize for SkillExpression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let groups: Vec<&[String]> = self.groups.iter().map(|g| g.0.as_slice()).collect();
        groups.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SkillExpression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let groups = Vec::<Vec<String>>::deserialize(deserializer)?;
        SkillExpression::try_from_groups(groups).map_err(serde::de::Error::custom)
    }
}

/// One group as produced by a model: either a list of alternatives or a bare
/// skill (the legacy flat shape).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LooseGroup {
    Alternatives(Vec<String>),
    Single(String),
}

/// Skill list accepted from untrusted producers. Converts lossily.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct LooseSkillList(Vec<LooseGroup>);

impl From<LooseSkillList> for SkillExpression {
    fn from(list: LooseSkillList) -> Self {
        SkillExpression::from_groups_lossy(list.0.into_iter().map(|g| match g {
            LooseGroup::Alternatives(skills) => skills,
            LooseGroup::Single(skill) => vec![skill],
        }))
    }
}
