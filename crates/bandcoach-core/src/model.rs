//! Core data model types for bandcoach.
//!
//! These are the value types shared by every component: exam skills,
//! weakness records, and the assessment results produced by the external
//! assessment service.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four exam skills a weakness can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Skill {
    Reading,
    Listening,
    Writing,
    Speaking,
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Skill::Reading => write!(f, "Reading"),
            Skill::Listening => write!(f, "Listening"),
            Skill::Writing => write!(f, "Writing"),
            Skill::Speaking => write!(f, "Speaking"),
        }
    }
}

impl FromStr for Skill {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reading" => Ok(Skill::Reading),
            "listening" => Ok(Skill::Listening),
            "writing" => Ok(Skill::Writing),
            "speaking" => Ok(Skill::Speaking),
            other => Err(format!("unknown skill: {other}")),
        }
    }
}

/// How strongly a weakness drags the predicted band down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Low,
    Medium,
    High,
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Impact::Low => write!(f, "Low"),
            Impact::Medium => write!(f, "Medium"),
            Impact::High => write!(f, "High"),
        }
    }
}

impl FromStr for Impact {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Impact::Low),
            "medium" | "med" => Ok(Impact::Medium),
            "high" => Ok(Impact::High),
            other => Err(format!("unknown impact: {other}")),
        }
    }
}

/// A sub-skill topic flagged for remediation after an assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaknessRecord {
    /// Identifier assigned by the assessment service.
    pub id: u32,
    /// Topic name, unique among active records (e.g. "Match Headings").
    pub topic: String,
    /// Exam skill the topic belongs to.
    pub skill: Skill,
    /// Estimated impact on the band score.
    pub impact: Impact,
}

impl WeaknessRecord {
    pub fn new(id: u32, topic: impl Into<String>, skill: Skill, impact: Impact) -> Self {
        Self {
            id,
            topic: topic.into(),
            skill,
            impact,
        }
    }
}

/// Outcome of a completed mock test, as graded by the assessment service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    /// Number of correctly answered questions.
    pub correct_count: u32,
    /// Number of questions in the test.
    pub total_count: u32,
    /// Band score the service derived from the answers.
    pub derived_score: f64,
    /// Weaknesses detected in this test; supersede any earlier set.
    #[serde(default)]
    pub derived_weaknesses: Vec<WeaknessRecord>,
}

impl AssessmentResult {
    /// Fraction of questions answered correctly (0.0 for an empty test).
    pub fn accuracy(&self) -> f64 {
        if self.total_count == 0 {
            0.0
        } else {
            self.correct_count as f64 / self.total_count as f64
        }
    }
}
