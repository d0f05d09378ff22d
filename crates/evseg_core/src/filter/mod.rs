use regex::{RegexSet, RegexSetBuilder};
use serde::{Deserialize, Serialize};

use crate::domain::EvidenceRecord;
use crate::error::AppError;

/// Decides whether a piece of evidence text is on-topic.
pub trait RelevancePredicate {
    fn is_relevant(&self, text: &str) -> bool;
}

/// Topic patterns as configured. Patterns are regular expressions, matched case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TopicConfig {
    /// Heading used for combined per-entity output, e.g. `CLIMATE`.
    pub label: String,
    pub patterns: Vec<String>,
    /// Wrap every pattern in `\b(?:...)\b` so fragments of longer words do not match.
    pub word_boundaries: bool,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self::climate()
    }
}

impl TopicConfig {
    /// Climate and energy-transition vocabulary for 10-K risk and MD&A sections.
    pub fn climate() -> Self {
        let patterns = [
            // core
            r"climate",
            r"emissions?",
            r"renewables?",
            // carbon
            r"carbon",
            r"carbon neutral",
            r"carbon capture",
            r"carbon offsets?",
            r"carbon credits?",
            r"carbon footprint",
            r"internal carbon pric(e|ing)",
            // reporting frameworks
            r"(ghg|greenhouse gas(es)?)",
            r"scope [123]",
            r"net[- ]?zero",
            r"esg",
            r"sustainability",
            r"decarbonization",
            // energy and utility sector
            r"rvo",
            r"coal retirements?",
            r"clean energy",
            r"methane",
            r"flaring",
            r"renewable portfolio standard",
            r"ccus",
            // regulation and risk
            r"inflation reduction act",
            r"ira",
            r"paris agreement",
            r"transition risk",
            r"physical risk",
            r"epa",
        ];
        Self {
            label: "CLIMATE".to_string(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            word_boundaries: true,
        }
    }
}

/// Disjunction of topic patterns.
#[derive(Debug, Clone)]
pub struct TopicFilter {
    label: String,
    patterns: Vec<String>,
    set: RegexSet,
}

impl TopicFilter {
    pub fn new(config: &TopicConfig) -> Result<Self, AppError> {
        if config.patterns.is_empty() {
            return Err(AppError::new(
                "FILTER_PATTERNS_EMPTY",
                "At least one topic pattern is required",
            ));
        }
        if let Some(pos) = config.patterns.iter().position(|p| p.trim().is_empty()) {
            return Err(AppError::new(
                "FILTER_PATTERN_INVALID",
                "Topic patterns must not be blank",
            )
            .with_details(format!("index={pos}")));
        }

        let compiled: Vec<String> = config
            .patterns
            .iter()
            .map(|p| {
                if config.word_boundaries {
                    format!(r"\b(?:{p})\b")
                } else {
                    p.clone()
                }
            })
            .collect();

        let set = RegexSetBuilder::new(&compiled)
            .case_insensitive(true)
            .build()
            .map_err(|e| {
                AppError::new("FILTER_PATTERN_INVALID", "Failed to compile topic patterns")
                    .with_details(e.to_string())
            })?;

        Ok(Self {
            label: config.label.clone(),
            patterns: config.patterns.clone(),
            set,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Patterns as configured (before boundary wrapping).
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn matches(&self, text: &str) -> bool {
        !text.is_empty() && self.set.is_match(text)
    }

    /// Indices into [`TopicFilter::patterns`] of every pattern found in `text`.
    pub fn matched_patterns(&self, text: &str) -> Vec<usize> {
        if text.is_empty() {
            return Vec::new();
        }
        self.set.matches(text).into_iter().collect()
    }
}

impl RelevancePredicate for TopicFilter {
    fn is_relevant(&self, text: &str) -> bool {
        self.matches(text)
    }
}

/// Keep the records whose text is relevant, preserving order. Records are not modified.
pub fn filter_records(
    records: &[EvidenceRecord],
    predicate: &dyn RelevancePredicate,
) -> Vec<EvidenceRecord> {
    records
        .iter()
        .filter(|r| predicate.is_relevant(&r.evidence_text))
        .cloned()
        .collect()
}
