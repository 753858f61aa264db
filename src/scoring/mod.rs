//! Relevance scoring: keyword frequency or LLM judgment, plus tier grouping.
//!
//! Exactly one scorer runs per invocation. Both take ownership of the fetched papers,
//! keep those scoring at least `min_score`, fill in `relevance_score` and
//! `matched_keywords`, and return them sorted by descending score (stable on ties).
//!
//! The two scorers use different scales. Keyword scores are unbounded sums of keyword
//! weights; LLM scores are 0-100. Each scorer carries its own
//! [`RelevanceThresholds`] so grouping and reporting describe the right scale.

mod keyword;
pub mod llm;

pub use keyword::{KeywordScorer, PRIMARY_WEIGHT, SECONDARY_WEIGHT};
pub use llm::{LlmScorer, ScoringStats};

use async_trait::async_trait;
use std::fmt;

use crate::models::Paper;

/// Which scorer a run uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringMode {
    Keyword,
    Llm,
}

impl fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringMode::Keyword => f.write_str("keyword"),
            ScoringMode::Llm => f.write_str("llm"),
        }
    }
}

/// Lower bounds of the high and medium tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelevanceThresholds {
    pub high: u32,
    pub medium: u32,
}

impl RelevanceThresholds {
    /// Keyword-frequency scale
    pub const KEYWORD: Self = Self { high: 20, medium: 10 };

    /// LLM 0-100 scale
    pub const LLM: Self = Self { high: 75, medium: 50 };

    /// Tier a score falls into
    pub fn tier(&self, score: u32) -> RelevanceTier {
        if score >= self.high {
            RelevanceTier::High
        } else if score >= self.medium {
            RelevanceTier::Medium
        } else {
            RelevanceTier::Low
        }
    }
}

/// Relevance tier of a scored paper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelevanceTier {
    High,
    Medium,
    Low,
}

impl RelevanceTier {
    /// All tiers, most relevant first
    pub const ALL: [RelevanceTier; 3] = [RelevanceTier::High, RelevanceTier::Medium, RelevanceTier::Low];

    pub fn label(&self) -> &'static str {
        match self {
            RelevanceTier::High => "High",
            RelevanceTier::Medium => "Medium",
            RelevanceTier::Low => "Low",
        }
    }
}

/// Scored papers split into tiers, each keeping input order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedPapers<'a> {
    pub high: Vec<&'a Paper>,
    pub medium: Vec<&'a Paper>,
    pub low: Vec<&'a Paper>,
}

impl<'a> GroupedPapers<'a> {
    /// Papers in one tier
    pub fn tier(&self, tier: RelevanceTier) -> &[&'a Paper] {
        match tier {
            RelevanceTier::High => &self.high,
            RelevanceTier::Medium => &self.medium,
            RelevanceTier::Low => &self.low,
        }
    }

    /// Total number of papers across tiers
    pub fn len(&self) -> usize {
        self.high.len() + self.medium.len() + self.low.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partition papers into tiers by `relevance_score`
pub fn group_by_relevance(papers: &[Paper], thresholds: RelevanceThresholds) -> GroupedPapers<'_> {
    let mut groups = GroupedPapers::default();
    for paper in papers {
        match thresholds.tier(paper.relevance_score) {
            RelevanceTier::High => groups.high.push(paper),
            RelevanceTier::Medium => groups.medium.push(paper),
            RelevanceTier::Low => groups.low.push(paper),
        }
    }
    groups
}

/// Sort by descending score; equal scores keep their relative order
pub fn sort_by_score(papers: &mut [Paper]) {
    papers.sort_by(|a, b| b.relevance_score.cmp(&a.relevance_score));
}

/// A strategy that scores, filters and sorts papers
#[async_trait]
pub trait RelevanceScorer: Send {
    fn mode(&self) -> ScoringMode;

    /// Tier boundaries on this scorer's scale
    fn thresholds(&self) -> RelevanceThresholds;

    /// Score every paper and keep those with `relevance_score >= min_score`, sorted
    async fn score_papers(&mut self, papers: Vec<Paper>, min_score: u32) -> Vec<Paper>;

    fn group_by_relevance<'a>(&self, papers: &'a [Paper]) -> GroupedPapers<'a> {
        group_by_relevance(papers, self.thresholds())
    }
}

/// Errors that can occur while setting up a scorer
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("Invalid keyword '{keyword}': {source}")]
    InvalidKeyword {
        keyword: String,
        #[source]
        source: regex::Error,
    },

    #[error("Cache error: {0}")]
    Cache(#[from] std::io::Error),
}
