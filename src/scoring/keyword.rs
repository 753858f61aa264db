//! Keyword frequency scoring.

use async_trait::async_trait;
use regex::Regex;
use std::collections::HashSet;

use super::{sort_by_score, RelevanceScorer, RelevanceThresholds, ScoringError, ScoringMode};
use crate::models::Paper;

/// Points per occurrence of a primary keyword
pub const PRIMARY_WEIGHT: u32 = 10;
/// Points per occurrence of a secondary keyword
pub const SECONDARY_WEIGHT: u32 = 3;

#[derive(Debug, Clone)]
struct KeywordPattern {
    keyword: String,
    pattern: Regex,
}

impl KeywordPattern {
    fn compile(keyword: String) -> Result<Self, ScoringError> {
        let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(&keyword))).map_err(|source| {
            ScoringError::InvalidKeyword {
                keyword: keyword.clone(),
                source,
            }
        })?;
        Ok(Self { keyword, pattern })
    }

    fn count(&self, text: &str) -> u32 {
        self.pattern.find_iter(text).count() as u32
    }
}

/// Scores papers by whole-word keyword occurrences in title and abstract
///
/// Matching is case-insensitive. Keywords are lower-cased and deduplicated within each
/// list; a keyword listed as both primary and secondary scores under both weights.
#[derive(Debug, Clone)]
pub struct KeywordScorer {
    primary: Vec<KeywordPattern>,
    secondary: Vec<KeywordPattern>,
}

impl KeywordScorer {
    pub fn new<P, S>(primary: P, secondary: S) -> Result<Self, ScoringError>
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        let primary = compile_unique(primary)?;
        let secondary = compile_unique(secondary)?;

        if primary.is_empty() && secondary.is_empty() {
            tracing::warn!("No keywords configured; every paper will score 0");
        }

        Ok(Self { primary, secondary })
    }

    /// Score one paper. Returns the score and the matched keywords,
    /// primary keywords first, each in configured order.
    pub fn score(&self, paper: &Paper) -> (u32, Vec<String>) {
        let text = format!("{} {}", paper.title, paper.r#abstract).to_lowercase();

        let mut score = 0;
        let mut matched = Vec::new();

        for (patterns, weight) in [(&self.primary, PRIMARY_WEIGHT), (&self.secondary, SECONDARY_WEIGHT)] {
            for keyword in patterns {
                let count = keyword.count(&text);
                if count > 0 {
                    score += count * weight;
                    matched.push(keyword.keyword.clone());
                }
            }
        }

        (score, matched)
    }

    /// Score all papers and keep those reaching `min_score`, best first
    pub fn filter(&self, papers: Vec<Paper>, min_score: u32) -> Vec<Paper> {
        let total = papers.len();
        let mut kept: Vec<Paper> = papers
            .into_iter()
            .filter_map(|mut paper| {
                let (score, matched) = self.score(&paper);
                if score < min_score {
                    return None;
                }
                paper.relevance_score = score;
                paper.matched_keywords = matched;
                Some(paper)
            })
            .collect();

        sort_by_score(&mut kept);
        tracing::info!("Keyword filter kept {}/{} papers (min score {})", kept.len(), total, min_score);
        kept
    }
}

fn compile_unique<I>(keywords: I) -> Result<Vec<KeywordPattern>, ScoringError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut seen = HashSet::new();
    keywords
        .into_iter()
        .map(|k| k.as_ref().trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .filter(|k| seen.insert(k.clone()))
        .map(KeywordPattern::compile)
        .collect()
}

#[async_trait]
impl RelevanceScorer for KeywordScorer {
    fn mode(&self) -> ScoringMode {
        ScoringMode::Keyword
    }

    fn thresholds(&self) -> RelevanceThresholds {
        RelevanceThresholds::KEYWORD
    }

    async fn score_papers(&mut self, papers: Vec<Paper>, min_score: u32) -> Vec<Paper> {
        self.filter(papers, min_score)
    }
}
