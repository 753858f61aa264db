//! LLM relevance scoring backed by the on-disk decision cache.
//!
//! Each paper is looked up in the [`DecisionCache`] by the md5 of its title and
//! abstract. Only misses reach the configured [`RelevanceJudge`]; successful judgments
//! are written back so reruns over overlapping windows cost nothing. A failed judgment
//! never aborts a batch: the paper scores 0 and carries the error in its metadata.

mod azure;
mod dashscope;
mod judge;
pub mod mock;
mod prompt;

pub use azure::{AzureOpenAiJudge, AZURE_API_VERSION, DEFAULT_AZURE_DEPLOYMENT};
pub use dashscope::{DashScopeJudge, DASHSCOPE_BASE_URL, DEFAULT_DASHSCOPE_MODEL};
pub use judge::{parse_decision, LlmError, ProviderKind, RelevanceJudge, MAX_TOKENS, TEMPERATURE};
pub use mock::MockJudge;
pub use prompt::{JudgmentRequest, MISSING_ABSTRACT, SYSTEM_PROMPT};

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use super::{sort_by_score, RelevanceScorer, RelevanceThresholds, ScoringError, ScoringMode};
use crate::config::LlmSettings;
use crate::models::{LlmMetadata, Paper};
use crate::utils::DecisionCache;

/// Log progress every this many papers
const PROGRESS_INTERVAL: usize = 10;

/// Counters for one scorer's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoringStats {
    pub cache_hits: usize,
    pub cache_misses: usize,
    /// Judgments attempted, successful or not
    pub api_calls: usize,
}

impl ScoringStats {
    /// Share of lookups served from the cache, in percent
    pub fn hit_rate(&self) -> Option<f64> {
        let lookups = self.cache_hits + self.cache_misses;
        (lookups > 0).then(|| self.cache_hits as f64 / lookups as f64 * 100.0)
    }
}

/// Outcome of judging a single paper
#[derive(Debug, Clone, PartialEq)]
pub struct PaperJudgment {
    pub relevant: bool,
    pub score: u32,
    pub metadata: LlmMetadata,
}

/// Scores papers with an external judge, consulting the decision cache first
#[derive(Debug)]
pub struct LlmScorer {
    cache: DecisionCache,
    judge: Arc<dyn RelevanceJudge>,
    research_interests: String,
    stats: ScoringStats,
}

impl LlmScorer {
    pub fn new(cache: DecisionCache, judge: Arc<dyn RelevanceJudge>, research_interests: impl Into<String>) -> Self {
        Self {
            cache,
            judge,
            research_interests: research_interests.into(),
            stats: ScoringStats::default(),
        }
    }

    /// Open (creating if needed) the cache directory and build a scorer on it
    pub fn open(
        cache_dir: impl Into<PathBuf>,
        judge: Arc<dyn RelevanceJudge>,
        research_interests: impl Into<String>,
    ) -> Result<Self, ScoringError> {
        let cache = DecisionCache::open(cache_dir)?;
        Ok(Self::new(cache, judge, research_interests))
    }

    pub fn stats(&self) -> ScoringStats {
        self.stats
    }

    pub fn cache(&self) -> &DecisionCache {
        &self.cache
    }

    /// Judge one paper, from cache when possible
    pub async fn score_paper(&mut self, paper: &Paper) -> PaperJudgment {
        let key = paper.cache_key();

        if let Some(cached) = self.cache.get(&key) {
            self.stats.cache_hits += 1;
            tracing::debug!("Cache hit for '{}'", truncate_title(&paper.title));
            return PaperJudgment {
                relevant: cached.relevant,
                score: cached.score,
                metadata: LlmMetadata {
                    confidence: Some(cached.confidence),
                    reasoning: Some(cached.reasoning),
                    topics: cached.topics,
                    cached: true,
                    error: None,
                },
            };
        }

        self.stats.cache_misses += 1;
        tracing::debug!("Cache miss for '{}'", truncate_title(&paper.title));

        let request = JudgmentRequest::for_paper(paper, &self.research_interests);
        self.stats.api_calls += 1;

        match self.judge.judge(&request).await {
            Ok(decision) => {
                if let Err(e) = self.cache.put(&key, &decision) {
                    tracing::warn!("Failed to cache decision for '{}': {}", truncate_title(&paper.title), e);
                }
                PaperJudgment {
                    relevant: decision.relevant,
                    score: decision.score,
                    metadata: LlmMetadata {
                        confidence: Some(decision.confidence),
                        reasoning: Some(decision.reasoning),
                        topics: decision.topics,
                        cached: false,
                        error: None,
                    },
                }
            }
            Err(e) => {
                tracing::warn!("LLM API error for paper '{}': {}", truncate_title(&paper.title), e);
                PaperJudgment {
                    relevant: false,
                    score: 0,
                    metadata: LlmMetadata::failed(e.to_string()),
                }
            }
        }
    }

    /// Judge papers in order and keep those scoring at least `min_score`, best first
    pub async fn score_batch(&mut self, papers: Vec<Paper>, min_score: u32) -> Vec<Paper> {
        let total = papers.len();
        tracing::info!(
            "Scoring {} papers with LLM ({} via {})",
            total,
            self.judge.model(),
            self.judge.provider()
        );
        tracing::info!("Cache location: {}", self.cache.dir().display());

        let mut kept = Vec::new();
        for (i, mut paper) in papers.into_iter().enumerate() {
            if (i + 1) % PROGRESS_INTERVAL == 0 {
                tracing::info!("Progress: {}/{} papers scored", i + 1, total);
            }

            let judgment = self.score_paper(&paper).await;
            if judgment.score >= min_score {
                paper.relevance_score = judgment.score;
                paper.matched_keywords = judgment.metadata.topics.clone();
                paper.llm_metadata = Some(judgment.metadata);
                kept.push(paper);
            }
        }

        sort_by_score(&mut kept);
        self.log_stats();
        kept
    }

    fn log_stats(&self) {
        let stats = self.stats;
        tracing::info!(
            api_calls = stats.api_calls,
            cache_hits = stats.cache_hits,
            cache_misses = stats.cache_misses,
            "LLM scoring statistics"
        );
        if let Some(rate) = stats.hit_rate() {
            tracing::info!("Cache hit rate: {:.1}%", rate);
        }
    }
}

#[async_trait]
impl RelevanceScorer for LlmScorer {
    fn mode(&self) -> ScoringMode {
        ScoringMode::Llm
    }

    fn thresholds(&self) -> RelevanceThresholds {
        RelevanceThresholds::LLM
    }

    async fn score_papers(&mut self, papers: Vec<Paper>, min_score: u32) -> Vec<Paper> {
        self.score_batch(papers, min_score).await
    }
}

/// Build the judge selected by the LLM settings
pub fn build_judge(settings: &LlmSettings) -> Result<Arc<dyn RelevanceJudge>, LlmError> {
    settings
        .validate()
        .map_err(|e| LlmError::Config(e.to_string()))?;

    let provider = settings
        .provider_kind()
        .map_err(|e| LlmError::Config(e.to_string()))?;

    Ok(match provider {
        ProviderKind::DashScope => Arc::new(DashScopeJudge::new(
            settings.dashscope.api_key.clone(),
            settings.dashscope.model.clone(),
        )?),
        ProviderKind::Azure => Arc::new(AzureOpenAiJudge::new(
            settings.azure_openai.endpoint.clone(),
            settings.azure_openai.api_key.clone(),
            settings.azure_openai.deployment.clone(),
        )?),
    })
}

fn truncate_title(title: &str) -> String {
    match title.char_indices().nth(50) {
        Some((idx, _)) => format!("{}...", &title[..idx]),
        None => title.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::mock::decision;
    use super::*;
    use crate::sources::mock::make_paper;

    fn scorer(dir: &std::path::Path, judge: Arc<MockJudge>) -> LlmScorer {
        LlmScorer::open(dir, judge, "Social networks and inequality").unwrap()
    }

    #[tokio::test]
    async fn test_second_scoring_is_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let judge = Arc::new(MockJudge::new(decision(true, 80)));
        let mut scorer = scorer(dir.path(), judge.clone());
        let paper = make_paper("Ties", "We study ties.", "ArXiv");

        let first = scorer.score_paper(&paper).await;
        let second = scorer.score_paper(&paper).await;

        assert_eq!(judge.calls(), 1);
        assert!(!first.metadata.cached);
        assert!(second.metadata.cached);
        assert_eq!(first.score, second.score);
        assert_eq!(first.metadata.topics, second.metadata.topics);
        assert_eq!(
            scorer.stats(),
            ScoringStats {
                cache_hits: 1,
                cache_misses: 1,
                api_calls: 1
            }
        );
    }

    #[tokio::test]
    async fn test_cache_survives_scorer_restart() {
        let dir = tempfile::tempdir().unwrap();
        let paper = make_paper("Ties", "We study ties.", "ArXiv");

        let judge = Arc::new(MockJudge::new(decision(true, 80)));
        scorer(dir.path(), judge.clone()).score_paper(&paper).await;

        let mut moved = paper.clone();
        moved.url = "https://elsewhere.example".to_string();
        moved.source = "Nature".to_string();

        let judge = Arc::new(MockJudge::new(decision(false, 5)));
        let judgment = scorer(dir.path(), judge.clone()).score_paper(&moved).await;

        assert_eq!(judge.calls(), 0);
        assert_eq!(judgment.score, 80);
        assert!(judgment.metadata.cached);
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let judge = Arc::new(
            MockJudge::new(decision(true, 60))
                .respond("p1", decision(true, 90))
                .fail_on("p3", "model returned prose"),
        );
        let mut scorer = scorer(dir.path(), judge.clone());

        let papers: Vec<Paper> = ["p1", "p2", "p3", "p4", "p5"]
            .iter()
            .map(|t| make_paper(t, "abstract", "ArXiv"))
            .collect();

        let mut judgments = Vec::new();
        for paper in &papers {
            judgments.push(scorer.score_paper(paper).await);
        }

        assert_eq!(judge.calls(), 5);
        assert_eq!(judgments.iter().filter(|j| j.metadata.error.is_none()).count(), 4);
        let failed = &judgments[2];
        assert_eq!(failed.score, 0);
        assert!(!failed.relevant);
        assert!(failed.metadata.error.as_deref().unwrap().contains("model returned prose"));

        // Failures are not cached
        assert!(scorer.cache().get(&papers[2].cache_key()).is_none());
    }

    #[tokio::test]
    async fn test_batch_filters_sorts_and_annotates() {
        let dir = tempfile::tempdir().unwrap();
        let judge = Arc::new(
            MockJudge::new(decision(false, 10))
                .respond("medium", decision(true, 60))
                .respond("high", decision(true, 90))
                .respond("also medium", decision(true, 60))
                .fail_on("broken", "timeout"),
        );
        let mut scorer = scorer(dir.path(), judge);

        let papers = vec![
            make_paper("medium", "", "ArXiv"),
            make_paper("low", "", "ArXiv"),
            make_paper("broken", "", "ArXiv"),
            make_paper("high", "", "ArXiv"),
            make_paper("also medium", "", "ArXiv"),
        ];

        let kept = scorer.score_papers(papers, 50).await;
        let order: Vec<&str> = kept.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(order, vec!["high", "medium", "also medium"]);

        let top = &kept[0];
        assert_eq!(top.relevance_score, 90);
        assert_eq!(top.matched_keywords, vec!["networks"]);
        let metadata = top.llm_metadata.as_ref().unwrap();
        assert_eq!(metadata.reasoning.as_deref(), Some("scored 90"));
        assert!(!metadata.cached);

        let stats = scorer.stats();
        assert_eq!(stats.api_calls, 5);
        assert_eq!(stats.cache_misses, 5);
        assert_eq!(stats.hit_rate(), Some(0.0));
    }

    #[tokio::test]
    async fn test_min_score_zero_keeps_failures() {
        let dir = tempfile::tempdir().unwrap();
        let judge = Arc::new(MockJudge::new(decision(true, 70)).fail_on("broken", "boom"));
        let mut scorer = scorer(dir.path(), judge);

        let kept = scorer
            .score_batch(vec![make_paper("broken", "", "ArXiv"), make_paper("ok", "", "ArXiv")], 0)
            .await;

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[1].title, "broken");
        assert_eq!(kept[1].relevance_score, 0);
        assert!(kept[1].llm_metadata.as_ref().unwrap().error.is_some());
    }

    #[test]
    fn test_hit_rate() {
        assert_eq!(ScoringStats::default().hit_rate(), None);
        let stats = ScoringStats {
            cache_hits: 3,
            cache_misses: 1,
            api_calls: 1,
        };
        assert_eq!(stats.hit_rate(), Some(75.0));
    }
}
