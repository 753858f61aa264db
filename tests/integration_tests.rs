//! Integration tests for Research Digest
//!
//! These tests drive the whole pipeline (fetch, score, group, report) against mock
//! sources and a scripted judge, with caches and reports in temporary directories.

use research_digest::config::{ConfigPaths, Settings};
use research_digest::models::UNKNOWN_AUTHOR;
use research_digest::report::{Report, ReportGenerator};
use research_digest::scoring::llm::mock::decision;
use research_digest::scoring::llm::MockJudge;
use research_digest::scoring::{
    KeywordScorer, LlmScorer, RelevanceScorer, RelevanceThresholds, ScoringMode,
};
use research_digest::sources::mock::make_paper;
use research_digest::sources::{FetchWindow, MockSource, Source};
use research_digest::utils::{deduplicate_papers, DecisionCache};
use research_digest::Paper;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn corpus() -> Vec<Paper> {
    vec![
        make_paper(
            "Social network inequality in labor markets",
            "We study how social network ties shape inequality in hiring.",
            "American Sociological Review",
        ),
        make_paper(
            "Survey methods for migration research",
            "Methods used in the field.",
            "Demography",
        ),
        make_paper(
            "Deep learning for protein folding",
            "A neural approach to structure prediction.",
            "ArXiv",
        ),
    ]
}

async fn fetch(source: &MockSource) -> Vec<Paper> {
    tokio_test::assert_ok!(source.fetch(&FetchWindow::last_days(7)).await)
}

#[tokio::test]
async fn test_keyword_pipeline_writes_full_report() {
    let source = MockSource::with_papers(corpus());
    let papers = fetch(&source).await;
    assert_eq!(papers.len(), 3);

    let mut scorer = KeywordScorer::new(
        ["social network", "inequality", "migration"],
        ["survey", "labor"],
    )
    .unwrap();
    let kept = scorer.score_papers(papers, 1).await;

    // Protein folding matches nothing and is dropped
    assert_eq!(kept.len(), 2);
    assert_eq!(kept[0].title, "Social network inequality in labor markets");
    // Two occurrences each of "social network" and "inequality", one of "labor"
    assert_eq!(kept[0].relevance_score, 43);
    assert_eq!(kept[0].matched_keywords, vec!["social network", "inequality", "labor"]);
    assert_eq!(kept[1].relevance_score, 13);

    let groups = scorer.group_by_relevance(&kept);
    assert_eq!(groups.high.len(), 1);
    assert_eq!(groups.medium.len(), 1);
    assert!(groups.low.is_empty());

    let out = TempDir::new().unwrap();
    let report = Report {
        papers: &kept,
        groups,
        days: 7,
        mode: scorer.mode(),
        thresholds: scorer.thresholds(),
    };
    let path = ReportGenerator::new(out.path()).write_full(&report).unwrap();

    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("research_papers_"));
    assert!(name.ends_with(".md"));

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("Social network inequality in labor markets"));
    assert!(content.contains("Survey methods for migration research"));
    assert!(!content.contains("protein folding"));
    assert!(content.contains("American Sociological Review"));
}

#[tokio::test]
async fn test_llm_pipeline_uses_cache_across_runs() {
    let cache_dir = TempDir::new().unwrap();
    let judge = Arc::new(
        MockJudge::new(decision(false, 20))
            .respond("Social network inequality in labor markets", decision(true, 88))
            .respond("Survey methods for migration research", decision(true, 60)),
    );

    let mut first = LlmScorer::open(cache_dir.path(), judge.clone(), "Networks and inequality").unwrap();
    let kept = first.score_papers(corpus(), 50).await;

    assert_eq!(judge.calls(), 3);
    assert_eq!(kept.len(), 2);
    assert_eq!(kept[0].relevance_score, 88);
    assert_eq!(kept[1].relevance_score, 60);
    assert_eq!(first.stats().cache_misses, 3);

    let groups = first.group_by_relevance(&kept);
    assert_eq!(groups.high.len(), 1);
    assert_eq!(groups.medium.len(), 1);

    // A fresh scorer over the same directory answers everything from disk
    let mut second = LlmScorer::open(cache_dir.path(), judge.clone(), "Networks and inequality").unwrap();
    let again = second.score_papers(corpus(), 50).await;

    assert_eq!(judge.calls(), 3);
    assert_eq!(second.stats().cache_hits, 3);
    assert_eq!(second.stats().api_calls, 0);
    assert_eq!(again.len(), 2);
    assert!(again.iter().all(|p| p.llm_metadata.as_ref().is_some_and(|m| m.cached)));

    let cache = DecisionCache::open(cache_dir.path()).unwrap();
    assert_eq!(cache.stats().unwrap().entries, 3);
}

#[tokio::test]
async fn test_llm_failure_does_not_abort_batch() {
    let cache_dir = TempDir::new().unwrap();
    let judge = Arc::new(
        MockJudge::new(decision(true, 70))
            .fail_on("Deep learning for protein folding", "malformed reply"),
    );

    let mut scorer = LlmScorer::open(cache_dir.path(), judge.clone(), "Networks").unwrap();
    let all = scorer.score_papers(corpus(), 0).await;

    assert_eq!(all.len(), 3);
    let failed = all.last().unwrap();
    assert_eq!(failed.title, "Deep learning for protein folding");
    assert_eq!(failed.relevance_score, 0);
    assert!(failed
        .llm_metadata
        .as_ref()
        .and_then(|m| m.error.as_deref())
        .is_some_and(|e| e.contains("malformed reply")));

    // Failed judgments are not persisted
    let cache = DecisionCache::open(cache_dir.path()).unwrap();
    assert_eq!(cache.stats().unwrap().entries, 2);
}

#[tokio::test]
async fn test_failing_source_and_dedup() {
    let broken = MockSource::new();
    broken.fail_with("connection refused");
    assert!(broken.fetch(&FetchWindow::last_days(7)).await.is_err());

    let mut papers = corpus();
    let mut duplicate = corpus().remove(0);
    duplicate.source = "CrossRef".to_string();
    papers.push(duplicate);

    let unique = deduplicate_papers(papers);
    assert_eq!(unique.len(), 3);
    assert_eq!(unique[0].source, "American Sociological Review");
    assert!(unique.iter().all(|p| !p.authors.is_empty() && p.authors[0] != UNKNOWN_AUTHOR));
}

#[tokio::test]
async fn test_summary_report_for_llm_run() {
    let cache_dir = TempDir::new().unwrap();
    let judge = Arc::new(MockJudge::new(decision(true, 80)));
    let mut scorer = LlmScorer::open(cache_dir.path(), judge, "Networks").unwrap();
    let kept = scorer.score_papers(corpus(), 50).await;

    let out = TempDir::new().unwrap();
    let report = Report {
        papers: &kept,
        groups: scorer.group_by_relevance(&kept),
        days: 3,
        mode: ScoringMode::Llm,
        thresholds: RelevanceThresholds::LLM,
    };
    let path = ReportGenerator::new(out.path().join("nested"))
        .write_summary(&report)
        .unwrap();

    assert!(path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("research_summary_"));
    let content = fs::read_to_string(path).unwrap();
    assert!(content.contains("Deep learning for protein folding"));
}

#[test]
fn test_settings_drive_keyword_scorer() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("keywords.yaml"),
        "keywords:\n  primary: [inequality]\n  secondary: [survey]\n",
    )
    .unwrap();

    let settings = Settings::load(&ConfigPaths {
        keywords: dir.path().join("keywords.yaml"),
        sources: dir.path().join("sources.yaml"),
        llm: dir.path().join("llm.yaml"),
    })
    .unwrap();

    let scorer = KeywordScorer::new(
        &settings.keywords.keywords.primary,
        &settings.keywords.keywords.secondary,
    )
    .unwrap();
    let (score, matched) = scorer.score(&corpus()[0]);
    assert_eq!(score, 20);
    assert_eq!(matched, vec!["inequality"]);
}
