//! # Research Digest
//!
//! Collects newly published papers from arXiv, journal RSS/Atom feeds and the CrossRef
//! API, scores them for relevance to a research profile and writes a markdown digest.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (Paper, RelevanceDecision)
//! - [`sources`]: Paper sources behind a common trait (arXiv, RSS groups, CrossRef)
//! - [`scoring`]: Keyword and LLM relevance scoring, tier grouping
//! - [`report`]: Markdown report rendering
//! - [`utils`]: HTTP client, retry, decision cache, deduplication
//! - [`config`]: YAML configuration with environment overrides
//! - [`ui`]: Colored terminal output for the CLI
//!
//! ## Pipeline
//!
//! ```rust,no_run
//! use research_digest::scoring::{KeywordScorer, RelevanceScorer};
//! use research_digest::sources::{ArxivSource, FetchWindow, Source};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let source = ArxivSource::new(vec!["cs.SI".to_string()], 100)?;
//! let papers = source.fetch(&FetchWindow::last_days(7)).await?;
//!
//! let mut scorer = KeywordScorer::new(["social network"], ["inequality"])?;
//! let kept = scorer.score_papers(papers, 1).await;
//! let groups = scorer.group_by_relevance(&kept);
//! println!("{} highly relevant papers", groups.high.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod models;
pub mod report;
pub mod scoring;
pub mod sources;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use models::Paper;
pub use scoring::{RelevanceScorer, RelevanceThresholds};
pub use sources::Source;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
