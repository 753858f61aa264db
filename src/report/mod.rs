//! Markdown digest of scored papers.
//!
//! Two layouts are written to the output directory:
//!
//! - `research_papers_YYYYMMDD_HHMMSS.md`: header, tier summary, then every paper
//!   with authors, score, judgment or matched keywords, DOI, link and abstract
//! - `research_summary_YYYYMMDD_HHMMSS.md`: title, score, keywords and link only

use chrono::{DateTime, Local};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::Paper;
use crate::scoring::{GroupedPapers, RelevanceThresholds, RelevanceTier, ScoringMode};

/// Authors listed before "et al."
const MAX_AUTHORS: usize = 3;

/// Errors writing a report
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Failed to write report to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything a report shows
#[derive(Debug, Clone)]
pub struct Report<'a> {
    /// Filtered papers, best first
    pub papers: &'a [Paper],
    pub groups: GroupedPapers<'a>,
    /// Days the fetch window covered
    pub days: u32,
    pub mode: ScoringMode,
    pub thresholds: RelevanceThresholds,
}

impl<'a> Report<'a> {
    /// Distinct paper sources, sorted
    pub fn sources(&self) -> Vec<&'a str> {
        self.papers
            .iter()
            .map(|p| p.source.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn tier_description(&self, tier: RelevanceTier) -> String {
        let RelevanceThresholds { high, medium } = self.thresholds;
        match (self.mode, tier) {
            (ScoringMode::Keyword, RelevanceTier::High) => format!(
                "Papers with strong matches to primary research keywords (score ≥ {})",
                high
            ),
            (ScoringMode::Keyword, RelevanceTier::Medium) => format!(
                "Papers with moderate matches to research keywords (score {}-{})",
                medium,
                high.saturating_sub(1)
            ),
            (ScoringMode::Keyword, RelevanceTier::Low) => format!(
                "Papers with some matches to research keywords (score < {})",
                medium
            ),
            (ScoringMode::Llm, RelevanceTier::High) => {
                format!("Papers judged highly relevant to the research interests (score ≥ {})", high)
            }
            (ScoringMode::Llm, RelevanceTier::Medium) => format!(
                "Papers judged moderately relevant to the research interests (score {}-{})",
                medium,
                high.saturating_sub(1)
            ),
            (ScoringMode::Llm, RelevanceTier::Low) => {
                format!("Papers judged marginally relevant (score < {})", medium)
            }
        }
    }

    /// Full report text
    pub fn render_full(&self, generated: DateTime<Local>) -> String {
        let mut md = String::new();

        md.push_str("# Research Paper Weekly Feed\n\n");
        md.push_str(&format!("**Generated:** {}\n\n", generated.format("%Y-%m-%d %H:%M:%S")));
        md.push_str(&format!("**Time Range:** Last {} days\n\n", self.days));
        md.push_str(&format!("**Sources:** {}\n\n", self.sources().join(", ")));
        md.push_str(&format!("**Scoring:** {}\n\n", self.mode));
        md.push_str(&format!("**Total Papers Found:** {}\n\n", self.papers.len()));
        md.push_str("---\n\n");

        md.push_str("## Summary\n\n");
        for tier in RelevanceTier::ALL {
            md.push_str(&format!(
                "- **{} Relevance:** {} papers\n",
                tier.label(),
                self.groups.tier(tier).len()
            ));
        }
        md.push_str("\n---\n\n");

        for tier in RelevanceTier::ALL {
            let papers = self.groups.tier(tier);
            if papers.is_empty() {
                continue;
            }
            md.push_str(&format!("## {} Relevance Papers ({} papers)\n\n", tier.label(), papers.len()));
            md.push_str(&format!("_{}_\n\n", self.tier_description(tier)));
            for paper in papers {
                format_paper(&mut md, paper);
            }
        }

        md
    }

    /// Summary report text
    pub fn render_summary(&self, generated: DateTime<Local>) -> String {
        let mut md = String::new();

        md.push_str("# Research Paper Summary\n\n");
        md.push_str(&format!("**Generated:** {}\n\n", generated.format("%Y-%m-%d %H:%M:%S")));
        md.push_str(&format!("**Time Range:** Last {} days\n\n", self.days));
        md.push_str(&format!("**Total Papers:** {}\n\n", self.papers.len()));
        md.push_str("---\n\n");

        for tier in RelevanceTier::ALL {
            let papers = self.groups.tier(tier);
            if papers.is_empty() {
                continue;
            }
            md.push_str(&format!("## {} Relevance ({} papers)\n\n", tier.label(), papers.len()));
            for paper in papers {
                md.push_str(&format!("- **{}**\n", paper.title));
                md.push_str(&format!("  - Score: {}\n", paper.relevance_score));
                md.push_str(&format!("  - Keywords: {}\n", paper.matched_keywords.join(", ")));
                md.push_str(&format!("  - Link: {}\n\n", paper.url));
            }
        }

        md
    }
}

fn format_paper(md: &mut String, paper: &Paper) {
    md.push_str(&format!("### {}\n\n", paper.title));
    md.push_str(&format!("**Source:** {}\n\n", paper.source));
    md.push_str(&format!("**Authors:** {}\n\n", format_authors(&paper.authors)));
    md.push_str(&format!("**Published:** {}\n\n", paper.published.format("%Y-%m-%d")));
    md.push_str(&format!("**Relevance Score:** {}\n\n", paper.relevance_score));

    match &paper.llm_metadata {
        Some(meta) => {
            let confidence = meta.confidence.map(|c| c.as_str()).unwrap_or("N/A");
            md.push_str(&format!("**LLM Confidence:** {}\n\n", confidence));
            if let Some(reasoning) = meta.reasoning.as_deref().filter(|r| !r.is_empty()) {
                md.push_str(&format!("**LLM Reasoning:** {}\n\n", reasoning));
            }
            if !meta.topics.is_empty() {
                md.push_str(&format!("**Relevant Topics:** {}\n\n", meta.topics.join(", ")));
            }
            if let Some(error) = &meta.error {
                md.push_str(&format!("**LLM Error:** {}\n\n", error));
            }
        }
        None => {
            md.push_str(&format!("**Matched Keywords:** {}\n\n", paper.matched_keywords.join(", ")));
        }
    }

    if let Some(doi) = paper.doi.as_deref().filter(|d| !d.is_empty()) {
        md.push_str(&format!("**DOI:** {}\n\n", doi));
    }
    md.push_str(&format!("**Link:** {}\n\n", paper.url));
    if paper.has_abstract() {
        md.push_str(&format!("**Abstract:**\n\n{}\n\n", paper.r#abstract));
    }
    md.push_str("---\n\n");
}

/// "A, B, C" or "A, B, C, et al."
pub fn format_authors(authors: &[String]) -> String {
    if authors.len() <= MAX_AUTHORS {
        authors.join(", ")
    } else {
        format!("{}, et al.", authors[..MAX_AUTHORS].join(", "))
    }
}

/// Writes reports into an output directory
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl ReportGenerator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write the full report and return its path
    pub fn write_full(&self, report: &Report<'_>) -> Result<PathBuf, ReportError> {
        let now = Local::now();
        self.write(&format!("research_papers_{}.md", now.format("%Y%m%d_%H%M%S")), &report.render_full(now))
    }

    /// Write the summary report and return its path
    pub fn write_summary(&self, report: &Report<'_>) -> Result<PathBuf, ReportError> {
        let now = Local::now();
        self.write(&format!("research_summary_{}.md", now.format("%Y%m%d_%H%M%S")), &report.render_summary(now))
    }

    fn write(&self, filename: &str, contents: &str) -> Result<PathBuf, ReportError> {
        let path = self.output_dir.join(filename);
        fs::create_dir_all(&self.output_dir)
            .and_then(|_| fs::write(&path, contents))
            .map_err(|source| ReportError::Io {
                path: path.clone(),
                source,
            })?;

        tracing::info!("Report saved to: {}", path.display());
        Ok(path)
    }
}
