//! Paper model representing a research paper from any source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::judgment::Confidence;

/// Placeholder used when a source provides no author names
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// A research paper from any academic source
///
/// This struct provides a standardized format for papers across all sources.
/// Fetchers fill in the identity and content fields; exactly one scorer per run
/// fills in the scoring fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    /// Paper title
    pub title: String,

    /// Author names in publication order
    pub authors: Vec<String>,

    /// Abstract text (may be empty)
    pub r#abstract: String,

    /// Paper page URL (source-provided, not unique across sources)
    pub url: String,

    /// Publication timestamp
    pub published: DateTime<Utc>,

    /// Label of the source the paper came from ("ArXiv", a journal name, ...)
    pub source: String,

    /// Categories/subjects
    pub categories: Option<Vec<String>>,

    /// Digital Object Identifier
    pub doi: Option<String>,

    /// Direct PDF URL
    pub pdf_url: Option<String>,

    /// Relevance score assigned by the scorer of this run
    #[serde(default)]
    pub relevance_score: u32,

    /// Matched keywords (keyword mode) or topic tags (LLM mode)
    #[serde(default)]
    pub matched_keywords: Vec<String>,

    /// Judgment details, attached only in LLM mode
    #[serde(default)]
    pub llm_metadata: Option<LlmMetadata>,
}

impl Paper {
    /// Create a new paper with required fields
    pub fn new(title: String, url: String, source: String, published: DateTime<Utc>) -> Self {
        Self {
            title,
            authors: Vec::new(),
            r#abstract: String::new(),
            url,
            published,
            source,
            categories: None,
            doi: None,
            pdf_url: None,
            relevance_score: 0,
            matched_keywords: Vec::new(),
            llm_metadata: None,
        }
    }

    /// Key of this paper in the LLM decision cache.
    ///
    /// Depends only on title and abstract.
    pub fn cache_key(&self) -> String {
        crate::utils::DecisionCache::key(&self.title, &self.r#abstract)
    }

    /// Whether the abstract carries any text
    pub fn has_abstract(&self) -> bool {
        !self.r#abstract.trim().is_empty()
    }
}

/// Details of an LLM relevance judgment stored on a paper
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmMetadata {
    pub confidence: Option<Confidence>,
    pub reasoning: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    /// Whether the judgment came from the decision cache
    pub cached: bool,
    /// Set when the judgment failed; the paper then scores 0
    pub error: Option<String>,
}

impl LlmMetadata {
    /// Metadata describing a failed judgment
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

/// Builder for constructing Paper objects
#[derive(Debug, Clone)]
pub struct PaperBuilder {
    paper: Paper,
}

impl PaperBuilder {
    /// Create a new builder with required fields
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<String>,
        published: DateTime<Utc>,
    ) -> Self {
        Self {
            paper: Paper::new(title.into(), url.into(), source.into(), published),
        }
    }

    /// Set authors; an empty list becomes the single "Unknown" placeholder
    pub fn authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let authors: Vec<String> = authors.into_iter().map(Into::into).collect();
        self.paper.authors = if authors.is_empty() {
            vec![UNKNOWN_AUTHOR.to_string()]
        } else {
            authors
        };
        self
    }

    /// Set abstract
    pub fn abstract_text(mut self, abstract_text: impl Into<String>) -> Self {
        self.paper.r#abstract = abstract_text.into();
        self
    }

    /// Set DOI
    pub fn doi(mut self, doi: impl Into<String>) -> Self {
        self.paper.doi = Some(doi.into());
        self
    }

    /// Set PDF URL
    pub fn pdf_url(mut self, url: impl Into<String>) -> Self {
        self.paper.pdf_url = Some(url.into());
        self
    }

    /// Set categories
    pub fn categories(mut self, categories: Vec<String>) -> Self {
        self.paper.categories = Some(categories);
        self
    }

    /// Build the Paper
    pub fn build(self) -> Paper {
        self.paper
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn published() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_paper_builder() {
        let paper = PaperBuilder::new("Test Paper", "https://example.com", "ArXiv", published())
            .authors(["John Doe", "Jane Smith"])
            .abstract_text("This is a test abstract.")
            .doi("10.1234/test.1234")
            .pdf_url("https://example.com/paper.pdf")
            .build();

        assert_eq!(paper.title, "Test Paper");
        assert_eq!(paper.authors, vec!["John Doe", "Jane Smith"]);
        assert_eq!(paper.doi, Some("10.1234/test.1234".to_string()));
        assert_eq!(paper.relevance_score, 0);
        assert!(paper.matched_keywords.is_empty());
        assert!(paper.llm_metadata.is_none());
    }

    #[test]
    fn test_empty_authors_become_unknown() {
        let paper = PaperBuilder::new("Test", "https://example.com", "Nature", published())
            .authors(Vec::<String>::new())
            .build();

        assert_eq!(paper.authors, vec![UNKNOWN_AUTHOR]);
    }

    #[test]
    fn test_cache_key_ignores_url_and_source() {
        let a = PaperBuilder::new("Same title", "https://a.example", "ArXiv", published())
            .abstract_text("Same abstract")
            .build();
        let b = PaperBuilder::new("Same title", "https://b.example", "Nature", published())
            .abstract_text("Same abstract")
            .build();

        assert_eq!(a.cache_key(), b.cache_key());

        let c = PaperBuilder::new("Same title", "https://a.example", "ArXiv", published())
            .abstract_text("Different abstract")
            .build();
        assert_ne!(a.cache_key(), c.cache_key());
    }

    #[test]
    fn test_has_abstract() {
        let paper = PaperBuilder::new("Test", "https://example.com", "ArXiv", published())
            .abstract_text("   ")
            .build();
        assert!(!paper.has_abstract());
    }
}
