//! arXiv source: newest submissions per category from the Atom API.

use async_trait::async_trait;
use feed_rs::parser;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{Paper, PaperBuilder};
use crate::sources::{check_status, FetchWindow, Source, SourceError};
use crate::utils::{with_retry, HttpClient, RetryConfig};

/// Base URL for arXiv API
const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";
/// Base URL for arXiv PDFs
const ARXIV_PDF_URL: &str = "https://arxiv.org/pdf";
/// Label stored in `Paper::source`
pub const ARXIV_SOURCE_NAME: &str = "ArXiv";

/// arXiv research source
///
/// Queries each configured category sorted by submission date (newest first) and
/// stops reading a category at the first entry older than the window.
#[derive(Debug, Clone)]
pub struct ArxivSource {
    client: Arc<HttpClient>,
    base_url: String,
    categories: Vec<String>,
    max_results: usize,
    delay: Duration,
    retry: RetryConfig,
}

impl ArxivSource {
    /// Create a new arXiv source
    pub fn new(categories: Vec<String>, max_results: usize) -> Result<Self, SourceError> {
        Ok(Self {
            client: Arc::new(HttpClient::new()?),
            base_url: ARXIV_API_URL.to_string(),
            categories,
            max_results,
            delay: Duration::from_secs(3),
            retry: RetryConfig::default(),
        })
    }

    /// Point at a different API endpoint (for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Pause between category requests
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Retry policy for each request
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn category_url(&self, category: &str) -> String {
        format!(
            "{}?search_query={}&max_results={}&sortBy=submittedDate&sortOrder=descending",
            self.base_url,
            urlencoding::encode(&format!("cat:{}", category)),
            self.max_results
        )
    }

    async fn fetch_category(&self, category: &str) -> Result<feed_rs::model::Feed, SourceError> {
        let url = self.category_url(category);
        let client = Arc::clone(&self.client);

        with_retry(self.retry, || {
            let client = Arc::clone(&client);
            let url = url.clone();
            async move {
                let response = client
                    .get(&url)
                    .header("Accept", "application/atom+xml")
                    .send()
                    .await
                    .map_err(|e| SourceError::Network(format!("Failed to fetch arXiv results: {}", e)))?;

                check_status("arXiv API", response.status())?;

                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| SourceError::Network(format!("Failed to read response: {}", e)))?;

                parser::parse(bytes.as_ref())
                    .map_err(|e| SourceError::Parse(format!("Failed to parse Atom feed: {}", e)))
            }
        })
        .await
    }

    /// Parse an arXiv Atom entry into a Paper
    fn parse_entry(entry: &feed_rs::model::Entry) -> Option<Paper> {
        let title = entry
            .title
            .as_ref()
            .map(|t| collapse_whitespace(&t.content))
            .filter(|t| !t.is_empty())?;

        let published = entry.published.or(entry.updated)?;

        let abstract_text = entry
            .summary
            .as_ref()
            .map(|s| collapse_whitespace(&s.content))
            .unwrap_or_default();

        let paper_id = entry
            .id
            .split("/abs/")
            .last()
            .unwrap_or(entry.id.as_str())
            .to_string();

        let pdf_url = entry
            .links
            .iter()
            .find(|l| l.media_type.as_deref() == Some("application/pdf"))
            .map(|l| l.href.clone())
            .unwrap_or_else(|| format!("{}/{}", ARXIV_PDF_URL, paper_id));

        let categories: Vec<String> = entry.categories.iter().map(|c| c.term.clone()).collect();

        Some(
            PaperBuilder::new(title, entry.id.clone(), ARXIV_SOURCE_NAME, published)
                .authors(entry.authors.iter().map(|a| a.name.clone()))
                .abstract_text(abstract_text)
                .pdf_url(pdf_url)
                .categories(categories)
                .build(),
        )
    }
}

#[async_trait]
impl Source for ArxivSource {
    fn id(&self) -> &str {
        "arxiv"
    }

    fn name(&self) -> &str {
        ARXIV_SOURCE_NAME
    }

    async fn fetch(&self, window: &FetchWindow) -> Result<Vec<Paper>, SourceError> {
        let mut papers = Vec::new();
        let mut seen_ids: HashSet<String> = HashSet::new();

        for (i, category) in self.categories.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            tracing::info!("Fetching papers from category: {}", category);
            let feed = match self.fetch_category(category).await {
                Ok(feed) => feed,
                Err(e) => {
                    tracing::warn!("Error fetching from category {}: {}", category, e);
                    continue;
                }
            };

            for entry in &feed.entries {
                let Some(paper) = Self::parse_entry(entry) else {
                    tracing::debug!("Skipping malformed arXiv entry: {}", entry.id);
                    continue;
                };

                // Sorted newest first: everything after this is older too
                if paper.published < window.cutoff {
                    break;
                }

                // Papers can be cross-listed in several categories
                if seen_ids.insert(paper.url.clone()) {
                    papers.push(paper);
                }
            }
        }

        tracing::info!("Fetched {} unique papers from arXiv", papers.len());
        Ok(papers)
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
