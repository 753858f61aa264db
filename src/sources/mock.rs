//! Mock source for testing purposes.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;

use crate::models::{Paper, PaperBuilder};
use crate::sources::{FetchWindow, Source, SourceError};

/// A mock source for testing that returns predefined papers.
#[derive(Debug, Default)]
pub struct MockSource {
    papers: Mutex<Vec<Paper>>,
    failure: Mutex<Option<String>>,
}

impl MockSource {
    /// Create a new mock source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock source returning these papers.
    pub fn with_papers(papers: Vec<Paper>) -> Self {
        Self {
            papers: Mutex::new(papers),
            failure: Mutex::new(None),
        }
    }

    /// Set the papers to return.
    pub fn set_papers(&self, papers: Vec<Paper>) {
        let mut guard = self.papers.lock().unwrap();
        *guard = papers;
    }

    /// Make every fetch fail with a network error.
    pub fn fail_with(&self, message: impl Into<String>) {
        let mut guard = self.failure.lock().unwrap();
        *guard = Some(message.into());
    }
}

#[async_trait]
impl Source for MockSource {
    fn id(&self) -> &str {
        "mock"
    }

    fn name(&self) -> &str {
        "Mock Source"
    }

    async fn fetch(&self, window: &FetchWindow) -> Result<Vec<Paper>, SourceError> {
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(SourceError::Network(message));
        }

        let guard = self.papers.lock().unwrap();
        Ok(guard
            .iter()
            .filter(|p| p.published >= window.cutoff)
            .cloned()
            .collect())
    }
}

/// Helper function to create a mock paper for testing.
pub fn make_paper(title: &str, abstract_text: &str, source: &str) -> Paper {
    let slug: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();

    PaperBuilder::new(title, format!("http://example.com/{}", slug), source, Utc::now())
        .authors(["Test Author"])
        .abstract_text(abstract_text)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_mock_source_respects_window() {
        let mut old = make_paper("Old", "", "Mock");
        old.published = Utc::now() - Duration::days(30);
        let source = MockSource::with_papers(vec![make_paper("New", "", "Mock"), old]);

        let papers = source.fetch(&FetchWindow::last_days(7)).await.unwrap();
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].title, "New");
    }

    #[tokio::test]
    async fn test_mock_source_failure() {
        let source = MockSource::new();
        source.fail_with("offline");
        assert!(matches!(
            source.fetch(&FetchWindow::last_days(7)).await,
            Err(SourceError::Network(_))
        ));
    }
}
