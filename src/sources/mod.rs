//! Paper sources with a common trait-based interface.
//!
//! Every source turns its upstream format (arXiv Atom API, journal RSS/Atom feeds,
//! CrossRef JSON) into [`Paper`] records. A source failing as a whole is the
//! caller's business: the CLI logs a warning and carries on with the others.
//! Problems with a single journal or a single entry are handled inside the source.
//!
//! # Source groups
//!
//! - `arxiv` - [`ArxivSource`], one query per configured category
//! - `sage`, `nature`, `other` - [`RssSource`] over the journal feeds of each group
//! - `crossref` - [`CrossRefSource`], journals without a usable feed, queried by ISSN

mod arxiv;
mod crossref;
pub mod mock;
mod rss;

pub use arxiv::{ArxivSource, ARXIV_SOURCE_NAME};
pub use crossref::{CrossRefSource, IssnJournal};
pub use mock::MockSource;
pub use rss::{parse_feed, JournalFeed, RssSource};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::models::Paper;
use crate::utils::{Retryable, TransientError};

/// Time window and journal restriction for one fetch
#[derive(Debug, Clone)]
pub struct FetchWindow {
    /// Number of days to look back
    pub days: u32,

    /// Only fetch this journal code (journal-based sources)
    pub journal: Option<String>,

    /// Papers published before this instant are ignored
    pub cutoff: DateTime<Utc>,
}

impl FetchWindow {
    /// Window covering the last `days` days
    pub fn last_days(days: u32) -> Self {
        Self {
            days,
            journal: None,
            cutoff: Utc::now() - Duration::days(i64::from(days)),
        }
    }

    /// Restrict journal-based sources to a single journal code
    pub fn journal(mut self, journal: impl Into<String>) -> Self {
        self.journal = Some(journal.into());
        self
    }
}

/// The Source trait defines the interface for all paper sources.
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this source (e.g. "arxiv", "sage")
    fn id(&self) -> &str;

    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Fetch papers published inside the window
    async fn fetch(&self, window: &FetchWindow) -> Result<Vec<Paper>, SourceError>;
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error (XML, JSON, ...)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// API error from the source
    #[error("API error: {0}")]
    Api(String),

    /// IO error (file system)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

impl Retryable for SourceError {
    fn transient(&self) -> Option<TransientError> {
        match self {
            SourceError::RateLimit => Some(TransientError::TooManyRequests),
            SourceError::Network(_) => Some(TransientError::Network),
            SourceError::Api(msg) if msg.contains("status: 5") => Some(TransientError::ServerError),
            _ => None,
        }
    }

    fn timed_out() -> Self {
        SourceError::Network("Operation timed out".to_string())
    }
}

/// Turn an HTTP status into the matching error, if it is not a success
pub(crate) fn check_status(source: &str, status: reqwest::StatusCode) -> Result<(), SourceError> {
    if status.is_success() {
        Ok(())
    } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        Err(SourceError::RateLimit)
    } else {
        Err(SourceError::Api(format!("{} returned status: {}", source, status.as_u16())))
    }
}

/// Split a single author string ("A, B", "A; B", "A and B") into names
pub fn split_authors(authors: &str) -> Vec<String> {
    let authors = authors.trim();
    let parts: Vec<&str> = if authors.contains(',') {
        authors.split(',').collect()
    } else if authors.contains(';') {
        authors.split(';').collect()
    } else if authors.to_lowercase().contains(" and ") {
        return authors
            .replace(" and ", ",")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    } else {
        vec![authors]
    };

    parts
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
