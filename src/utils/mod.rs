//! Utility modules supporting fetching and scoring.
//!
//! - [`DecisionCache`]: content-addressed on-disk store of LLM relevance decisions
//! - [`deduplicate_papers`]: remove cross-source duplicates by DOI and title similarity
//! - [`HttpClient`]: shared HTTP client with sensible timeouts
//! - [`with_retry`]: execute an operation with automatic retry on transient errors
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use research_digest::sources::SourceError;
//! use research_digest::utils::{with_retry, RetryConfig};
//!
//! # async fn fetch_data() -> Result<String, SourceError> { Ok("data".to_string()) }
//! # #[tokio::main]
//! # async fn main() -> Result<(), SourceError> {
//! let config = RetryConfig::default().max_attempts(3);
//! let result = with_retry(config, || fetch_data()).await?;
//! # Ok(())
//! # }
//! ```

mod cache;
mod dedup;
mod http;
mod retry;

pub use cache::{CacheStats, DecisionCache};
pub use dedup::{deduplicate_papers, find_duplicates};
pub use http::HttpClient;
pub use retry::{with_retry, RetryConfig, Retryable, TransientError};

/// Remove markup tags (HTML in feed summaries, JATS in CrossRef abstracts)
pub fn strip_tags(text: &str) -> String {
    static TAG_RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    let re = TAG_RE.get_or_init(|| regex::Regex::new(r"<[^>]+>").expect("static regex"));
    re.replace_all(text, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_tags() {
        assert_eq!(
            strip_tags("<jats:p>We study <i>networks</i>.</jats:p>"),
            "We study networks."
        );
        assert_eq!(strip_tags("plain"), "plain");
    }
}
