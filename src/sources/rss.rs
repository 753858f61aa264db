//! RSS/Atom journal feeds (SAGE, Nature, and other publishers).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feed_rs::model::Entry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{Paper, PaperBuilder};
use crate::sources::{check_status, split_authors, FetchWindow, Source, SourceError};
use crate::utils::{strip_tags, with_retry, HttpClient, RetryConfig};

/// A journal reachable through a feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalFeed {
    /// Journal name, used as the paper source label
    pub name: String,
    /// Feed URL
    pub rss: String,
}

/// A group of journal feeds fetched as one source
#[derive(Debug, Clone)]
pub struct RssSource {
    client: Arc<HttpClient>,
    group_id: String,
    group_name: String,
    journals: BTreeMap<String, JournalFeed>,
    delay: Duration,
    retry: RetryConfig,
}

impl RssSource {
    /// Create a feed group, e.g. `RssSource::new("sage", "SAGE", journals)`
    pub fn new(
        group_id: impl Into<String>,
        group_name: impl Into<String>,
        journals: BTreeMap<String, JournalFeed>,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            client: Arc::new(HttpClient::new()?),
            group_id: group_id.into(),
            group_name: group_name.into(),
            journals,
            delay: Duration::from_secs(2),
            retry: RetryConfig::default(),
        })
    }

    /// Pause between journal requests
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Retry policy for each request
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        let client = Arc::clone(&self.client);
        let source = self.group_name.clone();

        with_retry(self.retry, || {
            let client = Arc::clone(&client);
            let source = source.clone();
            async move {
                let response = client.get(url).send().await?;
                check_status(&source, response.status())?;
                Ok(response.bytes().await?.to_vec())
            }
        })
        .await
    }
}

/// Parse a feed document into papers published after `cutoff`.
///
/// Entries without a title are skipped; entries without any date are kept and
/// stamped with the current time.
pub fn parse_feed(
    bytes: &[u8],
    journal_name: &str,
    cutoff: DateTime<Utc>,
) -> Result<Vec<Paper>, SourceError> {
    let feed = feed_rs::parser::parse(bytes)
        .map_err(|e| SourceError::Parse(format!("Failed to parse feed: {}", e)))?;

    let papers = feed
        .entries
        .iter()
        .filter_map(|entry| {
            let published = match entry.published.or(entry.updated) {
                Some(date) if date < cutoff => return None,
                Some(date) => date,
                None => Utc::now(),
            };
            parse_entry(entry, journal_name, published)
        })
        .collect();

    Ok(papers)
}

fn parse_entry(entry: &Entry, journal_name: &str, published: DateTime<Utc>) -> Option<Paper> {
    let title = entry
        .title
        .as_ref()
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())?;

    let abstract_text = entry
        .summary
        .as_ref()
        .map(|s| s.content.clone())
        .or_else(|| entry.content.as_ref().and_then(|c| c.body.clone()))
        .map(|text| strip_tags(&text))
        .unwrap_or_default();

    let url = entry
        .links
        .first()
        .map(|l| l.href.clone())
        .unwrap_or_else(|| entry.id.clone());

    let mut builder = PaperBuilder::new(title, url, journal_name, published)
        .authors(entry_authors(entry))
        .abstract_text(abstract_text);

    if let Some(doi) = extract_doi(entry) {
        builder = builder.doi(doi);
    }

    Some(builder.build())
}

fn entry_authors(entry: &Entry) -> Vec<String> {
    let names: Vec<&str> = entry
        .authors
        .iter()
        .filter_map(|a| {
            let name = a.name.trim();
            // RSS 2.0 <author> text lands in `email`, with the element name as `name`
            if name.is_empty() || name.eq_ignore_ascii_case("author") {
                a.email.as_deref().map(str::trim)
            } else {
                Some(name)
            }
        })
        .filter(|n| !n.is_empty())
        .collect();

    // Some publishers put every author into one element
    match names.as_slice() {
        [single] => split_authors(single),
        _ => names.into_iter().map(String::from).collect(),
    }
}

fn extract_doi(entry: &Entry) -> Option<String> {
    let id = entry.id.trim();
    if let Some(doi) = id.strip_prefix("doi:") {
        return Some(doi.to_string());
    }
    if let Some((_, doi)) = id.split_once("doi.org/") {
        return Some(doi.to_string());
    }
    if id.starts_with("10.") && id.contains('/') {
        return Some(id.to_string());
    }

    entry
        .links
        .iter()
        .find_map(|l| l.href.split_once("doi.org/").map(|(_, doi)| doi.to_string()))
}

#[async_trait]
impl Source for RssSource {
    fn id(&self) -> &str {
        &self.group_id
    }

    fn name(&self) -> &str {
        &self.group_name
    }

    async fn fetch(&self, window: &FetchWindow) -> Result<Vec<Paper>, SourceError> {
        let journals: Vec<(&String, &JournalFeed)> = match &window.journal {
            Some(code) => match self.journals.get_key_value(code) {
                Some(entry) => vec![entry],
                None => {
                    tracing::warn!("Journal '{}' not found in {} configuration", code, self.group_name);
                    return Ok(Vec::new());
                }
            },
            None => self.journals.iter().collect(),
        };

        let mut papers = Vec::new();
        for (i, (code, journal)) in journals.into_iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            tracing::info!("Fetching from {} ({})", journal.name, code);
            let result = match self.download(&journal.rss).await {
                Ok(bytes) => parse_feed(&bytes, &journal.name, window.cutoff),
                Err(e) => Err(e),
            };

            match result {
                Ok(found) => {
                    tracing::info!("Found {} recent papers in {}", found.len(), journal.name);
                    papers.extend(found);
                }
                Err(e) => tracing::warn!("Error fetching from {}: {}", journal.name, e),
            }
        }

        tracing::info!("Total papers fetched from {}: {}", self.group_name, papers.len());
        Ok(papers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>American Sociological Review</title>
    <link>https://journals.sagepub.com/toc/asra/0/0</link>
    <description>Latest articles</description>
    <item>
      <title>Neighborhood Effects on Mobility</title>
      <link>https://journals.sagepub.com/doi/abs/10.1177/000312242411</link>
      <guid isPermaLink="false">10.1177/000312242411</guid>
      <description>&lt;p&gt;We study &lt;b&gt;mobility&lt;/b&gt;.&lt;/p&gt;</description>
      <author>Ann Lee, Bo Chen</author>
      <pubDate>Wed, 10 Jan 2024 08:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Old Article</title>
      <link>https://journals.sagepub.com/doi/abs/10.1177/old</link>
      <pubDate>Mon, 01 Jan 2018 08:00:00 GMT</pubDate>
    </item>
    <item>
      <title>   </title>
      <link>https://journals.sagepub.com/doi/abs/10.1177/untitled</link>
      <pubDate>Wed, 10 Jan 2024 08:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Undated Article</title>
      <link>https://doi.org/10.1177/undated</link>
    </item>
  </channel>
</rss>"#;

    fn cutoff() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_feed() {
        let papers = parse_feed(RSS.as_bytes(), "American Sociological Review", cutoff()).unwrap();

        assert_eq!(papers.len(), 2);

        let first = &papers[0];
        assert_eq!(first.title, "Neighborhood Effects on Mobility");
        assert_eq!(first.source, "American Sociological Review");
        assert_eq!(first.r#abstract, "We study mobility.");
        assert_eq!(first.authors, vec!["Ann Lee", "Bo Chen"]);
        assert_eq!(first.doi.as_deref(), Some("10.1177/000312242411"));
        assert_eq!(first.url, "https://journals.sagepub.com/doi/abs/10.1177/000312242411");

        let undated = &papers[1];
        assert_eq!(undated.title, "Undated Article");
        assert_eq!(undated.authors, vec!["Unknown"]);
        assert_eq!(undated.doi.as_deref(), Some("10.1177/undated"));
        assert!(undated.published > cutoff());
    }

    #[test]
    fn test_parse_feed_rejects_garbage() {
        let err = parse_feed(b"not a feed", "X", cutoff()).unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }

    #[tokio::test]
    async fn test_unknown_journal_yields_nothing() {
        let mut journals = BTreeMap::new();
        journals.insert(
            "asr".to_string(),
            JournalFeed {
                name: "American Sociological Review".to_string(),
                rss: "http://127.0.0.1:9/unreachable".to_string(),
            },
        );
        let source = RssSource::new("sage", "SAGE", journals).unwrap();

        let window = FetchWindow::last_days(7).journal("nope");
        let papers = source.fetch(&window).await.unwrap();
        assert!(papers.is_empty());
    }

    #[tokio::test]
    async fn test_failing_journal_does_not_stop_others() {
        let mut server = mockito::Server::new_async().await;
        let good_feed = RSS.replace("Wed, 10 Jan 2024", &Utc::now().format("%a, %d %b %Y").to_string());
        let _good = server
            .mock("GET", "/good.rss")
            .with_status(200)
            .with_header("content-type", "application/rss+xml")
            .with_body(good_feed)
            .create_async()
            .await;
        let _bad = server
            .mock("GET", "/bad.rss")
            .with_status(404)
            .create_async()
            .await;

        let mut journals = BTreeMap::new();
        journals.insert(
            "aaa".to_string(),
            JournalFeed {
                name: "Broken Journal".to_string(),
                rss: format!("{}/bad.rss", server.url()),
            },
        );
        journals.insert(
            "bbb".to_string(),
            JournalFeed {
                name: "Working Journal".to_string(),
                rss: format!("{}/good.rss", server.url()),
            },
        );

        let source = RssSource::new("other", "Other", journals)
            .unwrap()
            .with_delay(Duration::ZERO)
            .with_retry_config(RetryConfig::no_retry());

        let papers = source.fetch(&FetchWindow::last_days(7)).await.unwrap();
        assert_eq!(papers.len(), 2);
        assert!(papers.iter().all(|p| p.source == "Working Journal"));
    }
}
