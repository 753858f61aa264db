//! CrossRef research source for journals without a usable feed.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{Paper, PaperBuilder};
use crate::sources::{check_status, FetchWindow, Source, SourceError};
use crate::utils::{strip_tags, with_retry, HttpClient, RetryConfig};

const CROSSREF_API_BASE: &str = "https://api.crossref.org";

/// Rows requested per journal
const CROSSREF_ROWS: usize = 100;

/// A journal looked up by ISSN
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssnJournal {
    /// Journal name, used as the paper source label
    pub name: String,
    /// Print or electronic ISSN
    pub issn: String,
}

/// CrossRef research source
///
/// Uses the CrossRef REST API to list recent works of each configured journal.
#[derive(Debug, Clone)]
pub struct CrossRefSource {
    client: Arc<HttpClient>,
    base_url: String,
    journals: BTreeMap<String, IssnJournal>,
    delay: Duration,
    retry: RetryConfig,
}

impl CrossRefSource {
    pub fn new(journals: BTreeMap<String, IssnJournal>) -> Result<Self, SourceError> {
        let user_agent = format!(
            "{}/{} (mailto:research@example.com)",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        );
        Ok(Self {
            client: Arc::new(HttpClient::with_user_agent(&user_agent)?),
            base_url: CROSSREF_API_BASE.to_string(),
            journals,
            delay: Duration::from_millis(500),
            retry: RetryConfig::default(),
        })
    }

    /// Point at a different API endpoint (for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
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

    async fn fetch_by_issn(
        &self,
        journal: &IssnJournal,
        from_date: &str,
    ) -> Result<Vec<Paper>, SourceError> {
        if journal.issn.trim().is_empty() {
            return Err(SourceError::InvalidRequest(format!(
                "No ISSN configured for {}",
                journal.name
            )));
        }

        let url = format!(
            "{}/works?filter={}&rows={}&sort=published&order=desc",
            self.base_url,
            urlencoding::encode(&format!("issn:{},from-pub-date:{}", journal.issn, from_date)),
            CROSSREF_ROWS
        );

        // Clone values for retry closure
        let client = Arc::clone(&self.client);
        let url_for_retry = url.clone();

        let data: CRResponse = with_retry(self.retry, || {
            let client = Arc::clone(&client);
            let url = url_for_retry.clone();
            async move {
                let response = client.get(&url).send().await.map_err(|e| {
                    SourceError::Network(format!("Failed to query CrossRef: {}", e))
                })?;

                check_status("CrossRef API", response.status())?;

                response
                    .json::<CRResponse>()
                    .await
                    .map_err(|e| SourceError::Parse(format!("Failed to parse JSON: {}", e)))
            }
        })
        .await?;

        Ok(data
            .message
            .items
            .into_iter()
            .filter_map(|item| item.into_paper(&journal.name))
            .collect())
    }
}

#[async_trait]
impl Source for CrossRefSource {
    fn id(&self) -> &str {
        "crossref"
    }

    fn name(&self) -> &str {
        "CrossRef"
    }

    async fn fetch(&self, window: &FetchWindow) -> Result<Vec<Paper>, SourceError> {
        let journals: Vec<&IssnJournal> = match &window.journal {
            Some(code) => match self.journals.get(code) {
                Some(journal) => vec![journal],
                None => {
                    tracing::warn!("Journal '{}' not found in CrossRef configuration", code);
                    return Ok(Vec::new());
                }
            },
            None => self.journals.values().collect(),
        };

        let from_date = window.cutoff.format("%Y-%m-%d").to_string();
        let mut papers = Vec::new();

        for (i, journal) in journals.into_iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            tracing::info!("Fetching from {} via CrossRef", journal.name);
            match self.fetch_by_issn(journal, &from_date).await {
                Ok(found) => {
                    tracing::info!("Found {} recent papers in {}", found.len(), journal.name);
                    papers.extend(found);
                }
                Err(e) => tracing::warn!("Error fetching from {}: {}", journal.name, e),
            }
        }

        tracing::info!("Total papers fetched from CrossRef: {}", papers.len());
        Ok(papers)
    }
}

// ===== CrossRef API Types =====

#[derive(Debug, Deserialize)]
struct CRResponse {
    message: CRMessage,
}

#[derive(Debug, Deserialize)]
struct CRMessage {
    #[serde(default)]
    items: Vec<CRItem>,
}

#[derive(Debug, Deserialize)]
struct CRAuthor {
    given: Option<String>,
    family: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CRItem {
    #[serde(default)]
    title: Vec<String>,
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(rename = "URL")]
    url: Option<String>,
    #[serde(default)]
    author: Vec<CRAuthor>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(rename = "published-print")]
    published_print: Option<CRDate>,
    #[serde(rename = "published-online")]
    published_online: Option<CRDate>,
    published: Option<CRDate>,
    created: Option<CRDate>,
}

#[derive(Debug, Deserialize)]
struct CRDate {
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<Option<i32>>>,
}

impl CRDate {
    fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let parts = self.date_parts.first()?;
        let year = (*parts.first()?)?;
        let month = parts.get(1).copied().flatten().unwrap_or(1);
        let day = parts.get(2).copied().flatten().unwrap_or(1);

        let date = NaiveDate::from_ymd_opt(year, u32::try_from(month).ok()?, u32::try_from(day).ok()?)?;
        Some(date.and_hms_opt(0, 0, 0)?.and_utc())
    }
}

impl CRItem {
    fn into_paper(self, journal_name: &str) -> Option<Paper> {
        let title = self.title.first().map(|t| t.trim().to_string()).filter(|t| !t.is_empty())?;

        let authors: Vec<String> = self
            .author
            .iter()
            .filter_map(|a| match (a.given.as_deref(), a.family.as_deref()) {
                (Some(given), Some(family)) if !given.is_empty() && !family.is_empty() => {
                    Some(format!("{} {}", given, family))
                }
                (_, Some(family)) if !family.is_empty() => Some(family.to_string()),
                _ => None,
            })
            .collect();

        let published = [
            &self.published_print,
            &self.published_online,
            &self.published,
            &self.created,
        ]
        .into_iter()
        .flatten()
        .find_map(CRDate::to_datetime)
        .unwrap_or_else(Utc::now);

        let doi = self.doi.filter(|d| !d.is_empty());
        let url = match &doi {
            Some(doi) => format!("https://doi.org/{}", doi),
            None => self.url.unwrap_or_default(),
        };

        let mut builder = PaperBuilder::new(title, url, journal_name, published)
            .authors(authors)
            .abstract_text(self.abstract_text.as_deref().map(strip_tags).unwrap_or_default());
        if let Some(doi) = doi {
            builder = builder.doi(doi);
        }

        Some(builder.build())
    }
}
