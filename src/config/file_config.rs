//! Shapes of the three YAML configuration files.
//!
//! # keywords.yaml (required)
//!
//! ```yaml
//! keywords:
//!   primary: ["social network", "inequality"]
//!   secondary: ["survey data"]
//! arxiv:
//!   categories: ["cs.SI", "physics.soc-ph"]
//! search:
//!   default_days: 7
//!   max_results: 100
//! ```
//!
//! # sources.yaml (optional)
//!
//! ```yaml
//! sage_journals:
//!   asr: { name: "American Sociological Review", rss: "https://journals.sagepub.com/action/showFeed?jc=asra&type=etoc&feed=rss" }
//! nature_journals:
//!   nathumbehav: { name: "Nature Human Behaviour", rss: "https://www.nature.com/nathumbehav.rss" }
//! other_journals:
//!   pnas: { name: "PNAS", rss: "https://www.pnas.org/action/showFeed?type=etoc&feed=rss&jc=pnas" }
//! crossref_journals:
//!   ajs: { name: "American Journal of Sociology", issn: "0002-9602" }
//! ```
//!
//! # llm.yaml (optional, needed for `--use-llm`)
//!
//! ```yaml
//! provider: dashscope            # or azure
//! research_interests: |
//!   Social networks, stratification and inequality.
//! scoring:
//!   min_score: 50
//! dashscope:
//!   api_key: "sk-..."
//!   model: qwen-plus
//! azure_openai:
//!   endpoint: "https://my-resource.openai.azure.com"
//!   api_key: "..."
//!   deployment: gpt-4o-mini
//! cache:
//!   directory: .cache/llm_decisions
//!   max_age_days: 90
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::scoring::llm::{DEFAULT_AZURE_DEPLOYMENT, DEFAULT_DASHSCOPE_MODEL};
use crate::sources::{IssnJournal, JournalFeed};

/// keywords.yaml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeywordsFile {
    #[serde(default)]
    pub keywords: KeywordLists,

    #[serde(default)]
    pub arxiv: ArxivConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

/// Keyword lists for keyword scoring
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeywordLists {
    #[serde(default)]
    pub primary: Vec<String>,

    #[serde(default)]
    pub secondary: Vec<String>,
}

/// arXiv query settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArxivConfig {
    /// Categories to query, e.g. "cs.SI"
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Fetch window defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Days to look back when `--days` is not given
    #[serde(default = "default_days")]
    pub default_days: u32,

    /// arXiv results per category
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_days: default_days(),
            max_results: default_max_results(),
        }
    }
}

fn default_days() -> u32 {
    7
}

fn default_max_results() -> usize {
    100
}

/// sources.yaml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesFile {
    #[serde(default)]
    pub sage_journals: BTreeMap<String, JournalFeed>,

    #[serde(default)]
    pub nature_journals: BTreeMap<String, JournalFeed>,

    /// PNAS, Science and other feed-publishing journals
    #[serde(default)]
    pub other_journals: BTreeMap<String, JournalFeed>,

    /// Journals without a usable feed, queried through CrossRef
    #[serde(default)]
    pub crossref_journals: BTreeMap<String, IssnJournal>,
}

/// llm.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// "dashscope" or "azure"; checked only when LLM scoring is requested
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Free text describing what counts as relevant
    #[serde(default)]
    pub research_interests: String,

    #[serde(default)]
    pub scoring: LlmScoringConfig,

    #[serde(default)]
    pub dashscope: DashScopeConfig,

    #[serde(default)]
    pub azure_openai: AzureOpenAiConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            research_interests: String::new(),
            scoring: LlmScoringConfig::default(),
            dashscope: DashScopeConfig::default(),
            azure_openai: AzureOpenAiConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

fn default_provider() -> String {
    "dashscope".to_string()
}

/// LLM scoring thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmScoringConfig {
    /// Minimum 0-100 score for a paper to be kept
    #[serde(default = "default_llm_min_score")]
    pub min_score: u32,
}

impl Default for LlmScoringConfig {
    fn default() -> Self {
        Self {
            min_score: default_llm_min_score(),
        }
    }
}

fn default_llm_min_score() -> u32 {
    50
}

/// DashScope credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashScopeConfig {
    #[serde(default = "default_dashscope_key")]
    pub api_key: String,

    #[serde(default = "default_dashscope_model")]
    pub model: String,
}

impl Default for DashScopeConfig {
    fn default() -> Self {
        Self {
            api_key: default_dashscope_key(),
            model: default_dashscope_model(),
        }
    }
}

fn default_dashscope_key() -> String {
    std::env::var("DASHSCOPE_API_KEY").unwrap_or_default()
}

fn default_dashscope_model() -> String {
    DEFAULT_DASHSCOPE_MODEL.to_string()
}

/// Azure OpenAI credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureOpenAiConfig {
    #[serde(default)]
    pub endpoint: String,

    #[serde(default = "default_azure_key")]
    pub api_key: String,

    #[serde(default = "default_azure_deployment")]
    pub deployment: String,
}

impl Default for AzureOpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: default_azure_key(),
            deployment: default_azure_deployment(),
        }
    }
}

fn default_azure_key() -> String {
    std::env::var("AZURE_OPENAI_API_KEY").unwrap_or_default()
}

fn default_azure_deployment() -> String {
    DEFAULT_AZURE_DEPLOYMENT.to_string()
}

/// Decision cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_dir")]
    pub directory: PathBuf,

    /// Age after which `cache clean` removes a decision
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: default_cache_dir(),
            max_age_days: default_max_age_days(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".cache/llm_decisions")
}

fn default_max_age_days() -> u32 {
    90
}
