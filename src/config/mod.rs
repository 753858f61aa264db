//! Configuration management.
//!
//! Settings come from three YAML files (see [`file_config`] for their layout), each
//! layered with environment variables prefixed `RESEARCH_DIGEST__` using `__` as the
//! nesting separator, e.g. `RESEARCH_DIGEST__DASHSCOPE__API_KEY`.
//!
//! The keywords file is required; the sources and LLM files fall back to defaults.

mod file_config;

pub use file_config::{
    ArxivConfig, AzureOpenAiConfig, CacheConfig, DashScopeConfig, KeywordLists, KeywordsFile,
    LlmScoringConfig, LlmSettings, SearchConfig, SourcesFile,
};

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

use crate::scoring::llm::ProviderKind;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "RESEARCH_DIGEST";

/// Locations of the configuration files
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub keywords: PathBuf,
    pub sources: PathBuf,
    pub llm: PathBuf,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self {
            keywords: PathBuf::from("config/keywords.yaml"),
            sources: PathBuf::from("config/sources.yaml"),
            llm: PathBuf::from("config/llm.yaml"),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub keywords: KeywordsFile,
    pub sources: SourcesFile,
    pub llm: LlmSettings,
}

impl Settings {
    /// Load all three files plus environment overrides
    pub fn load(paths: &ConfigPaths) -> Result<Self, ConfigError> {
        if !paths.keywords.is_file() {
            return Err(ConfigError::NotFound(paths.keywords.clone()));
        }

        let settings = Self {
            keywords: load_layer(&paths.keywords)?,
            sources: load_layer(&paths.sources)?,
            llm: load_layer(&paths.llm)?,
        };

        tracing::debug!(
            primary = settings.keywords.keywords.primary.len(),
            secondary = settings.keywords.keywords.secondary.len(),
            categories = settings.keywords.arxiv.categories.len(),
            "Loaded configuration"
        );
        Ok(settings)
    }
}

impl LlmSettings {
    /// Load only the LLM file (plus environment), for commands that need no keywords
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        load_layer(path)
    }

    /// The configured provider
    pub fn provider_kind(&self) -> Result<ProviderKind, ConfigError> {
        self.provider
            .parse()
            .map_err(|_| ConfigError::UnknownProvider(self.provider.clone()))
    }

    /// Check that the selected provider has its credentials
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.provider_kind()? {
            ProviderKind::DashScope => {
                if self.dashscope.api_key.trim().is_empty() {
                    return Err(ConfigError::MissingCredentials(
                        "LLM mode requires a DashScope API key (dashscope.api_key)".to_string(),
                    ));
                }
            }
            ProviderKind::Azure => {
                if self.azure_openai.endpoint.trim().is_empty()
                    || self.azure_openai.api_key.trim().is_empty()
                {
                    return Err(ConfigError::MissingCredentials(
                        "LLM mode requires an Azure OpenAI endpoint and API key (azure_openai.endpoint, azure_openai.api_key)"
                            .to_string(),
                    ));
                }
            }
        }

        if self.research_interests.trim().is_empty() {
            tracing::warn!("research_interests is empty; judgments will have little to go on");
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid configuration in {}: {source}", path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: config::ConfigError,
    },

    #[error("{0}")]
    MissingCredentials(String),

    #[error("Unknown LLM provider '{0}'. Use 'dashscope' or 'azure'")]
    UnknownProvider(String),
}

/// One YAML file (optional) layered with the environment
fn load_layer<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    config::Config::builder()
        .add_source(
            config::File::from(path)
                .format(config::FileFormat::Yaml)
                .required(false),
        )
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|source| ConfigError::Invalid {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn paths(dir: &TempDir) -> ConfigPaths {
        ConfigPaths {
            keywords: dir.path().join("keywords.yaml"),
            sources: dir.path().join("sources.yaml"),
            llm: dir.path().join("llm.yaml"),
        }
    }

    #[test]
    fn test_missing_keywords_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = Settings::load(&paths(&dir)).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_all_files() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "keywords.yaml",
            r#"
keywords:
  primary: ["social network", "inequality"]
  secondary: ["survey"]
arxiv:
  categories: ["cs.SI"]
search:
  default_days: 14
"#,
        );
        write(
            &dir,
            "sources.yaml",
            r#"
sage_journals:
  asr:
    name: American Sociological Review
    rss: https://example.org/asr.rss
crossref_journals:
  ajs:
    name: American Journal of Sociology
    issn: "0002-9602"
"#,
        );
        write(
            &dir,
            "llm.yaml",
            r#"
provider: azure
research_interests: Networks
scoring:
  min_score: 60
azure_openai:
  endpoint: https://example.openai.azure.com
  api_key: secret
"#,
        );

        let settings = Settings::load(&paths(&dir)).unwrap();

        assert_eq!(settings.keywords.keywords.primary, vec!["social network", "inequality"]);
        assert_eq!(settings.keywords.arxiv.categories, vec!["cs.SI"]);
        assert_eq!(settings.keywords.search.default_days, 14);
        assert_eq!(settings.keywords.search.max_results, 100);

        assert_eq!(settings.sources.sage_journals["asr"].name, "American Sociological Review");
        assert_eq!(settings.sources.crossref_journals["ajs"].issn, "0002-9602");
        assert!(settings.sources.nature_journals.is_empty());

        assert_eq!(settings.llm.provider_kind().unwrap(), ProviderKind::Azure);
        assert_eq!(settings.llm.scoring.min_score, 60);
        assert_eq!(settings.llm.azure_openai.deployment, "gpt-4o-mini");
        assert_eq!(settings.llm.cache.directory, PathBuf::from(".cache/llm_decisions"));
        assert_eq!(settings.llm.cache.max_age_days, 90);
        assert!(settings.llm.validate().is_ok());
    }

    #[test]
    fn test_optional_files_default() {
        let dir = TempDir::new().unwrap();
        write(&dir, "keywords.yaml", "keywords:\n  primary: [mobility]\n");

        let settings = Settings::load(&paths(&dir)).unwrap();
        assert_eq!(settings.keywords.search.default_days, 7);
        assert!(settings.sources.sage_journals.is_empty());
        assert_eq!(settings.llm.provider, "dashscope");
        assert_eq!(settings.llm.scoring.min_score, 50);
        assert_eq!(settings.llm.dashscope.model, "qwen-plus");
    }

    #[test]
    fn test_validate() {
        let mut llm = LlmSettings::default();
        llm.dashscope.api_key = String::new();
        assert!(matches!(llm.validate(), Err(ConfigError::MissingCredentials(_))));

        llm.dashscope.api_key = "sk-test".to_string();
        assert!(llm.validate().is_ok());

        llm.provider = "azure".to_string();
        llm.azure_openai.api_key = "key".to_string();
        assert!(matches!(llm.validate(), Err(ConfigError::MissingCredentials(_))));

        llm.provider = "openai".to_string();
        assert!(matches!(llm.validate(), Err(ConfigError::UnknownProvider(_))));
    }

    #[test]
    fn test_invalid_yaml_is_reported() {
        let dir = TempDir::new().unwrap();
        write(&dir, "keywords.yaml", "search:\n  default_days: [not, a, number]\n");

        let err = Settings::load(&paths(&dir)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
