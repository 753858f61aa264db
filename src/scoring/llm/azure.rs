//! Azure OpenAI deployments.

use async_trait::async_trait;

use super::judge::{parse_decision, send_chat, ChatRequest, LlmError, RelevanceJudge};
use super::prompt::JudgmentRequest;
use crate::models::RelevanceDecision;
use crate::utils::{with_retry, HttpClient, RetryConfig};

pub const AZURE_API_VERSION: &str = "2024-08-01-preview";
pub const DEFAULT_AZURE_DEPLOYMENT: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct AzureOpenAiJudge {
    client: HttpClient,
    endpoint: String,
    api_key: String,
    deployment: String,
    retry: RetryConfig,
}

impl AzureOpenAiJudge {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        deployment: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(LlmError::Config("Azure OpenAI endpoint is empty".to_string()));
        }

        Ok(Self {
            client: HttpClient::new()?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            deployment: deployment.into(),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint,
            urlencoding::encode(&self.deployment),
            AZURE_API_VERSION
        )
    }
}

#[async_trait]
impl RelevanceJudge for AzureOpenAiJudge {
    fn provider(&self) -> &str {
        "azure"
    }

    fn model(&self) -> &str {
        &self.deployment
    }

    async fn judge(&self, request: &JudgmentRequest) -> Result<RelevanceDecision, LlmError> {
        let url = self.completions_url();
        // The deployment in the URL selects the model
        let body = ChatRequest::for_judgment(None, request).json_mode();

        let content = with_retry(self.retry, || {
            let builder = self.client.post(&url).header("api-key", &self.api_key);
            send_chat(builder, &body)
        })
        .await?;

        parse_decision(&content)
    }
}
