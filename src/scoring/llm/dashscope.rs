//! Aliyun DashScope via its OpenAI-compatible endpoint.

use async_trait::async_trait;

use super::judge::{parse_decision, send_chat, ChatRequest, LlmError, RelevanceJudge};
use super::prompt::JudgmentRequest;
use crate::models::RelevanceDecision;
use crate::utils::{with_retry, HttpClient, RetryConfig};

pub const DASHSCOPE_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";
pub const DEFAULT_DASHSCOPE_MODEL: &str = "qwen-plus";

#[derive(Debug, Clone)]
pub struct DashScopeJudge {
    client: HttpClient,
    base_url: String,
    api_key: String,
    model: String,
    retry: RetryConfig,
}

impl DashScopeJudge {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Ok(Self {
            client: HttpClient::new()?,
            base_url: DASHSCOPE_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            retry: RetryConfig::default(),
        })
    }

    /// Point at a different OpenAI-compatible endpoint (for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl RelevanceJudge for DashScopeJudge {
    fn provider(&self) -> &str {
        "dashscope"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn judge(&self, request: &JudgmentRequest) -> Result<RelevanceDecision, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest::for_judgment(Some(self.model.clone()), request);

        let content = with_retry(self.retry, || {
            let builder = self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key));
            send_chat(builder, &body)
        })
        .await?;

        parse_decision(&content)
    }
}
