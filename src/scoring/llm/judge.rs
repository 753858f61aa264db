//! Provider abstraction and the chat-completion plumbing shared by providers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::prompt::{JudgmentRequest, SYSTEM_PROMPT};
use crate::models::RelevanceDecision;
use crate::utils::{Retryable, TransientError};

/// Sampling temperature for judgments
pub const TEMPERATURE: f32 = 0.1;
/// Upper bound on the completion length
pub const MAX_TOKENS: u32 = 300;

/// An external service that judges paper relevance
#[async_trait]
pub trait RelevanceJudge: Send + Sync + fmt::Debug {
    /// Provider name for logs ("dashscope", "azure", ...)
    fn provider(&self) -> &str;

    /// Model or deployment being called
    fn model(&self) -> &str;

    async fn judge(&self, request: &JudgmentRequest) -> Result<RelevanceDecision, LlmError>;
}

/// Supported judgment providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    DashScope,
    Azure,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::DashScope => f.write_str("dashscope"),
            ProviderKind::Azure => f.write_str("azure"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dashscope" => Ok(ProviderKind::DashScope),
            "azure" => Ok(ProviderKind::Azure),
            other => Err(LlmError::Config(format!("Unknown provider: {}", other))),
        }
    }
}

/// Errors from a judgment call
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Could not parse decision: {0}")]
    Parse(String),

    #[error("Response contained no message content")]
    EmptyResponse,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Network(err.to_string())
    }
}

impl Retryable for LlmError {
    fn transient(&self) -> Option<TransientError> {
        match self {
            LlmError::Network(_) => Some(TransientError::Network),
            LlmError::Status { status, .. } => reqwest::StatusCode::from_u16(*status)
                .ok()
                .and_then(TransientError::from_status),
            _ => None,
        }
    }

    fn timed_out() -> Self {
        LlmError::Network("Request timed out".to_string())
    }
}

/// Parse a decision from model output.
///
/// Models sometimes wrap the JSON in prose or markdown fences, so when the content is
/// not valid JSON on its own the outermost `{ ... }` block is tried before giving up.
pub fn parse_decision(content: &str) -> Result<RelevanceDecision, LlmError> {
    let direct = match serde_json::from_str::<RelevanceDecision>(content.trim()) {
        Ok(decision) => return Ok(decision),
        Err(e) => e,
    };

    // `{` and `}` are ASCII, so these byte offsets are char boundaries
    let block = match (content.find('{'), content.rfind('}')) {
        (Some(start), Some(end)) if start < end => &content[start..=end],
        _ => {
            return Err(LlmError::Parse(format!(
                "{} in response: {}",
                direct,
                truncate(content, 200)
            )))
        }
    };

    serde_json::from_str(block)
        .map_err(|e| LlmError::Parse(format!("{} in response: {}", e, truncate(content, 200))))
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

// ===== OpenAI-compatible chat completion types =====

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

impl ChatRequest {
    /// System + user message pair for one judgment
    pub fn for_judgment(model: Option<String>, request: &JudgmentRequest) -> Self {
        Self {
            model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.prompt(),
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            response_format: None,
        }
    }

    /// Ask the service to constrain output to a JSON object
    pub fn json_mode(mut self) -> Self {
        self.response_format = Some(ResponseFormat {
            kind: "json_object".to_string(),
        });
        self
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl ChatResponse {
    /// Content of the first choice
    pub fn into_content(self) -> Result<String, LlmError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)
    }
}

/// Send a prepared chat request and return the first choice's content
pub(crate) async fn send_chat(
    request: reqwest::RequestBuilder,
    body: &ChatRequest,
) -> Result<String, LlmError> {
    let response = request
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| LlmError::Network(format!("Request failed: {}", e)))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| LlmError::Network(format!("Failed to read response body: {}", e)))?;

    if !status.is_success() {
        return Err(LlmError::Status {
            status: status.as_u16(),
            body: truncate(&text, 500),
        });
    }

    let parsed: ChatResponse = serde_json::from_str(&text)
        .map_err(|e| LlmError::Parse(format!("Invalid completion JSON: {}", e)))?;
    parsed.into_content()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Confidence;

    #[test]
    fn test_parse_plain_json() {
        let decision = parse_decision(
            r#"{"relevant": true, "confidence": "high", "score": 88, "reasoning": "r", "topics": ["a"]}"#,
        )
        .unwrap();
        assert!(decision.relevant);
        assert_eq!(decision.score, 88);
        assert_eq!(decision.confidence, Confidence::High);
    }

    #[test]
    fn test_parse_embedded_json() {
        let content = "Sure! Here is my assessment:\n```json\n{\"relevant\": false, \"confidence\": \"low\", \"score\": 12, \"reasoning\": \"Off topic\", \"topics\": []}\n```\nHope this helps.";
        let decision = parse_decision(content).unwrap();

        assert!(!decision.relevant);
        assert_eq!(decision.score, 12);
        assert_eq!(decision.reasoning, "Off topic");
    }

    #[test]
    fn test_parse_failure() {
        assert!(matches!(parse_decision("I cannot help with that."), Err(LlmError::Parse(_))));
        assert!(matches!(parse_decision("} backwards {"), Err(LlmError::Parse(_))));
        assert!(matches!(parse_decision("{\"relevant\": true}"), Err(LlmError::Parse(_))));
    }

    #[test]
    fn test_chat_request_shape() {
        let request = JudgmentRequest {
            research_interests: "networks".to_string(),
            source: "ArXiv".to_string(),
            title: "T".to_string(),
            abstract_text: String::new(),
        };

        let body = serde_json::to_value(ChatRequest::for_judgment(Some("qwen-plus".into()), &request)).unwrap();
        assert_eq!(body["model"], "qwen-plus");
        assert_eq!(body["max_tokens"], 300);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], SYSTEM_PROMPT);
        assert_eq!(body["messages"][1]["role"], "user");
        assert!(body.get("response_format").is_none());

        let body = serde_json::to_value(ChatRequest::for_judgment(None, &request).json_mode()).unwrap();
        assert!(body.get("model").is_none());
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_empty_choices() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(response.into_content(), Err(LlmError::EmptyResponse)));
    }

    #[test]
    fn test_transient_classification() {
        assert!(LlmError::Status { status: 503, body: String::new() }.transient().is_some());
        assert!(LlmError::Status { status: 429, body: String::new() }.transient().is_some());
        assert!(LlmError::Status { status: 401, body: String::new() }.transient().is_none());
        assert!(LlmError::Parse("x".into()).transient().is_none());
    }

    #[test]
    fn test_provider_kind() {
        assert_eq!("DashScope".parse::<ProviderKind>().unwrap(), ProviderKind::DashScope);
        assert_eq!("azure".parse::<ProviderKind>().unwrap(), ProviderKind::Azure);
        assert!("openai".parse::<ProviderKind>().is_err());
    }
}
