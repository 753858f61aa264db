//! Scripted judge for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::judge::{LlmError, RelevanceJudge};
use super::prompt::JudgmentRequest;
use crate::models::{Confidence, RelevanceDecision};

/// A judge answering from a script keyed by paper title
#[derive(Debug)]
pub struct MockJudge {
    default: RelevanceDecision,
    scripted: Mutex<HashMap<String, RelevanceDecision>>,
    failing: Mutex<HashMap<String, String>>,
    calls: AtomicUsize,
}

impl MockJudge {
    /// Judge that answers `default` for every unscripted title
    pub fn new(default: RelevanceDecision) -> Self {
        Self {
            default,
            scripted: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Answer `decision` for papers with this title
    pub fn respond(self, title: impl Into<String>, decision: RelevanceDecision) -> Self {
        self.scripted.lock().unwrap().insert(title.into(), decision);
        self
    }

    /// Fail with a parse error for papers with this title
    pub fn fail_on(self, title: impl Into<String>, message: impl Into<String>) -> Self {
        self.failing.lock().unwrap().insert(title.into(), message.into());
        self
    }

    /// Number of judgments requested so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Convenience decision for tests
pub fn decision(relevant: bool, score: u32) -> RelevanceDecision {
    RelevanceDecision {
        relevant,
        confidence: if score >= 75 { Confidence::High } else { Confidence::Medium },
        score,
        reasoning: format!("scored {}", score),
        topics: if relevant { vec!["networks".to_string()] } else { Vec::new() },
    }
}

#[async_trait]
impl RelevanceJudge for MockJudge {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn judge(&self, request: &JudgmentRequest) -> Result<RelevanceDecision, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = self.failing.lock().unwrap().get(&request.title) {
            return Err(LlmError::Parse(message.clone()));
        }

        Ok(self
            .scripted
            .lock()
            .unwrap()
            .get(&request.title)
            .cloned()
            .unwrap_or_else(|| self.default.clone()))
    }
}
