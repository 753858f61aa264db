//! Judgment prompt construction.

use crate::models::Paper;

/// System message sent with every judgment request
pub const SYSTEM_PROMPT: &str = "You are an expert research assistant. Respond only with valid JSON.";

/// Stands in for an empty abstract
pub const MISSING_ABSTRACT: &str = "[Not available - please evaluate based on title only]";

/// Everything a provider needs to judge one paper
#[derive(Debug, Clone, PartialEq)]
pub struct JudgmentRequest {
    pub research_interests: String,
    pub source: String,
    pub title: String,
    pub abstract_text: String,
}

impl JudgmentRequest {
    pub fn for_paper(paper: &Paper, research_interests: &str) -> Self {
        Self {
            research_interests: research_interests.to_string(),
            source: paper.source.clone(),
            title: paper.title.clone(),
            abstract_text: paper.r#abstract.clone(),
        }
    }

    /// User message asking for a JSON relevance decision
    pub fn prompt(&self) -> String {
        let abstract_text = if self.abstract_text.trim().is_empty() {
            MISSING_ABSTRACT
        } else {
            self.abstract_text.as_str()
        };

        format!(
            r#"You are an expert research assistant helping to filter academic papers.

Research Interests:
{interests}

Paper to Evaluate:
Source: {source}
Title: {title}
Abstract: {abstract_text}

Task: Determine if this paper is relevant to the research interests above.

Respond with a JSON object with the following fields:
- "relevant": boolean (true if relevant, false if not)
- "confidence": string ("high", "medium", "low")
- "score": integer (0-100, where 100 is highly relevant)
- "reasoning": string (brief explanation of why this paper is or isn't relevant)
- "topics": list of strings (key topics from the paper that relate to research interests)

Only respond with the JSON object, no additional text."#,
            interests = self.research_interests,
            source = self.source,
            title = self.title,
            abstract_text = abstract_text,
        )
    }
}
