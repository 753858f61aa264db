//! Core data models for research papers and relevance judgments.

mod judgment;
mod paper;

pub use judgment::{Confidence, RelevanceDecision, MAX_JUDGMENT_SCORE};
pub use paper::{LlmMetadata, Paper, PaperBuilder, UNKNOWN_AUTHOR};
