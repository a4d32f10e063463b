use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use ringside_core::config::{AgentRole, RoleModelConfig};
use ringside_core::domain::conversation::ConversationOutcome;

use crate::llm::{ChatMessage, LlmGateway};
use crate::prompts::{assessment_prompt, ASSESSOR_SYSTEM};

/// Decision taken after a prospect turn.
#[derive(Clone, Debug, PartialEq)]
pub struct Assessment {
    pub should_end: bool,
    /// `None` means "continue".
    pub outcome: Option<ConversationOutcome>,
    pub reasoning: Option<String>,
    pub tokens_used: u32,
}

impl Assessment {
    pub fn carry_on(tokens_used: u32) -> Self {
        Self { should_end: false, outcome: None, reasoning: None, tokens_used }
    }

    pub fn terminal_outcome(&self) -> Option<ConversationOutcome> {
        if self.should_end {
            self.outcome
        } else {
            None
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AssessmentParseError {
    #[error("assessment is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("assessment outcome `{0}` is not recognized")]
    UnknownOutcome(String),
}

#[derive(Debug, Deserialize)]
struct RawAssessment {
    #[serde(default)]
    should_end: Option<bool>,
    #[serde(default)]
    outcome: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Removes a surrounding markdown code fence, preferring a `json`-tagged one.
pub fn strip_code_fences(raw: &str) -> &str {
    if let Some(start) = raw.find("```json") {
        let body = &raw[start + "```json".len()..];
        let end = body.find("```").unwrap_or(body.len());
        return body[..end].trim();
    }

    if let Some(start) = raw.find("```") {
        let body = &raw[start + 3..];
        let end = body.find("```").unwrap_or(body.len());
        return body[..end].trim();
    }

    raw.trim()
}

/// Parses the assessor's reply.
///
/// The outcome category is authoritative: a terminal outcome always ends the conversation
/// and "continue" never does, whatever the `should_end` flag says. A missing outcome reads
/// as "continue".
pub fn parse_assessment(raw: &str) -> Result<Assessment, AssessmentParseError> {
    let payload: RawAssessment = serde_json::from_str(strip_code_fences(raw))
        .map_err(|error| AssessmentParseError::InvalidJson(error.to_string()))?;

    let outcome_tag = payload.outcome.unwrap_or_else(|| "continue".to_string());
    let outcome = match outcome_tag.trim().to_ascii_lowercase().as_str() {
        "continue" => None,
        "agreed_to_free_class" => Some(ConversationOutcome::AgreedFreeClass),
        "not_interested" => Some(ConversationOutcome::NotInterested),
        _ => return Err(AssessmentParseError::UnknownOutcome(outcome_tag)),
    };

    let flagged = payload.should_end.unwrap_or(false);
    let should_end = outcome.is_some();
    if flagged != should_end {
        warn!(
            event_name = "assessment.flag_disagreement",
            should_end = flagged,
            outcome = outcome.map(|value| value.as_str()).unwrap_or("continue"),
            "assessor flag disagrees with outcome; outcome wins"
        );
    }

    Ok(Assessment { should_end, outcome, reasoning: payload.reasoning, tokens_used: 0 })
}

pub struct TerminationAssessor {
    gateway: Arc<dyn LlmGateway>,
}

impl TerminationAssessor {
    pub fn new(gateway: Arc<dyn LlmGateway>) -> Self {
        Self { gateway }
    }

    /// Classifies the latest prospect reply. Never fails: call and parse errors both read
    /// as "continue".
    pub async fn assess(
        &self,
        history: &[ChatMessage],
        latest_prospect_text: &str,
        model: &RoleModelConfig,
    ) -> Assessment {
        let messages = [
            ChatMessage::system(ASSESSOR_SYSTEM),
            ChatMessage::user(assessment_prompt(history, latest_prospect_text)),
        ];

        let completion = match self.gateway.invoke(AgentRole::Assessor, &messages, model).await {
            Ok(completion) => completion,
            Err(error) => {
                warn!(
                    event_name = "assessment.call_failed",
                    error = %error,
                    "assessor call failed; continuing conversation"
                );
                return Assessment::carry_on(0);
            }
        };

        match parse_assessment(&completion.text) {
            Ok(assessment) => Assessment { tokens_used: completion.total_tokens, ..assessment },
            Err(error) => {
                warn!(
                    event_name = "assessment.parse_failed",
                    error = %error,
                    "assessor reply could not be parsed; continuing conversation"
                );
                Assessment::carry_on(completion.total_tokens)
            }
        }
    }
}
