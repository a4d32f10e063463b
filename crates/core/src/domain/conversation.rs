use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::profile::{Intent, ProspectProfile};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    /// Builds the identifier for the `index`-th conversation of a batch started at
    /// `started_at`. The zero-padded index keeps lexical order equal to batch order.
    pub fn for_batch(started_at: DateTime<Utc>, index: u32) -> Self {
        Self(format!("conv_{}_{index:04}", started_at.format("%Y%m%d_%H%M%S")))
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationRole {
    Sales,
    Prospect,
}

impl ConversationRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::Prospect => "prospect",
        }
    }

    pub fn counterpart(&self) -> Self {
        match self {
            Self::Sales => Self::Prospect,
            Self::Prospect => Self::Sales,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: ConversationRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub tokens_used: u32,
}

impl ConversationMessage {
    pub fn new(role: ConversationRole, content: impl Into<String>, tokens_used: u32) -> Self {
        Self { role, content: content.into(), timestamp: Utc::now(), tokens_used }
    }
}

/// The sales agent's structured read of the prospect, recovered at conversation close.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntentDetection {
    pub detected_intent: Intent,
    pub confidence_level: f64,
    pub reasoning: String,
    pub best_time_to_visit: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversationOutcome {
    #[serde(rename = "agreed_to_free_class")]
    AgreedFreeClass,
    #[serde(rename = "not_interested")]
    NotInterested,
    #[serde(rename = "reached_message_limit")]
    ReachedMessageLimit,
}

impl ConversationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AgreedFreeClass => "agreed_to_free_class",
            Self::NotInterested => "not_interested",
            Self::ReachedMessageLimit => "reached_message_limit",
        }
    }

    pub fn is_qualified_lead(&self) -> bool {
        matches!(self, Self::AgreedFreeClass)
    }
}

impl fmt::Display for ConversationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal record of one simulated conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationLog {
    pub conversation_id: ConversationId,
    pub prospect_profile: ProspectProfile,
    pub messages: Vec<ConversationMessage>,
    pub intent_detection: Option<IntentDetection>,
    pub outcome: ConversationOutcome,
    pub total_tokens_used: u64,
    /// Number of sales turns, i.e. completed exchanges.
    pub conversation_length: u32,
    pub intent_match: bool,
    pub timestamp: DateTime<Utc>,
}

impl ConversationLog {
    /// Closes a conversation into its log record.
    ///
    /// Fails when the transcript breaks the turn-taking invariant: it must be non-empty,
    /// start with a sales turn and strictly alternate roles.
    pub fn close(
        conversation_id: ConversationId,
        prospect_profile: ProspectProfile,
        messages: Vec<ConversationMessage>,
        intent_detection: Option<IntentDetection>,
        outcome: ConversationOutcome,
        total_tokens_used: u64,
    ) -> Result<Self, DomainError> {
        verify_turn_order(&messages)?;

        let intent_match = intent_detection
            .as_ref()
            .map(|detection| detection.detected_intent == prospect_profile.true_intent)
            .unwrap_or(false);
        let conversation_length = messages
            .iter()
            .filter(|message| message.role == ConversationRole::Sales)
            .count() as u32;

        Ok(Self {
            conversation_id,
            prospect_profile,
            messages,
            intent_detection,
            outcome,
            total_tokens_used,
            conversation_length,
            intent_match,
            timestamp: Utc::now(),
        })
    }

    /// Projection used by transcript exporters.
    pub fn export(&self) -> TranscriptExport {
        TranscriptExport {
            conversation_id: self.conversation_id.clone(),
            timestamp: self.timestamp,
            messages: self.messages.clone(),
            intent_detection: self.intent_detection.clone(),
            outcome: self.outcome,
            total_tokens_used: self.total_tokens_used,
            conversation_length: self.conversation_length,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TranscriptExport {
    pub conversation_id: ConversationId,
    pub timestamp: DateTime<Utc>,
    pub messages: Vec<ConversationMessage>,
    pub intent_detection: Option<IntentDetection>,
    pub outcome: ConversationOutcome,
    pub total_tokens_used: u64,
    pub conversation_length: u32,
}

pub fn verify_turn_order(messages: &[ConversationMessage]) -> Result<(), DomainError> {
    let Some(first) = messages.first() else {
        return Err(DomainError::InvariantViolation("transcript is empty".to_string()));
    };
    if first.role != ConversationRole::Sales {
        return Err(DomainError::InvariantViolation(
            "transcript must open with a sales turn".to_string(),
        ));
    }

    for (index, pair) in messages.windows(2).enumerate() {
        if pair[1].role != pair[0].role.counterpart() {
            return Err(DomainError::InvariantViolation(format!(
                "turn {} repeats role `{}`",
                index + 1,
                pair[1].role.as_str()
            )));
        }
    }

    Ok(())
}
