use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ringside_core::config::{AgentRole, RoleModelConfig};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    System,
    User,
    Assistant,
}

/// One entry of an agent-side chat history, in the wire shape chat-completion APIs accept.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "role")]
    pub speaker: Speaker,
    #[serde(rename = "content")]
    pub text: String,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self { speaker: Speaker::System, text: text.into() }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self { speaker: Speaker::User, text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { speaker: Speaker::Assistant, text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub total_tokens: u32,
}

impl Completion {
    pub fn new(text: impl Into<String>, total_tokens: u32) -> Self {
        Self { text: text.into(), total_tokens }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("gateway is misconfigured: {0}")]
    Configuration(String),
    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
    #[error("network error: {0}")]
    Network(String),
    #[error("authentication rejected by provider")]
    AuthenticationFailed,
    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode provider response: {0}")]
    Decode(String),
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// Language-model boundary used by every agent role.
///
/// Implementations must be shareable across concurrently running conversations.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    async fn invoke(
        &self,
        role: AgentRole,
        messages: &[ChatMessage],
        model: &RoleModelConfig,
    ) -> Result<Completion, GatewayError>;
}
