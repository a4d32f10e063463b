//! In-memory gateway that replays scripted replies per role.
//!
//! Used by tests and offline dry runs. Each role owns a queue of replies consumed in order;
//! once a queue is empty the role's fallback reply (if any) is returned on every call.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use ringside_core::config::{AgentRole, RoleModelConfig};

use crate::llm::{ChatMessage, Completion, GatewayError, LlmGateway};

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedCall {
    pub role: AgentRole,
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Default)]
struct Script {
    queued: HashMap<AgentRole, VecDeque<Result<Completion, GatewayError>>>,
    fallback: HashMap<AgentRole, Completion>,
    calls: Vec<RecordedCall>,
}

#[derive(Debug, Default)]
pub struct ScriptedGateway {
    script: Mutex<Script>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, role: AgentRole, text: impl Into<String>, tokens: u32) -> Self {
        self.push(role, Ok(Completion::new(text, tokens)))
    }

    pub fn fail(self, role: AgentRole, message: impl Into<String>) -> Self {
        self.push(role, Err(GatewayError::Unavailable(message.into())))
    }

    pub fn fallback(self, role: AgentRole, text: impl Into<String>, tokens: u32) -> Self {
        self.lock().fallback.insert(role, Completion::new(text, tokens));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn calls_for(&self, role: AgentRole) -> usize {
        self.lock().calls.iter().filter(|call| call.role == role).count()
    }

    fn push(self, role: AgentRole, reply: Result<Completion, GatewayError>) -> Self {
        self.lock().queued.entry(role).or_default().push_back(reply);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LlmGateway for ScriptedGateway {
    async fn invoke(
        &self,
        role: AgentRole,
        messages: &[ChatMessage],
        model: &RoleModelConfig,
    ) -> Result<Completion, GatewayError> {
        let mut script = self.lock();
        script.calls.push(RecordedCall {
            role,
            model: model.model.clone(),
            messages: messages.to_vec(),
        });

        if let Some(reply) = script.queued.get_mut(&role).and_then(VecDeque::pop_front) {
            return reply;
        }

        script.fallback.get(&role).cloned().ok_or_else(|| {
            GatewayError::Unavailable(format!("no scripted reply left for role `{}`", role.as_str()))
        })
    }
}
