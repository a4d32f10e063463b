use std::sync::Arc;

use tracing::{debug, info, warn};

use ringside_core::config::{AgentRole, SimulationConfig};
use ringside_core::domain::conversation::{
    ConversationId, ConversationLog, ConversationMessage, ConversationOutcome, ConversationRole,
    IntentDetection,
};
use ringside_core::domain::profile::ProspectProfile;
use ringside_core::errors::DomainError;

use crate::assessor::TerminationAssessor;
use crate::extractor::IntentExtractor;
use crate::llm::{ChatMessage, LlmGateway};
use crate::prompts::{prospect_system_prompt, sales_system_prompt, INTENT_REQUEST, SALES_OPENING};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversationPhase {
    Opening,
    SalesTurn,
    ProspectTurn,
    Assess,
    Closed(ConversationOutcome),
}

/// Transcript plus the two agent-side views of it.
///
/// Every turn lands in all three: the speaker sees its own text as `assistant`, the other
/// agent sees it as `user`.
struct ConversationState {
    transcript: Vec<ConversationMessage>,
    sales_history: Vec<ChatMessage>,
    prospect_history: Vec<ChatMessage>,
    exchanges: u32,
    total_tokens: u64,
}

impl ConversationState {
    fn new(profile: &ProspectProfile) -> Self {
        Self {
            transcript: Vec::new(),
            sales_history: vec![ChatMessage::system(sales_system_prompt())],
            prospect_history: vec![ChatMessage::system(prospect_system_prompt(profile))],
            exchanges: 0,
            total_tokens: 0,
        }
    }

    fn record(&mut self, role: ConversationRole, text: String, tokens: u32) {
        match role {
            ConversationRole::Sales => {
                self.sales_history.push(ChatMessage::assistant(text.clone()));
                self.prospect_history.push(ChatMessage::user(text.clone()));
            }
            ConversationRole::Prospect => {
                self.prospect_history.push(ChatMessage::assistant(text.clone()));
                self.sales_history.push(ChatMessage::user(text.clone()));
            }
        }
        self.total_tokens += u64::from(tokens);
        self.transcript.push(ConversationMessage::new(role, text, tokens));
    }

    fn latest_prospect_text(&self) -> &str {
        self.transcript
            .iter()
            .rev()
            .find(|message| message.role == ConversationRole::Prospect)
            .map(|message| message.content.as_str())
            .unwrap_or_default()
    }
}

/// Drives one bounded dialogue between the sales and prospect agents.
pub struct ConversationEngine {
    gateway: Arc<dyn LlmGateway>,
    config: Arc<SimulationConfig>,
    assessor: TerminationAssessor,
    extractor: IntentExtractor,
}

impl ConversationEngine {
    pub fn new(gateway: Arc<dyn LlmGateway>, config: Arc<SimulationConfig>) -> Self {
        Self {
            assessor: TerminationAssessor::new(gateway.clone()),
            extractor: IntentExtractor::new(),
            gateway,
            config,
        }
    }

    /// Runs the conversation to completion.
    ///
    /// Gateway failures never abort the dialogue; the only error is a transcript that breaks
    /// the turn-taking invariants.
    pub async fn run(
        &self,
        conversation_id: ConversationId,
        profile: ProspectProfile,
    ) -> Result<ConversationLog, DomainError> {
        info!(
            event_name = "conversation.started",
            conversation_id = %conversation_id,
            true_intent = profile.true_intent.as_str(),
            "conversation started"
        );

        let mut state = ConversationState::new(&profile);
        let mut phase = ConversationPhase::Opening;

        let outcome = loop {
            phase = match phase {
                ConversationPhase::Opening => {
                    state.record(ConversationRole::Sales, SALES_OPENING.to_string(), 0);
                    ConversationPhase::ProspectTurn
                }
                ConversationPhase::SalesTurn => {
                    let (text, tokens) =
                        self.turn(&conversation_id, AgentRole::Sales, &state.sales_history).await;
                    state.record(ConversationRole::Sales, text, tokens);
                    ConversationPhase::ProspectTurn
                }
                ConversationPhase::ProspectTurn => {
                    let (text, tokens) = self
                        .turn(&conversation_id, AgentRole::Prospect, &state.prospect_history)
                        .await;
                    state.record(ConversationRole::Prospect, text, tokens);
                    state.exchanges += 1;
                    ConversationPhase::Assess
                }
                ConversationPhase::Assess => {
                    let assessment = self
                        .assessor
                        .assess(
                            &state.sales_history,
                            state.latest_prospect_text(),
                            &self.config.assessor,
                        )
                        .await;
                    state.total_tokens += u64::from(assessment.tokens_used);

                    debug!(
                        event_name = "conversation.assessed",
                        conversation_id = %conversation_id,
                        exchange = state.exchanges,
                        should_end = assessment.should_end,
                        "prospect turn assessed"
                    );

                    match assessment.terminal_outcome() {
                        Some(outcome) => ConversationPhase::Closed(outcome),
                        None if state.exchanges >= self.config.max_message_exchanges => {
                            ConversationPhase::Closed(ConversationOutcome::ReachedMessageLimit)
                        }
                        None => ConversationPhase::SalesTurn,
                    }
                }
                ConversationPhase::Closed(outcome) => break outcome,
            };
        };

        self.close(conversation_id, profile, state, outcome).await
    }

    /// Checks the transcript, then spends the one extraction call and seals the log.
    async fn close(
        &self,
        conversation_id: ConversationId,
        profile: ProspectProfile,
        mut state: ConversationState,
        outcome: ConversationOutcome,
    ) -> Result<ConversationLog, DomainError> {
        verify_opening(&state.transcript)?;
        let intent_detection = self.extract_intent(&conversation_id, &mut state).await;

        let log = ConversationLog::close(
            conversation_id,
            profile,
            state.transcript,
            intent_detection,
            outcome,
            state.total_tokens,
        )?;

        info!(
            event_name = "conversation.closed",
            conversation_id = %log.conversation_id,
            outcome = log.outcome.as_str(),
            exchanges = log.conversation_length,
            intent_match = log.intent_match,
            total_tokens = log.total_tokens_used,
            "conversation closed"
        );
        Ok(log)
    }

    async fn turn(
        &self,
        conversation_id: &ConversationId,
        role: AgentRole,
        history: &[ChatMessage],
    ) -> (String, u32) {
        match self.gateway.invoke(role, history, self.config.role_model(role)).await {
            Ok(completion) => (completion.text, completion.total_tokens),
            Err(error) => {
                warn!(
                    event_name = "conversation.turn_failed",
                    conversation_id = %conversation_id,
                    role = role.as_str(),
                    error = %error,
                    "gateway call failed; recording error marker"
                );
                (format!("[Error: {error}]"), 0)
            }
        }
    }

    async fn extract_intent(
        &self,
        conversation_id: &ConversationId,
        state: &mut ConversationState,
    ) -> Option<IntentDetection> {
        let mut request = state.sales_history.clone();
        request.push(ChatMessage::user(INTENT_REQUEST));

        match self.gateway.invoke(AgentRole::Sales, &request, &self.config.sales).await {
            Ok(completion) => {
                state.total_tokens += u64::from(completion.total_tokens);
                self.extractor.extract(&completion.text)
            }
            Err(error) => {
                warn!(
                    event_name = "conversation.extraction_call_failed",
                    conversation_id = %conversation_id,
                    error = %error,
                    "intent extraction call failed"
                );
                None
            }
        }
    }
}

fn verify_opening(transcript: &[ConversationMessage]) -> Result<(), DomainError> {
    match transcript.first() {
        Some(first) if first.content == SALES_OPENING && first.tokens_used == 0 => Ok(()),
        Some(_) => Err(DomainError::InvariantViolation(
            "transcript must open with the canonical zero-token greeting".to_string(),
        )),
        None => Err(DomainError::InvariantViolation("transcript is empty".to_string())),
    }
}
