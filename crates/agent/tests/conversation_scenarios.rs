use std::sync::Arc;

use ringside_agent::conversation::ConversationEngine;
use ringside_agent::llm::Speaker;
use ringside_agent::prompts::{INTENT_REQUEST, SALES_OPENING};
use ringside_agent::scripted::ScriptedGateway;
use ringside_core::config::{AgentRole, SimulationConfig};
use ringside_core::domain::conversation::{ConversationId, ConversationOutcome, ConversationRole};
use ringside_core::domain::profile::{BigFiveTraits, Intent, ProspectProfile, ReadinessLevel};

const CONTINUE: &str = r#"{"should_end": false, "outcome": "continue", "reasoning": "still asking"}"#;
const DECLINE: &str =
    r#"{"should_end": true, "outcome": "not_interested", "reasoning": "explicit no"}"#;
const AGREE: &str = "```json\n{\"should_end\": true, \"outcome\": \"agreed_to_free_class\", \
                     \"reasoning\": \"asked about class times\"}\n```";

fn weight_loss_detection() -> String {
    r#"INTENT_DETECTION:
{"detected_intent": "weight_loss", "confidence_level": 0.8, "reasoning": "wants to drop pounds", "best_time_to_visit": "evening"}"#
        .to_string()
}

fn profile() -> ProspectProfile {
    ProspectProfile {
        big_five: BigFiveTraits::new(7, 4, 3, 8, 6).expect("valid traits"),
        true_intent: Intent::WeightLoss,
        objection_type: None,
        readiness_level: ReadinessLevel::Warm,
        age_range: "25-35".to_string(),
        fitness_background: "beginner".to_string(),
    }
}

fn config(max_message_exchanges: u32) -> Arc<SimulationConfig> {
    Arc::new(SimulationConfig { max_message_exchanges, ..SimulationConfig::default() })
}

fn engine(gateway: &Arc<ScriptedGateway>, max_message_exchanges: u32) -> ConversationEngine {
    ConversationEngine::new(gateway.clone(), config(max_message_exchanges))
}

fn assert_alternates_from_sales(roles: &[ConversationRole]) {
    assert_eq!(roles.first(), Some(&ConversationRole::Sales));
    for pair in roles.windows(2) {
        assert_ne!(pair[0], pair[1], "roles must alternate");
    }
}

#[tokio::test]
async fn explicit_decline_closes_after_first_exchange() {
    let gateway = Arc::new(
        ScriptedGateway::new()
            .reply(AgentRole::Prospect, "No thanks, not interested", 20)
            .reply(AgentRole::Assessor, DECLINE, 30)
            .reply(AgentRole::Sales, weight_loss_detection(), 50),
    );

    let log = engine(&gateway, 3)
        .run(ConversationId("conv_decline".to_string()), profile())
        .await
        .expect("conversation completes");

    assert_eq!(log.outcome, ConversationOutcome::NotInterested);
    assert_eq!(log.messages.len(), 2);
    assert_eq!(log.conversation_length, 1);
    assert_eq!(log.messages[0].content, SALES_OPENING);
    assert_eq!(log.messages[0].tokens_used, 0);
    assert_eq!(log.total_tokens_used, 100);
    assert!(log.intent_match);

    assert_eq!(gateway.calls_for(AgentRole::Assessor), 1);
    // only the extraction call goes to the sales model
    assert_eq!(gateway.calls_for(AgentRole::Sales), 1);
}

#[tokio::test]
async fn scheduling_question_counts_as_agreement() {
    let gateway = Arc::new(
        ScriptedGateway::new()
            .reply(AgentRole::Prospect, "I want to lose a few pounds before summer", 15)
            .reply(AgentRole::Assessor, CONTINUE, 25)
            .reply(AgentRole::Sales, "Great goal! Want to try a free class this week?", 35)
            .reply(AgentRole::Prospect, "What time are classes on Tuesday?", 12)
            .reply(AgentRole::Assessor, AGREE, 25)
            .reply(AgentRole::Sales, weight_loss_detection(), 40),
    );

    let log = engine(&gateway, 3)
        .run(ConversationId("conv_agree".to_string()), profile())
        .await
        .expect("conversation completes");

    assert_eq!(log.outcome, ConversationOutcome::AgreedFreeClass);
    assert!(log.outcome.is_qualified_lead());
    assert_eq!(log.conversation_length, 2);
    assert_eq!(log.total_tokens_used, 15 + 25 + 35 + 12 + 25 + 40);

    let detection = log.intent_detection.expect("detection recovered");
    assert_eq!(detection.best_time_to_visit.as_deref(), Some("evening"));
}

#[tokio::test]
async fn undecided_prospect_reaches_message_limit_and_is_still_scored() {
    let gateway = Arc::new(
        ScriptedGateway::new()
            .fallback(AgentRole::Prospect, "Hmm, tell me more", 10)
            .fallback(AgentRole::Assessor, CONTINUE, 5)
            .reply(AgentRole::Sales, "Classes are 45 minutes.", 20)
            .reply(AgentRole::Sales, "We also have weekend mornings.", 20)
            .reply(AgentRole::Sales, weight_loss_detection(), 30),
    );

    let log = engine(&gateway, 3)
        .run(ConversationId("conv_limit".to_string()), profile())
        .await
        .expect("conversation completes");

    assert_eq!(log.outcome, ConversationOutcome::ReachedMessageLimit);
    assert_eq!(log.conversation_length, 3);
    assert_eq!(log.messages.len(), 6);
    assert!(log.intent_detection.is_some());
    assert_eq!(gateway.calls_for(AgentRole::Assessor), 3);
    assert_eq!(gateway.calls_for(AgentRole::Prospect), 3);

    let roles: Vec<_> = log.messages.iter().map(|message| message.role).collect();
    assert_alternates_from_sales(&roles);

    let calls = gateway.calls();
    let extraction = calls.last().expect("extraction call recorded");
    assert_eq!(extraction.role, AgentRole::Sales);
    let request = extraction.messages.last().expect("request message");
    assert_eq!(request.speaker, Speaker::User);
    assert_eq!(request.text, INTENT_REQUEST);
}

#[tokio::test]
async fn malformed_detection_yields_no_match() {
    let gateway = Arc::new(
        ScriptedGateway::new()
            .reply(AgentRole::Prospect, "Not for me", 8)
            .reply(AgentRole::Assessor, DECLINE, 8)
            .reply(
                AgentRole::Sales,
                r#"INTENT_DETECTION: {"detected_intent": "weight_loss", "confidence_level": 0.9"#,
                8,
            ),
    );

    let log = engine(&gateway, 3)
        .run(ConversationId("conv_malformed".to_string()), profile())
        .await
        .expect("conversation completes");

    assert!(log.intent_detection.is_none());
    assert!(!log.intent_match);
    assert_eq!(log.total_tokens_used, 24);
}

#[tokio::test]
async fn gateway_failure_becomes_inline_marker_and_dialogue_continues() {
    let gateway = Arc::new(
        ScriptedGateway::new()
            .fail(AgentRole::Prospect, "rate limited")
            .reply(AgentRole::Prospect, "Sorry, I'm back. Mornings work.", 9)
            .fallback(AgentRole::Assessor, CONTINUE, 4)
            .reply(AgentRole::Sales, "No worries! Any questions?", 11)
            .fail(AgentRole::Sales, "extraction down"),
    );

    let log = engine(&gateway, 2)
        .run(ConversationId("conv_error".to_string()), profile())
        .await
        .expect("conversation completes");

    assert_eq!(log.messages.len(), 4);
    assert!(log.messages[1].content.starts_with("[Error: "));
    assert!(log.messages[1].content.contains("rate limited"));
    assert_eq!(log.messages[1].tokens_used, 0);
    assert_eq!(log.messages[1].role, ConversationRole::Prospect);
    assert_eq!(log.messages[3].content, "Sorry, I'm back. Mornings work.");
    assert_eq!(log.outcome, ConversationOutcome::ReachedMessageLimit);
    assert!(log.intent_detection.is_none());
    assert_eq!(log.total_tokens_used, 4 + 11 + 9 + 4);
}

#[tokio::test]
async fn exchanges_never_exceed_ceiling() {
    for ceiling in 1..=4 {
        let gateway = Arc::new(
            ScriptedGateway::new()
                .fallback(AgentRole::Prospect, "ok", 1)
                .fallback(AgentRole::Assessor, CONTINUE, 1)
                .fallback(AgentRole::Sales, "sure", 1),
        );

        let log = engine(&gateway, ceiling)
            .run(ConversationId(format!("conv_ceiling_{ceiling}")), profile())
            .await
            .expect("conversation completes");

        assert_eq!(log.conversation_length, ceiling);
        assert_eq!(log.messages.len() as u32, ceiling * 2);
        assert_eq!(log.outcome, ConversationOutcome::ReachedMessageLimit);
        assert_eq!(gateway.calls_for(AgentRole::Assessor) as u32, ceiling);
    }
}
