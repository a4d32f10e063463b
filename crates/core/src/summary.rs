use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::conversation::{ConversationLog, ConversationOutcome};
use crate::domain::profile::Intent;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct IntentTally {
    pub conversations: u32,
    pub matches: u32,
}

impl IntentTally {
    pub fn accuracy(&self) -> f64 {
        ratio(self.matches, self.conversations)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub agreed_to_free_class: u32,
    pub not_interested: u32,
    pub reached_message_limit: u32,
}

impl OutcomeCounts {
    fn record(&mut self, outcome: ConversationOutcome) {
        match outcome {
            ConversationOutcome::AgreedFreeClass => self.agreed_to_free_class += 1,
            ConversationOutcome::NotInterested => self.not_interested += 1,
            ConversationOutcome::ReachedMessageLimit => self.reached_message_limit += 1,
        }
    }
}

/// Offline scoring of a log collection.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BatchSummary {
    pub requested: u32,
    pub completed: u32,
    pub dropped: u32,
    pub outcomes: OutcomeCounts,
    pub qualified_leads: u32,
    pub intent_matches: u32,
    pub intent_accuracy: f64,
    pub missing_detections: u32,
    pub total_tokens_used: u64,
    pub average_tokens_per_conversation: f64,
    pub average_exchanges: f64,
    pub by_intent: BTreeMap<Intent, IntentTally>,
}

impl BatchSummary {
    /// `requested` is the batch size that produced `logs`; pass `logs.len()` when it is
    /// unknown, e.g. when scoring a transcript file.
    pub fn from_logs(logs: &[ConversationLog], requested: u32) -> Self {
        let completed = logs.len() as u32;
        let mut outcomes = OutcomeCounts::default();
        let mut by_intent: BTreeMap<Intent, IntentTally> = BTreeMap::new();
        let mut intent_matches = 0;
        let mut missing_detections = 0;
        let mut total_tokens_used = 0u64;
        let mut total_exchanges = 0u64;

        for log in logs {
            outcomes.record(log.outcome);
            total_tokens_used += log.total_tokens_used;
            total_exchanges += u64::from(log.conversation_length);
            if log.intent_detection.is_none() {
                missing_detections += 1;
            }

            let tally = by_intent.entry(log.prospect_profile.true_intent).or_default();
            tally.conversations += 1;
            if log.intent_match {
                tally.matches += 1;
                intent_matches += 1;
            }
        }

        Self {
            requested,
            completed,
            dropped: requested.saturating_sub(completed),
            qualified_leads: outcomes.agreed_to_free_class,
            outcomes,
            intent_matches,
            intent_accuracy: ratio(intent_matches, completed),
            missing_detections,
            total_tokens_used,
            average_tokens_per_conversation: mean(total_tokens_used, completed),
            average_exchanges: mean(total_exchanges, completed),
            by_intent,
        }
    }

    pub fn headline(&self) -> String {
        format!(
            "{}/{} conversations completed, intent accuracy {:.1}%, {} qualified leads, {} tokens",
            self.completed,
            self.requested,
            self.intent_accuracy * 100.0,
            self.qualified_leads,
            self.total_tokens_used
        )
    }
}

fn ratio(numerator: u32, denominator: u32) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        f64::from(numerator) / f64::from(denominator)
    }
}

fn mean(total: u64, count: u32) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / f64::from(count)
    }
}

#[cfg(test)]
mod tests {
    use super::BatchSummary;
    use crate::domain::conversation::{
        ConversationId, ConversationLog, ConversationMessage, ConversationOutcome,
        ConversationRole, IntentDetection,
    };
    use crate::domain::profile::{BigFiveTraits, Intent, ProspectProfile, ReadinessLevel};

    fn log(
        id: &str,
        true_intent: Intent,
        detected: Option<Intent>,
        outcome: ConversationOutcome,
        tokens: u64,
    ) -> ConversationLog {
        ConversationLog::close(
            ConversationId(id.to_string()),
            ProspectProfile {
                big_five: BigFiveTraits::new(5, 5, 5, 5, 5).expect("valid traits"),
                true_intent,
                objection_type: None,
                readiness_level: ReadinessLevel::Cold,
                age_range: "55+".to_string(),
                fitness_background: "beginner".to_string(),
            },
            vec![
                ConversationMessage::new(ConversationRole::Sales, "Hello", 0),
                ConversationMessage::new(ConversationRole::Prospect, "Hi", 10),
                ConversationMessage::new(ConversationRole::Sales, "Free class?", 20),
                ConversationMessage::new(ConversationRole::Prospect, "Maybe", 10),
            ],
            detected.map(|detected_intent| IntentDetection {
                detected_intent,
                confidence_level: 0.6,
                reasoning: "hint".to_string(),
                best_time_to_visit: None,
            }),
            outcome,
            tokens,
        )
        .expect("valid log")
    }

    #[test]
    fn summary_scores_accuracy_outcomes_and_tokens() {
        let logs = vec![
            log(
                "conv_1",
                Intent::WeightLoss,
                Some(Intent::WeightLoss),
                ConversationOutcome::AgreedFreeClass,
                100,
            ),
            log(
                "conv_2",
                Intent::WeightLoss,
                Some(Intent::GeneralFitness),
                ConversationOutcome::NotInterested,
                200,
            ),
            log("conv_3", Intent::SocialCommunity, None, ConversationOutcome::ReachedMessageLimit, 300),
        ];

        let summary = BatchSummary::from_logs(&logs, 4);

        assert_eq!(summary.completed, 3);
        assert_eq!(summary.dropped, 1);
        assert_eq!(summary.intent_matches, 1);
        assert!((summary.intent_accuracy - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.missing_detections, 1);
        assert_eq!(summary.qualified_leads, 1);
        assert_eq!(summary.outcomes.reached_message_limit, 1);
        assert_eq!(summary.total_tokens_used, 600);
        assert!((summary.average_tokens_per_conversation - 200.0).abs() < 1e-9);
        assert!((summary.average_exchanges - 2.0).abs() < 1e-9);

        let weight_loss = &summary.by_intent[&Intent::WeightLoss];
        assert_eq!(weight_loss.conversations, 2);
        assert!((weight_loss.accuracy() - 0.5).abs() < 1e-9);
        assert!(!summary.by_intent.contains_key(&Intent::JustFreeClass));
    }

    #[test]
    fn empty_collection_has_zero_rates() {
        let summary = BatchSummary::from_logs(&[], 5);
        assert_eq!(summary.completed, 0);
        assert_eq!(summary.dropped, 5);
        assert_eq!(summary.intent_accuracy, 0.0);
        assert_eq!(summary.average_exchanges, 0.0);
        assert!(summary.headline().starts_with("0/5 conversations completed"));
    }

    #[test]
    fn summary_serializes_intents_as_wire_tags() {
        let logs = vec![log(
            "conv_1",
            Intent::StressRelief,
            Some(Intent::StressRelief),
            ConversationOutcome::AgreedFreeClass,
            10,
        )];
        let value = serde_json::to_value(BatchSummary::from_logs(&logs, 1)).expect("serialize");
        assert_eq!(value["by_intent"]["stress_relief_mental_health"]["matches"], 1);
        assert_eq!(value["outcomes"]["agreed_to_free_class"], 1);
    }
}
