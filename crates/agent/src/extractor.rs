use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use ringside_core::domain::conversation::IntentDetection;
use ringside_core::domain::profile::Intent;

pub const INTENT_LABEL: &str = "INTENT_DETECTION";

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ExtractionError {
    #[error("reply has no `INTENT_DETECTION` label")]
    MissingLabel,
    #[error("no JSON object follows the `INTENT_DETECTION` label")]
    MissingObject,
    #[error("JSON object after the label is never closed")]
    Unbalanced,
    #[error("intent payload is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("intent payload is missing `{0}`")]
    MissingField(&'static str),
    #[error("intent payload field `{0}` has the wrong type")]
    InvalidField(&'static str),
    #[error("`{0}` is not a known intent")]
    UnknownIntent(String),
    #[error("confidence {0} is outside 0.0..=1.0")]
    ConfidenceOutOfRange(f64),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParsedIntent {
    pub detection: IntentDetection,
    /// Extra intents the model listed after the first one.
    pub discarded_intents: Vec<String>,
}

/// Recovers the sales agent's structured verdict from its final reply.
#[derive(Clone, Debug, Default)]
pub struct IntentExtractor;

impl IntentExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Lenient entry point: any failure becomes "no detection".
    pub fn extract(&self, raw: &str) -> Option<IntentDetection> {
        match self.parse(raw) {
            Ok(parsed) => {
                if !parsed.discarded_intents.is_empty() {
                    warn!(
                        event_name = "intent.multiple_listed",
                        kept = parsed.detection.detected_intent.as_str(),
                        discarded = ?parsed.discarded_intents,
                        "model listed several intents; keeping the first"
                    );
                }
                Some(parsed.detection)
            }
            Err(error) => {
                warn!(
                    event_name = "intent.extraction_failed",
                    error = %error,
                    "no intent detection recovered"
                );
                None
            }
        }
    }

    pub fn parse(&self, raw: &str) -> Result<ParsedIntent, ExtractionError> {
        let label_at = raw.find(INTENT_LABEL).ok_or(ExtractionError::MissingLabel)?;
        let object = first_balanced_object(&raw[label_at + INTENT_LABEL.len()..])?;

        let payload: Map<String, Value> = serde_json::from_str(object)
            .map_err(|error| ExtractionError::InvalidJson(error.to_string()))?;

        let intent_field = string_field(&payload, "detected_intent")?;
        let mut listed = intent_field.split(',').map(str::trim).filter(|entry| !entry.is_empty());
        let primary = listed.next().ok_or(ExtractionError::InvalidField("detected_intent"))?;
        let discarded_intents = listed.map(str::to_string).collect();
        let detected_intent = Intent::parse(primary)
            .ok_or_else(|| ExtractionError::UnknownIntent(primary.to_string()))?;

        let confidence_level = confidence_field(&payload)?;
        if !(0.0..=1.0).contains(&confidence_level) {
            return Err(ExtractionError::ConfidenceOutOfRange(confidence_level));
        }

        let reasoning = string_field(&payload, "reasoning")?.to_string();
        let best_time_to_visit = match payload.get("best_time_to_visit") {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => {
                let text = text.trim();
                (!text.is_empty() && !text.eq_ignore_ascii_case("null")).then(|| text.to_string())
            }
            Some(_) => return Err(ExtractionError::InvalidField("best_time_to_visit")),
        };

        Ok(ParsedIntent {
            detection: IntentDetection {
                detected_intent,
                confidence_level,
                reasoning,
                best_time_to_visit,
            },
            discarded_intents,
        })
    }
}

/// Returns the first `{...}` object in `text`, matching braces outside string literals.
fn first_balanced_object(text: &str) -> Result<&str, ExtractionError> {
    let start = text.find('{').ok_or(ExtractionError::MissingObject)?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    Err(ExtractionError::Unbalanced)
}

fn string_field<'a>(
    payload: &'a Map<String, Value>,
    name: &'static str,
) -> Result<&'a str, ExtractionError> {
    match payload.get(name) {
        None | Some(Value::Null) => Err(ExtractionError::MissingField(name)),
        Some(Value::String(text)) => Ok(text.as_str()),
        Some(_) => Err(ExtractionError::InvalidField(name)),
    }
}

fn confidence_field(payload: &Map<String, Value>) -> Result<f64, ExtractionError> {
    const NAME: &str = "confidence_level";
    match payload.get(NAME) {
        None | Some(Value::Null) => Err(ExtractionError::MissingField(NAME)),
        Some(Value::Number(number)) => number.as_f64().ok_or(ExtractionError::InvalidField(NAME)),
        Some(Value::String(text)) => {
            text.trim().parse::<f64>().map_err(|_| ExtractionError::InvalidField(NAME))
        }
        Some(_) => Err(ExtractionError::InvalidField(NAME)),
    }
}
