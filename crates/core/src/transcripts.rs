use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::domain::conversation::ConversationLog;
use crate::errors::ApplicationError;

pub const TRANSCRIPT_FILE_PREFIX: &str = "conversation_transcripts_";

/// File-backed store for batch transcripts.
///
/// One batch maps to one pretty-printed JSON array named after the moment it was captured.
#[derive(Clone, Debug)]
pub struct TranscriptStore {
    directory: PathBuf,
}

impl TranscriptStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self { directory: directory.into() }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn file_name(captured_at: DateTime<Utc>) -> String {
        format!("{TRANSCRIPT_FILE_PREFIX}{}.json", captured_at.format("%Y%m%d_%H%M%S"))
    }

    pub fn save(
        &self,
        logs: &[ConversationLog],
        captured_at: DateTime<Utc>,
    ) -> Result<PathBuf, ApplicationError> {
        fs::create_dir_all(&self.directory).map_err(|error| {
            ApplicationError::Persistence(format!(
                "could not create transcript directory `{}`: {error}",
                self.directory.display()
            ))
        })?;

        let path = self.directory.join(Self::file_name(captured_at));
        let encoded = serde_json::to_string_pretty(logs).map_err(|error| {
            ApplicationError::Persistence(format!("failed to serialize transcripts: {error}"))
        })?;
        fs::write(&path, encoded).map_err(|error| {
            ApplicationError::Persistence(format!(
                "could not write transcripts to `{}`: {error}",
                path.display()
            ))
        })?;

        info!(
            event_name = "transcripts.saved",
            path = %path.display(),
            conversations = logs.len(),
            "saved conversation transcripts"
        );
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Vec<ConversationLog>, ApplicationError> {
        let raw = fs::read_to_string(path).map_err(|error| {
            ApplicationError::Persistence(format!(
                "could not read transcripts from `{}`: {error}",
                path.display()
            ))
        })?;

        serde_json::from_str(&raw).map_err(|error| {
            ApplicationError::Persistence(format!(
                "transcript file `{}` is not a valid conversation log array: {error}",
                path.display()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    use super::TranscriptStore;
    use crate::domain::conversation::{
        ConversationId, ConversationLog, ConversationMessage, ConversationOutcome,
        ConversationRole, IntentDetection,
    };
    use crate::domain::profile::{
        BigFiveTraits, Intent, ObjectionType, ProspectProfile, ReadinessLevel,
    };
    use crate::errors::ApplicationError;

    fn sample_log(index: u32) -> ConversationLog {
        let started_at = Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).single().expect("timestamp");
        ConversationLog::close(
            ConversationId::for_batch(started_at, index),
            ProspectProfile {
                big_five: BigFiveTraits::new(2, 9, 5, 7, 3).expect("valid traits"),
                true_intent: Intent::BoxingTechnique,
                objection_type: Some(ObjectionType::InjuryConcerns),
                readiness_level: ReadinessLevel::Hot,
                age_range: "35-45".to_string(),
                fitness_background: "former_athlete".to_string(),
            },
            vec![
                ConversationMessage::new(ConversationRole::Sales, "Welcome!", 0),
                ConversationMessage::new(ConversationRole::Prospect, "I want to spar", 18),
            ],
            Some(IntentDetection {
                detected_intent: Intent::BoxingTechnique,
                confidence_level: 0.5,
                reasoning: "asked about sparring".to_string(),
                best_time_to_visit: None,
            }),
            ConversationOutcome::NotInterested,
            57,
        )
        .expect("valid log")
    }

    #[test]
    fn file_name_follows_capture_timestamp() {
        let captured_at = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 1).single().expect("ts");
        assert_eq!(
            TranscriptStore::file_name(captured_at),
            "conversation_transcripts_20241231_235901.json"
        );
    }

    #[test]
    fn saved_batch_loads_back_field_for_field() {
        let dir = TempDir::new().expect("temp dir");
        let store = TranscriptStore::new(dir.path().join("nested/out"));
        let logs = vec![sample_log(0), sample_log(1)];

        let path = store.save(&logs, Utc::now()).expect("save transcripts");
        assert!(path.starts_with(store.directory()));

        let loaded = TranscriptStore::load(&path).expect("load transcripts");
        assert_eq!(loaded, logs);

        let raw = std::fs::read_to_string(&path).expect("read raw file");
        assert!(raw.contains("\"objection_type\": \"injury_concerns\""));
        assert!(raw.contains("\"readiness_level\": \"hot\""));
    }

    #[test]
    fn load_reports_persistence_error_for_garbage() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").expect("write");

        let error = TranscriptStore::load(&path).expect_err("garbage must fail");
        assert!(matches!(error, ApplicationError::Persistence(_)));
        assert_eq!(error.exit_code(), 4);
    }
}
