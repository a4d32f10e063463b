pub mod config;
pub mod domain;
pub mod errors;
pub mod generator;
pub mod summary;
pub mod transcripts;

pub use config::{AgentRole, AppConfig, LlmConfig, LlmProvider, RoleModelConfig, SimulationConfig};
pub use domain::conversation::{
    ConversationId, ConversationLog, ConversationMessage, ConversationOutcome, ConversationRole,
    IntentDetection, TranscriptExport,
};
pub use domain::profile::{
    BigFiveTraits, Intent, ObjectionType, ProspectProfile, ReadinessLevel,
};
pub use errors::{ApplicationError, DomainError};
pub use generator::ProfileGenerator;
pub use summary::{BatchSummary, IntentTally, OutcomeCounts};
pub use transcripts::TranscriptStore;
