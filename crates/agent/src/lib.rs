//! Conversation simulation engine.
//!
//! Drives bounded dialogues between a sales agent and a simulated prospect, both backed by
//! a language model reached through [`llm::LlmGateway`].
//!
//! # Flow
//!
//! 1. **Opening** - fixed sales greeting, no model call
//! 2. **Turns** - prospect and sales replies alternate (`conversation`)
//! 3. **Assessment** - after each prospect turn a secondary call decides whether the
//!    prospect agreed, declined or the dialogue continues (`assessor`)
//! 4. **Extraction** - once closed, the sales agent is asked for its structured intent
//!    verdict (`extractor`)
//!
//! `batch` runs many conversations with per-conversation fault isolation.

pub mod assessor;
pub mod batch;
pub mod conversation;
pub mod extractor;
pub mod llm;
pub mod openai;
pub mod prompts;
pub mod scripted;

pub use batch::{BatchProgress, BatchReport, BatchRunner, ConversationFailure, ProgressObserver};
pub use conversation::{ConversationEngine, ConversationPhase};
pub use llm::{ChatMessage, Completion, GatewayError, LlmGateway};
pub use openai::OpenAiCompatibleGateway;
