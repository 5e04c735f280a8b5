//! Conversation memory for the Medora assistants
//!
//! Provides in-memory session state with:
//! - Thread-safe per-session storage (DashMap) with a fixed message cap
//! - Keyword fact extraction (symptoms, duration, severity)
//! - Prompt assembly from transcript, facts and clinic data
//! - Tolerant parsing of model output into typed replies

mod context_builder;
pub mod facts;
pub mod reconciler;
mod store;
pub mod types;

pub use context_builder::{ContextBuilder, NO_PREVIOUS_CONVERSATION};
pub use reconciler::{ClinicReply, ParseTier, PatientReply, Reconciled, ResponseReconciler};
pub use store::{SessionStore, StoreStats};
pub use types::{
    AssistantVariant, ConversationSession, ExtractedFacts, Message, MessageMetadata, Role,
    Severity,
};

pub use crate::models::chat::SessionId;
