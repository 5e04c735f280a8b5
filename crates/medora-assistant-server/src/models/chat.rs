use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::models::ClinicStats;
use crate::services::conversation::reconciler::{ClinicReply, PatientReply};
use crate::services::conversation::types::{ExtractedFacts, Message, Severity};

pub type SessionId = String;

/// Shared by every anonymous caller that omits `sessionId`
pub const DEFAULT_SESSION_ID: &str = "default";

/// Message sent to the text-generation service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: String) -> Self {
        Self { role: "user".to_string(), content }
    }
}

// ===== REQUEST MODELS =====

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl PatientChatRequest {
    /// Session key, falling back to the shared default
    pub fn session_id(&self) -> SessionId {
        self.session_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(DEFAULT_SESSION_ID)
            .to_string()
    }
}

#[derive(Debug, Deserialize)]
pub struct ClinicChatRequest {
    #[serde(default)]
    pub message: String,
}

// ===== RESPONSE MODELS =====

#[derive(Debug, Serialize)]
pub struct PatientChatResponse {
    pub severity: Severity,
    pub reply: String,
    pub emergency_trigger: bool,
    pub suggest_appointment: bool,
    pub appointment_reason: String,
    #[serde(rename = "sessionId")]
    pub session_id: SessionId,
    #[serde(rename = "conversationLength")]
    pub conversation_length: usize,
}

impl PatientChatResponse {
    pub fn new(reply: PatientReply, session_id: SessionId, conversation_length: usize) -> Self {
        Self {
            severity: reply.severity,
            reply: reply.reply,
            emergency_trigger: reply.emergency_trigger,
            suggest_appointment: reply.suggest_appointment,
            appointment_reason: reply.appointment_reason,
            session_id,
            conversation_length,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConversationContext {
    pub session_id: SessionId,
    pub messages_in_memory: usize,
    pub max_messages: usize,
}

#[derive(Debug, Serialize)]
pub struct ClinicChatResponse {
    pub ai_response: ClinicReply,
    pub clinic_data: ClinicStats,
    pub conversation_context: ConversationContext,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub success: bool,
    pub session_id: SessionId,
    pub messages: Vec<Message>,
    pub extracted_facts: ExtractedFacts,
    pub message_count: usize,
    pub last_activity: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub success: bool,
    pub message: String,
}

impl ClearResponse {
    pub fn cleared(session_id: &str) -> Self {
        Self {
            success: true,
            message: format!("Conversation {} cleared", session_id),
        }
    }
}
