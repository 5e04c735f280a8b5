use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::models::chat::SessionId;

/// Which assistant a store, transcript or prompt belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistantVariant {
    Patient,
    Clinic,
}

impl AssistantVariant {
    /// Message cap applied after every append
    pub fn default_max_messages(self) -> usize {
        match self {
            Self::Patient => 6,
            Self::Clinic => 8,
        }
    }

    pub fn role_label(self, role: Role) -> &'static str {
        match (self, role) {
            (Self::Patient, Role::User) => "USER",
            (Self::Patient, Role::Assistant) => "MEDORA AI",
            (Self::Clinic, Role::User) => "CLINIC STAFF",
            (Self::Clinic, Role::Assistant) => "MEDORA CLINIC AI",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Severity tiers, mildest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mild => "MILD",
            Self::Moderate => "MODERATE",
            Self::Severe => "SEVERE",
        }
    }

    /// Case-insensitive parse of a model-provided label
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_uppercase().as_str() {
            "MILD" => Some(Self::Mild),
            "MODERATE" => Some(Self::Moderate),
            "SEVERE" => Some(Self::Severe),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Annotations attached to assistant messages, only read back when
/// rendering the transcript
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub followups: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub insights: Vec<String>,
}

impl MessageMetadata {
    pub fn is_empty(&self) -> bool {
        self.severity.is_none() && self.followups.is_empty() && self.insights.is_empty()
    }

    pub fn with_severity(severity: Severity) -> Self {
        Self {
            severity: Some(severity),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "MessageMetadata::is_empty")]
    pub metadata: MessageMetadata,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>, metadata: MessageMetadata) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            metadata,
        }
    }
}

/// Facts accumulated from user text over the life of a patient session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFacts {
    /// Vocabulary keywords in order of first detection; never shrinks
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symptoms: Vec<String>,

    /// First duration phrase seen; never overwritten
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    /// Most recent assistant severity; always overwritten
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_severity: Option<Severity>,
}

impl ExtractedFacts {
    pub fn is_empty(&self) -> bool {
        self.symptoms.is_empty() && self.duration.is_none() && self.last_severity.is_none()
    }
}

/// Conversation state held in the in-memory store
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSession {
    pub session_id: SessionId,

    /// Oldest first, capped by the owning store
    pub messages: Vec<Message>,

    pub extracted_facts: ExtractedFacts,

    /// Touched on every store access; watermark for the idle sweep
    pub last_activity: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
}

impl ConversationSession {
    pub fn new(session_id: impl Into<SessionId>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            messages: Vec::new(),
            extracted_facts: ExtractedFacts::default(),
            last_activity: now,
            created_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Drop the oldest messages until at most `max_messages` remain
    pub fn trim_to(&mut self, max_messages: usize) -> usize {
        let excess = self.messages.len().saturating_sub(max_messages);
        if excess > 0 {
            self.messages.drain(..excess);
        }
        excess
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}
