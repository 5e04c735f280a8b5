use std::fmt::Write as _;
use tracing::debug;

use crate::database::models::ClinicStats;

use super::facts::{detect_duration, detect_symptoms};
use super::types::{AssistantVariant, ConversationSession, ExtractedFacts, Message, Severity};

pub const NO_PREVIOUS_CONVERSATION: &str = "No previous conversation.";

/// Turns session state into prompt text and folds each exchange back into
/// the session's extracted facts.
pub struct ContextBuilder {
    variant: AssistantVariant,
    base_instruction: String,
}

impl ContextBuilder {
    pub fn new(variant: AssistantVariant, base_instruction: String) -> Self {
        Self {
            variant,
            base_instruction,
        }
    }

    pub fn for_variant(variant: AssistantVariant) -> Self {
        Self::new(variant, Self::default_base_instruction(variant))
    }

    pub fn default_base_instruction(variant: AssistantVariant) -> String {
        match variant {
            AssistantVariant::Patient => r#"You are MEDORA AI, a friendly health assistant for patients of Medora clinics.

Your role is to:
- Understand the patient's symptoms and ask short clarifying questions
- Give general self-care guidance in plain language
- Judge how serious the situation sounds (MILD, MODERATE or SEVERE)
- Recommend booking a clinic appointment when a professional should look at it
- Tell the patient to seek emergency care immediately when symptoms are dangerous

Guidelines:
- Never give a definitive diagnosis or prescribe medication doses
- Keep replies short, warm and easy to read
- Use the conversation history so the patient does not have to repeat themselves"#
                .to_string(),
            AssistantVariant::Clinic => r#"You are MEDORA CLINIC AI, an operations assistant for clinic staff.

Your role is to:
- Answer questions about the clinic's appointments, patients and revenue
- Point out trends, bottlenecks and anything that needs attention
- Suggest practical next steps for the clinic team

Guidelines:
- Base every figure on the live clinic data provided below
- If the data does not contain the answer, say so clearly
- Be concise and professional"#
                .to_string(),
        }
    }

    /// Readable transcript of the session, oldest message first
    pub fn render_transcript(&self, session: &ConversationSession) -> String {
        if session.messages.is_empty() {
            return NO_PREVIOUS_CONVERSATION.to_string();
        }

        let mut out = String::new();
        for message in &session.messages {
            self.render_message(&mut out, message);
        }
        out
    }

    fn render_message(&self, out: &mut String, message: &Message) {
        let _ = writeln!(
            out,
            "{}: {}",
            self.variant.role_label(message.role),
            message.content
        );

        let metadata = &message.metadata;
        if let Some(severity) = metadata.severity {
            let _ = writeln!(out, "[Previous severity: {}]", severity);
        }
        if !metadata.followups.is_empty() {
            let _ = writeln!(out, "[Suggested follow-ups: {}]", metadata.followups.join("; "));
        }
        if !metadata.insights.is_empty() {
            let _ = writeln!(out, "[Previous insights: {}]", metadata.insights.join("; "));
        }
        out.push('\n');
    }

    /// Fold one exchange into `facts`: new vocabulary symptoms are appended,
    /// the first duration phrase is kept forever, severity is replaced.
    pub fn update_facts(
        &self,
        facts: &mut ExtractedFacts,
        user_message: &str,
        reply_severity: Option<Severity>,
    ) {
        for symptom in detect_symptoms(user_message) {
            if !facts.symptoms.iter().any(|known| known == symptom) {
                facts.symptoms.push(symptom.to_string());
            }
        }

        if facts.duration.is_none() {
            facts.duration = detect_duration(user_message);
        }

        if let Some(severity) = reply_severity {
            facts.last_severity = Some(severity);
        }

        debug!(
            "Facts now: symptoms={:?}, duration={:?}, last_severity={:?}",
            facts.symptoms, facts.duration, facts.last_severity
        );
    }

    /// One-paragraph summary of what the patient has told us so far
    pub fn render_facts(facts: &ExtractedFacts) -> String {
        if facts.is_empty() {
            return "Nothing recorded yet.".to_string();
        }

        let mut lines = Vec::new();
        if !facts.symptoms.is_empty() {
            lines.push(format!("Symptoms mentioned: {}", facts.symptoms.join(", ")));
        }
        if let Some(duration) = &facts.duration {
            lines.push(format!("Duration: {}", duration));
        }
        if let Some(severity) = facts.last_severity {
            lines.push(format!("Last assessed severity: {}", severity));
        }
        lines.join("\n")
    }

    pub fn build_patient_prompt(&self, session: &ConversationSession, current_message: &str) -> String {
        format!(
            r#"{base}

CONVERSATION SO FAR:
{transcript}
KNOWN FACTS ABOUT THIS PATIENT:
{facts}

CURRENT PATIENT MESSAGE:
{message}

Respond with ONLY a JSON object, no markdown, exactly these keys:
{{"severity": "MILD" | "MODERATE" | "SEVERE", "reply": string, "emergency_trigger": boolean, "suggest_appointment": boolean, "appointment_reason": string}}"#,
            base = self.base_instruction,
            transcript = self.render_transcript(session),
            facts = Self::render_facts(&session.extracted_facts),
            message = current_message,
        )
    }

    pub fn build_clinic_prompt(
        &self,
        session: &ConversationSession,
        stats: &ClinicStats,
        current_message: &str,
    ) -> String {
        format!(
            r#"{base}

LIVE CLINIC DATA:
{stats}

CONVERSATION SO FAR:
{transcript}
CURRENT STAFF MESSAGE:
{message}

Respond with ONLY a JSON object, no markdown, exactly these keys:
{{"reply": string, "clinic_insights": [string], "followup_questions": [string]}}"#,
            base = self.base_instruction,
            stats = stats.render(),
            transcript = self.render_transcript(session),
            message = current_message,
        )
    }
}
