/// reconciler.rs - turns raw model output into complete, typed replies
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::types::Severity;

pub const DEFAULT_APPOINTMENT_REASON: &str = "Medical consultation";

/// Checked first; any hit classifies the text as SEVERE
const SEVERE_KEYWORDS: &[&str] = &[
    "emergency",
    "severe",
    "urgent",
    "immediately",
    "call 911",
    "chest pain",
    "difficulty breathing",
    "shortness of breath",
    "unconscious",
    "seizure",
    "stroke",
    "heart attack",
    "heavy bleeding",
    "suicidal",
];

/// Checked second; any hit classifies the text as MODERATE
const MODERATE_KEYWORDS: &[&str] = &[
    "moderate",
    "see a doctor",
    "consult",
    "appointment",
    "medical attention",
    "persistent",
    "worsening",
    "infection",
    "fever",
];

static GREEDY_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("object pattern is valid"));
static BOLD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("bold pattern is valid"));
static ITALIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*(.*?)\*").expect("italic pattern is valid"));
static INLINE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`(.*?)`").expect("code pattern is valid"));
static EXCESS_NEWLINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("newline pattern is valid"));

/// Which parse attempt produced the structured fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseTier {
    /// Whole text (minus code fences) was a JSON object
    Direct,
    /// A brace-delimited span inside the text was a JSON object
    Extracted,
    /// No JSON found; fields come from the raw text and defaults
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientReply {
    pub severity: Severity,
    pub reply: String,
    pub emergency_trigger: bool,
    pub suggest_appointment: bool,
    pub appointment_reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClinicReply {
    pub reply: String,
    pub clinic_insights: Vec<String>,
    pub followup_questions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled<T> {
    pub value: T,
    pub tier: ParseTier,
}

pub struct ResponseReconciler;

impl ResponseReconciler {
    /// Structured fields from `raw`, trying each tier in order. The heuristic
    /// tier yields an empty object so every field takes its default.
    pub fn parse_structured(raw: &str) -> (Map<String, Value>, ParseTier) {
        Self::try_direct(raw)
            .map(|object| (object, ParseTier::Direct))
            .or_else(|| Self::try_extracted(raw).map(|object| (object, ParseTier::Extracted)))
            .unwrap_or_else(|| {
                debug!("No JSON object in model output, using heuristic fallback");
                (Map::new(), ParseTier::Heuristic)
            })
    }

    fn try_direct(raw: &str) -> Option<Map<String, Value>> {
        let unfenced = raw.replace("```json", "").replace("```", "");
        parse_object(unfenced.trim())
    }

    fn try_extracted(raw: &str) -> Option<Map<String, Value>> {
        let span = GREEDY_OBJECT.find(raw)?;
        let parsed = parse_object(span.as_str());
        if parsed.is_none() {
            warn!("Brace-delimited span found but did not parse as JSON");
        }
        parsed
    }

    pub fn reconcile_patient(raw: &str) -> Reconciled<PatientReply> {
        let (object, tier) = Self::parse_structured(raw);

        let reply = Self::reply_text(&object, raw);
        let severity = object
            .get("severity")
            .and_then(Value::as_str)
            .and_then(Severity::parse)
            .unwrap_or_else(|| Self::classify_severity(&reply));

        let appointment_reason = object
            .get("appointment_reason")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
            .unwrap_or(DEFAULT_APPOINTMENT_REASON)
            .to_string();

        Reconciled {
            value: PatientReply {
                severity,
                reply,
                emergency_trigger: bool_field(&object, "emergency_trigger"),
                suggest_appointment: bool_field(&object, "suggest_appointment"),
                appointment_reason,
            },
            tier,
        }
    }

    pub fn reconcile_clinic(raw: &str) -> Reconciled<ClinicReply> {
        let (object, tier) = Self::parse_structured(raw);

        Reconciled {
            value: ClinicReply {
                reply: Self::reply_text(&object, raw),
                clinic_insights: string_list(&object, "clinic_insights"),
                followup_questions: string_list(&object, "followup_questions"),
            },
            tier,
        }
    }

    /// Strip markdown emphasis and code markers, collapse 3+ newlines to 2,
    /// trim.
    pub fn clean_reply_text(text: &str) -> String {
        let text = BOLD.replace_all(text, "$1");
        let text = ITALIC.replace_all(&text, "$1");
        let text = INLINE_CODE.replace_all(&text, "$1");
        let text = EXCESS_NEWLINES.replace_all(&text, "\n\n");
        text.trim().to_string()
    }

    /// Severe keywords win over moderate ones; MILD when neither matches
    pub fn classify_severity(text: &str) -> Severity {
        let lower = text.to_lowercase();
        if SEVERE_KEYWORDS.iter().any(|k| lower.contains(k)) {
            Severity::Severe
        } else if MODERATE_KEYWORDS.iter().any(|k| lower.contains(k)) {
            Severity::Moderate
        } else {
            Severity::Mild
        }
    }

    fn reply_text(object: &Map<String, Value>, raw: &str) -> String {
        let selected = object
            .get("reply")
            .and_then(Value::as_str)
            .filter(|reply| !reply.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| raw.replace("```json", "").replace("```", ""));

        let cleaned = Self::clean_reply_text(&selected);
        if cleaned.is_empty() {
            warn!("Model returned an empty reply");
        }
        cleaned
    }
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

fn bool_field(object: &Map<String, Value>, key: &str) -> bool {
    object.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// Accepts an array (non-string items are stringified) or a lone string
fn string_list(object: &Map<String, Value>, key: &str) -> Vec<String> {
    let to_text = |value: &Value| match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Null => None,
        other => Some(other.to_string()),
    };

    match object.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(to_text)
            .filter(|item| !item.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_json() {
        let raw = r#"{"severity":"MODERATE","reply":"Drink **plenty** of water.","emergency_trigger":false,"suggest_appointment":true,"appointment_reason":"Persistent cough"}"#;
        let result = ResponseReconciler::reconcile_patient(raw);

        assert_eq!(result.tier, ParseTier::Direct);
        assert_eq!(result.value.severity, Severity::Moderate);
        assert_eq!(result.value.reply, "Drink plenty of water.");
        assert!(result.value.suggest_appointment);
        assert_eq!(result.value.appointment_reason, "Persistent cough");
    }

    #[test]
    fn test_fenced_json() {
        let raw = "```json\n{\"severity\":\"severe\",\"reply\":\"Go to the ER\",\"emergency_trigger\":true}\n```";
        let result = ResponseReconciler::reconcile_patient(raw);

        assert_eq!(result.tier, ParseTier::Direct);
        assert_eq!(result.value.severity, Severity::Severe);
        assert!(result.value.emergency_trigger);
        assert!(!result.value.suggest_appointment);
        assert_eq!(result.value.appointment_reason, DEFAULT_APPOINTMENT_REASON);
    }

    #[test]
    fn test_embedded_json_is_extracted() {
        let raw = "Sure! Here's some advice: stay hydrated. {\"severity\":\"MILD\",\"reply\":\"stay hydrated\",\"emergency_trigger\":false,\"suggest_appointment\":false,\"appointment_reason\":\"Medical consultation\"} Hope that helps!";
        let result = ResponseReconciler::reconcile_patient(raw);

        assert_eq!(result.tier, ParseTier::Extracted);
        assert_eq!(result.value.severity, Severity::Mild);
        assert_eq!(result.value.reply, "stay hydrated");
    }

    #[test]
    fn test_prose_falls_back_to_heuristics() {
        let raw = "You should see a doctor immediately, this sounds severe.";
        let result = ResponseReconciler::reconcile_patient(raw);

        assert_eq!(result.tier, ParseTier::Heuristic);
        assert_eq!(result.value.severity, Severity::Severe);
        assert!(!result.value.emergency_trigger);
        assert!(!result.value.suggest_appointment);
        assert_eq!(result.value.reply, raw);
    }

    #[test]
    fn test_missing_severity_uses_reply_heuristic() {
        let raw = r#"{"reply":"Please book an appointment so we can check it."}"#;
        let result = ResponseReconciler::reconcile_patient(raw);
        assert_eq!(result.value.severity, Severity::Moderate);

        let raw = r#"{"severity":"catastrophic","reply":"Rest and hydrate."}"#;
        let result = ResponseReconciler::reconcile_patient(raw);
        assert_eq!(result.value.severity, Severity::Mild);
    }

    #[test]
    fn test_wrong_field_types_take_defaults() {
        let raw = r#"{"severity":3,"reply":"ok","emergency_trigger":"yes","suggest_appointment":null,"appointment_reason":42}"#;
        let result = ResponseReconciler::reconcile_patient(raw);

        assert_eq!(result.value.severity, Severity::Mild);
        assert!(!result.value.emergency_trigger);
        assert!(!result.value.suggest_appointment);
        assert_eq!(result.value.appointment_reason, DEFAULT_APPOINTMENT_REASON);
    }

    #[test]
    fn test_total_coverage() {
        let inputs = [
            "",
            "   ",
            "no braces at all",
            "{ not json }",
            "{\"a\": 1}",
            "[1, 2, 3]",
            "```json\n```",
            "prefix { broken \"json\": } suffix",
            "{{{{",
            "}}}{{{",
        ];

        for raw in inputs {
            let patient = ResponseReconciler::reconcile_patient(raw).value;
            let json = serde_json::to_value(&patient).unwrap();
            assert!(json["severity"].is_string(), "severity for {:?}", raw);
            assert!(json["reply"].is_string(), "reply for {:?}", raw);
            assert!(json["emergency_trigger"].is_boolean());
            assert!(json["suggest_appointment"].is_boolean());
            assert_eq!(json["appointment_reason"], DEFAULT_APPOINTMENT_REASON);

            let clinic = serde_json::to_value(ResponseReconciler::reconcile_clinic(raw).value).unwrap();
            assert!(clinic["reply"].is_string());
            assert!(clinic["clinic_insights"].is_array());
            assert!(clinic["followup_questions"].is_array());
        }
    }

    #[test]
    fn test_empty_output_keeps_empty_reply() {
        for raw in ["", "**", "```json\n```"] {
            let result = ResponseReconciler::reconcile_patient(raw);
            assert_eq!(result.tier, ParseTier::Heuristic);
            assert_eq!(result.value.reply, "");
            assert_eq!(result.value.severity, Severity::Mild);
        }
    }

    #[test]
    fn test_parsed_object_without_reply_uses_raw_text() {
        let raw = r#"{"reply":"","severity":"MILD"}"#;
        let result = ResponseReconciler::reconcile_patient(raw);

        assert_eq!(result.tier, ParseTier::Direct);
        assert_eq!(result.value.severity, Severity::Mild);
        assert_eq!(result.value.reply, raw);

        let raw = r#"{"clinic_insights":["Slow Monday"]}"#;
        let result = ResponseReconciler::reconcile_clinic(raw);
        assert_eq!(result.value.reply, raw);
        assert_eq!(result.value.clinic_insights, vec!["Slow Monday"]);
    }

    #[test]
    fn test_array_is_not_an_object() {
        let (object, tier) = ResponseReconciler::parse_structured("[1, 2, 3]");
        assert!(object.is_empty());
        assert_eq!(tier, ParseTier::Heuristic);
    }

    #[test]
    fn test_clean_reply_text() {
        let text = "  **Bold** and *italic* with `code`\n\n\n\nnext  ";
        assert_eq!(
            ResponseReconciler::clean_reply_text(text),
            "Bold and italic with code\n\nnext"
        );
    }

    #[test]
    fn test_classify_severity_order() {
        assert_eq!(
            ResponseReconciler::classify_severity("Mild fever, but call 911 if it gets worse"),
            Severity::Severe
        );
        assert_eq!(
            ResponseReconciler::classify_severity("Consult your GP this week"),
            Severity::Moderate
        );
        assert_eq!(ResponseReconciler::classify_severity("Rest up"), Severity::Mild);
    }

    #[test]
    fn test_clinic_reply() {
        let raw = "Here you go:\n{\"reply\":\"Bookings are up.\",\"clinic_insights\":[\"Mondays are busiest\", {\"metric\": \"no-shows\"}],\"followup_questions\":\"Want a weekly breakdown?\"}";
        let result = ResponseReconciler::reconcile_clinic(raw);

        assert_eq!(result.tier, ParseTier::Extracted);
        assert_eq!(result.value.reply, "Bookings are up.");
        assert_eq!(result.value.clinic_insights.len(), 2);
        assert_eq!(result.value.clinic_insights[0], "Mondays are busiest");
        assert_eq!(result.value.followup_questions, vec!["Want a weekly breakdown?"]);
    }

    #[test]
    fn test_clinic_prose_fallback() {
        let result = ResponseReconciler::reconcile_clinic("Revenue looks *stable* this month.");
        assert_eq!(result.tier, ParseTier::Heuristic);
        assert_eq!(result.value.reply, "Revenue looks stable this month.");
        assert!(result.value.clinic_insights.is_empty());
        assert!(result.value.followup_questions.is_empty());
    }
}
