//! Keyword fact extraction from patient messages

use once_cell::sync::Lazy;
use regex::Regex;

/// Symptom vocabulary. Detection order follows this list, not the order of
/// mention in the message.
pub const SYMPTOM_KEYWORDS: &[&str] = &[
    "fever",
    "headache",
    "cough",
    "cold",
    "sore throat",
    "runny nose",
    "nausea",
    "vomiting",
    "diarrhea",
    "stomach pain",
    "abdominal pain",
    "chest pain",
    "shortness of breath",
    "dizziness",
    "fatigue",
    "rash",
    "itching",
    "back pain",
    "joint pain",
    "body ache",
    "chills",
    "swelling",
    "bleeding",
    "insomnia",
    "anxiety",
];

static DURATION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+)\s+(days|day|hours|hour|weeks|week)").expect("duration pattern is valid")
});

/// Vocabulary keywords contained in `text`.
///
/// Plain substring containment on the lower-cased text: "headaches" yields
/// "headache", "sorethroat" does not yield "sore throat".
pub fn detect_symptoms(text: &str) -> Vec<&'static str> {
    let lower = text.to_lowercase();
    SYMPTOM_KEYWORDS
        .iter()
        .copied()
        .filter(|keyword| lower.contains(keyword))
        .collect()
}

/// First `<number> <unit>` phrase in `text`, verbatim. Plural units come
/// first in the alternation so "3 days" is not cut to "3 day".
pub fn detect_duration(text: &str) -> Option<String> {
    DURATION_PATTERN.find(text).map(|m| m.as_str().to_string())
}
