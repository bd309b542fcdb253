use crate::schema::{PatientStatus, ResponseType};

/// Outcome of classifying a transcript or free-text reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub status: PatientStatus,
    pub reason: String,
}

/// Maps free text to a patient status. The default implementation is
/// keyword matching; a smarter model can be swapped in behind this trait
/// without touching the orchestrator or webhook handlers.
pub trait Classifier: Send + Sync {
    fn classify(&self, text: &str) -> Classification;
}

/// Ordered keyword rules, first match wins. Ordering is load-bearing:
/// multiple keywords can co-occur ("not interested... tell me more") and
/// decline intent must win over interest, so the decline rule comes first.
const TRANSCRIPT_RULES: &[(&[&str], PatientStatus, &str)] = &[
    (
        &["not interested", "don't want"],
        PatientStatus::NotInterested,
        "Patient explicitly declined",
    ),
    (
        &["interested", "tell me more"],
        PatientStatus::Interested,
        "Patient expressed interest",
    ),
    (
        &["book", "schedule", "confirm"],
        PatientStatus::Booked,
        "Patient confirmed appointment",
    ),
    (
        &["wrong number", "wrong person"],
        PatientStatus::WrongNumber,
        "Wrong number",
    ),
    (
        &["busy", "call later"],
        PatientStatus::CallBack,
        "Patient requested callback",
    ),
];

pub const NO_CLEAR_INTENT: &str = "No clear intent detected";

#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl Classifier for KeywordClassifier {
    fn classify(&self, text: &str) -> Classification {
        let lowered = text.to_lowercase();
        for (patterns, status, reason) in TRANSCRIPT_RULES {
            if patterns.iter().any(|p| lowered.contains(p)) {
                return Classification {
                    status: *status,
                    reason: (*reason).to_string(),
                };
            }
        }
        // ambiguity is the default branch, not an error
        Classification {
            status: PatientStatus::FollowUp,
            reason: String::new(),
        }
    }
}

/// Narrow classifier for short WhatsApp replies.
pub fn classify_reply(body: &str) -> ResponseType {
    let normalized = body.trim().to_lowercase();
    if normalized.contains("yes") || normalized.contains("confirm") || normalized == "1" {
        ResponseType::Yes
    } else if normalized.contains("no") || normalized.contains("cancel") || normalized == "2" {
        ResponseType::No
    } else {
        ResponseType::Other
    }
}
