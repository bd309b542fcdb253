use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Scheduled,
    Completed,
    Failed,
    NoAnswer,
}

impl CallStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::NoAnswer => "no_answer",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "scheduled" => Self::Scheduled,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "no_answer" => Self::NoAnswer,
            _ => return None,
        })
    }

    /// Terminal statuses are write-once: status, duration and transcript
    /// must not change once one is recorded.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Scheduled)
    }
}

/// One voice-call attempt tied to exactly one patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Call {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub call_time: DateTime<Utc>,
    pub status: CallStatus,
    pub duration_secs: i32,
    /// Opaque handle from the voice provider; webhook lookups key on it.
    pub provider_call_id: Option<String>,
    /// Transcript once the call completes.
    pub notes: Option<String>,
    pub recording_url: Option<String>,
    pub is_followup: bool,
    pub followup_attempt: i32,
    pub created_at: DateTime<Utc>,
}
