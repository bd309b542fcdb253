use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of lead statuses. Stored as text; every transition site
/// matches exhaustively so adding a status is a compile-time change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatientStatus {
    Pending,
    Called,
    NotAnswered,
    FollowUp,
    Interested,
    NotInterested,
    Booked,
    WrongNumber,
    Busy,
    CallBack,
}

impl PatientStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Called => "called",
            Self::NotAnswered => "not_answered",
            Self::FollowUp => "follow_up",
            Self::Interested => "interested",
            Self::NotInterested => "not_interested",
            Self::Booked => "booked",
            Self::WrongNumber => "wrong_number",
            Self::Busy => "busy",
            Self::CallBack => "call_back",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "pending" => Self::Pending,
            "called" => Self::Called,
            "not_answered" => Self::NotAnswered,
            "follow_up" => Self::FollowUp,
            "interested" => Self::Interested,
            "not_interested" => Self::NotInterested,
            "booked" => Self::Booked,
            "wrong_number" => Self::WrongNumber,
            "busy" => Self::Busy,
            "call_back" => Self::CallBack,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    /// Required; matched against inbound webhook numbers by bare digits.
    pub phone: String,
    pub email: Option<String>,
    /// Rendered template used for voice calls.
    pub call_script: String,
    pub appointment_date: Option<DateTime<Utc>>,
    pub preferred_call_day: Option<String>,
    pub preferred_call_time: Option<String>,
    pub status: PatientStatus,
    pub status_reason: Option<String>,
    pub notes: Option<String>,
    /// Overwritten by the classifier on every completed call.
    pub ai_notes: Option<String>,
    pub added_by: Option<Uuid>,
    pub assigned_doctor: Option<Uuid>,
    /// Denormalized for template rendering.
    pub assigned_doctor_name: Option<String>,
    pub clinic_name: Option<String>,
    /// Follow-up counters, monotonically non-decreasing.
    pub followup_calls: i32,
    pub followup_messages: i32,
    // legacy parallel counters kept for the older send paths
    pub message_attempts: i32,
    pub call_attempts: i32,
    pub last_message_date: Option<DateTime<Utc>>,
    pub last_call_date: Option<DateTime<Utc>>,
    pub last_response: Option<String>,
    pub last_response_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            PatientStatus::Pending,
            PatientStatus::Called,
            PatientStatus::NotAnswered,
            PatientStatus::FollowUp,
            PatientStatus::Interested,
            PatientStatus::NotInterested,
            PatientStatus::Booked,
            PatientStatus::WrongNumber,
            PatientStatus::Busy,
            PatientStatus::CallBack,
        ] {
            assert_eq!(PatientStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PatientStatus::parse("unknown"), None);
    }
}
