use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Queued,
    Sent,
    Delivered,
    Read,
    Failed,
}

impl MessageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
            Self::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "queued" => Self::Queued,
            "sent" => Self::Sent,
            "delivered" => Self::Delivered,
            "read" => Self::Read,
            "failed" => Self::Failed,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Whatsapp,
    Sms,
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Whatsapp => "whatsapp",
            Self::Sms => "sms",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "whatsapp" => Self::Whatsapp,
            "sms" => Self::Sms,
            _ => return None,
        })
    }
}

/// How an inbound reply was read by the short-reply classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Yes,
    No,
    Other,
}

impl ResponseType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::Other => "other",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "yes" => Self::Yes,
            "no" => Self::No,
            "other" => Self::Other,
            _ => return None,
        })
    }
}

/// One outbound communication; reply fields are populated if the patient
/// ever answers it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub content: String,
    pub sent_at: DateTime<Utc>,
    pub status: MessageStatus,
    pub message_type: MessageType,
    /// Opaque id from the messaging provider (status webhooks key on it).
    pub provider_message_id: Option<String>,
    /// None means system-initiated.
    pub sent_by: Option<Uuid>,
    pub is_followup: bool,
    pub followup_attempt: i32,
    pub response_content: Option<String>,
    pub response_type: Option<ResponseType>,
    pub response_date: Option<DateTime<Utc>>,
}
