use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which of the configured WhatsApp templates a send uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    Reminder,
    Confirmation,
    FollowUp,
}

impl TemplateKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reminder => "reminder",
            Self::Confirmation => "confirmation",
            Self::FollowUp => "follow_up",
        }
    }
}

/// Global configuration singleton, one row consulted per operation.
/// Loaded once per batch run and passed into the orchestrator/adapters
/// rather than re-fetched per patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Setting {
    // call window
    pub call_start_time: String,
    pub call_end_time: String,
    pub max_calls_per_day: i32,
    // voice provider
    pub retell_api_key: Option<String>,
    pub retell_from_number: Option<String>,
    // messaging provider
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_phone_number: Option<String>,
    pub whatsapp_enabled: bool,
    // templates
    pub message_template: String,
    pub whatsapp_reminder_template: String,
    pub whatsapp_confirmation_template: String,
    pub whatsapp_followup_template: String,
    // follow-up policy
    pub send_message_before_call: bool,
    pub max_followup_calls: i32,
    pub max_followup_messages: i32,
    pub days_before_followup: i32,
    // clock daemon schedule
    pub followup_schedule: String,
    pub timezone: String,
    pub updated_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl Setting {
    pub fn template_for(&self, kind: TemplateKind) -> &str {
        match kind {
            TemplateKind::Reminder => &self.whatsapp_reminder_template,
            TemplateKind::Confirmation => &self.whatsapp_confirmation_template,
            TemplateKind::FollowUp => &self.whatsapp_followup_template,
        }
    }
}

impl Default for Setting {
    fn default() -> Self {
        Self {
            call_start_time: "09:00".to_string(),
            call_end_time: "17:00".to_string(),
            max_calls_per_day: 50,
            retell_api_key: None,
            retell_from_number: None,
            twilio_account_sid: None,
            twilio_auth_token: None,
            twilio_phone_number: None,
            whatsapp_enabled: false,
            message_template: "Hello {{patient_name}}, this is a reminder about your appointment \
                with Dr. {{doctor_name}} on {{appointment_date}}. Please reply to confirm."
                .to_string(),
            whatsapp_reminder_template: "Hello {{patient_name}}, this is a reminder about your \
                appointment with Dr. {{doctor_name}} on {{appointment_date}}. Please reply YES to \
                confirm or NO to cancel."
                .to_string(),
            whatsapp_confirmation_template: "Thank you for confirming your appointment with \
                Dr. {{doctor_name}} on {{appointment_date}}. We look forward to seeing you!"
                .to_string(),
            whatsapp_followup_template: "Hello {{patient_name}}, we noticed you haven't confirmed \
                your appointment with Dr. {{doctor_name}} on {{appointment_date}}. Please reply \
                YES to confirm or NO to cancel."
                .to_string(),
            send_message_before_call: true,
            max_followup_calls: 3,
            max_followup_messages: 2,
            days_before_followup: 1,
            followup_schedule: "0 9 * * *".to_string(),
            timezone: "UTC".to_string(),
            updated_by: None,
            updated_at: Utc::now(),
        }
    }
}
