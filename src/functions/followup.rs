//! Follow-up orchestrator: decides per patient whether to message or call
//! next, enforces attempt ceilings and the daily call cap, and promotes
//! exhausted leads to `not_answered`.

use chrono::Utc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::schema::{Call, CallStatus, Message, MessageStatus, MessageType, Patient, Setting};
use crate::services::{
    CallRequest, MessageProvider, MessagingCredentials, VoiceProvider, format_appointment_date,
    render, voice_config,
};
use crate::store::Store;

#[derive(Debug, Clone)]
pub struct FollowUpReport {
    pub candidates: usize,
    pub messages_sent: u32,
    pub calls_placed: u32,
    pub skipped: u32,
    pub promoted: u64,
}

impl FollowUpReport {
    pub fn summary(&self) -> String {
        format!("Processed follow-ups for {} patients", self.candidates)
    }
}

/// Standard template variables for a patient, with the fallbacks used when
/// doctor or clinic are unassigned.
pub fn patient_variables(patient: &Patient) -> Vec<(&'static str, String)> {
    vec![
        ("patient_name", patient.name.clone()),
        (
            "doctor_name",
            patient
                .assigned_doctor_name
                .clone()
                .unwrap_or_else(|| "your doctor".to_string()),
        ),
        (
            "appointment_date",
            format_appointment_date(patient.appointment_date),
        ),
        (
            "clinic_name",
            patient
                .clinic_name
                .clone()
                .unwrap_or_else(|| "our clinic".to_string()),
        ),
    ]
}

fn as_render_vars<'a>(vars: &'a [(&'static str, String)]) -> Vec<(&'static str, &'a str)> {
    vars.iter().map(|(k, v)| (*k, v.as_str())).collect()
}

pub fn voice_callback_url(public_url: &str) -> String {
    format!("{}/webhooks/voice", public_url.trim_end_matches('/'))
}

/// One orchestrator pass. Settings are loaded once and passed down; a
/// dispatch failure for one patient is logged and never aborts the rest of
/// the batch. Two passes racing inside the same window can still
/// double-dispatch for a patient, but the conditional counter updates in the
/// store keep every ceiling intact.
pub async fn process_follow_ups(
    store: &dyn Store,
    voice: &dyn VoiceProvider,
    messaging: &dyn MessageProvider,
    public_url: &str,
) -> Result<FollowUpReport> {
    let settings = store
        .load_settings()
        .await?
        .ok_or_else(|| Error::Config("settings not configured".to_string()))?;

    let candidates = store
        .followup_candidates(settings.max_followup_calls, settings.max_followup_messages)
        .await?;

    tracing::info!(count = candidates.len(), "followup: processing candidates");

    let today_start = Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is valid")
        .and_utc();
    let mut calls_today = store.calls_since(today_start).await?;

    let mut report = FollowUpReport {
        candidates: candidates.len(),
        messages_sent: 0,
        calls_placed: 0,
        skipped: 0,
        promoted: 0,
    };

    for patient in &candidates {
        // message-before-call precedence is strict per patient
        if settings.send_message_before_call
            && patient.followup_messages < settings.max_followup_messages
        {
            match send_follow_up_message(store, messaging, &settings, patient).await {
                Ok(()) => {
                    tracing::info!(patient_id = %patient.id, phone = %patient.phone, "followup: message sent");
                    report.messages_sent += 1;
                }
                Err(err) => {
                    // do not escalate to a call in the same pass
                    tracing::warn!(patient_id = %patient.id, error = %err, "followup: message failed");
                    report.skipped += 1;
                }
            }
        } else if patient.followup_calls < settings.max_followup_calls {
            if calls_today >= i64::from(settings.max_calls_per_day) {
                tracing::warn!(
                    patient_id = %patient.id,
                    max_calls_per_day = settings.max_calls_per_day,
                    "followup: daily call cap reached, deferring"
                );
                report.skipped += 1;
                continue;
            }
            match make_follow_up_call(store, voice, &settings, patient, public_url).await {
                Ok(()) => {
                    tracing::info!(patient_id = %patient.id, phone = %patient.phone, "followup: call placed");
                    calls_today += 1;
                    report.calls_placed += 1;
                }
                Err(err) => {
                    tracing::warn!(patient_id = %patient.id, error = %err, "followup: call failed");
                    report.skipped += 1;
                }
            }
        }
    }

    report.promoted = store
        .promote_exhausted(settings.max_followup_calls, settings.max_followup_messages)
        .await?;
    if report.promoted > 0 {
        tracing::info!(promoted = report.promoted, "followup: cold-lead promotion");
    }

    Ok(report)
}

async fn send_follow_up_message(
    store: &dyn Store,
    messaging: &dyn MessageProvider,
    settings: &Setting,
    patient: &Patient,
) -> anyhow::Result<()> {
    let credentials = MessagingCredentials::from_settings(settings)?;
    let vars = patient_variables(patient);
    let content = render(&settings.message_template, &as_render_vars(&vars));

    let provider_message_id = messaging
        .send_whatsapp(&credentials, &patient.phone, &content)
        .await?;

    let now = Utc::now();
    let counted = store
        .record_message_attempt(patient.id, settings.max_followup_messages, now)
        .await?;
    if !counted {
        tracing::warn!(patient_id = %patient.id, "followup: message ceiling hit concurrently");
    }

    store
        .create_message(&Message {
            id: Uuid::new_v4(),
            patient_id: patient.id,
            content,
            sent_at: now,
            status: MessageStatus::Queued,
            message_type: MessageType::Whatsapp,
            provider_message_id: Some(provider_message_id),
            sent_by: None,
            is_followup: true,
            followup_attempt: patient.followup_messages + 1,
            response_content: None,
            response_type: None,
            response_date: None,
        })
        .await?;

    Ok(())
}

pub(crate) async fn make_follow_up_call(
    store: &dyn Store,
    voice: &dyn VoiceProvider,
    settings: &Setting,
    patient: &Patient,
    public_url: &str,
) -> anyhow::Result<()> {
    let (api_key, from_number) = voice_config(settings)?;
    let vars = patient_variables(patient);

    let handle = voice
        .place_call(
            api_key,
            CallRequest {
                to_number: patient.phone.clone(),
                from_number: from_number.map(str::to_string),
                script: patient.call_script.clone(),
                variables: vars.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
                callback_url: voice_callback_url(public_url),
            },
        )
        .await?;

    let now = Utc::now();
    store
        .create_call(&Call {
            id: Uuid::new_v4(),
            patient_id: patient.id,
            call_time: now,
            status: CallStatus::Scheduled,
            duration_secs: 0,
            provider_call_id: Some(handle.call_id),
            notes: None,
            recording_url: None,
            is_followup: true,
            followup_attempt: patient.followup_calls + 1,
            created_at: now,
        })
        .await?;

    let counted = store
        .record_call_attempt(patient.id, settings.max_followup_calls, now)
        .await?;
    if !counted {
        tracing::warn!(patient_id = %patient.id, "followup: call ceiling hit concurrently");
    }

    Ok(())
}
