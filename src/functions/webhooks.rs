//! Asynchronous provider callbacks. The HTTP boundary in `http.rs` stays
//! thin; the event handling lives here so it can be exercised against the
//! in-memory store without any network mocking.

use chrono::Utc;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::functions::{followup, lifecycle, messages};
use crate::schema::{CallStatus, MessageStatus, PatientStatus, ResponseType, TemplateKind};
use crate::services::{Classifier, MessageProvider, NO_CLEAR_INTENT, VoiceProvider, classify_reply, digits_only};
use crate::store::Store;

/// Final call report posted by the voice provider.
#[derive(Debug, Clone, Deserialize)]
pub struct VoiceCallback {
    #[serde(rename = "callId")]
    pub call_id: String,
    pub status: String,
    #[serde(default)]
    pub duration: Option<i32>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub recording_url: Option<String>,
}

/// Update the call record and move the patient according to the outcome.
/// Unknown call ids are the caller's 404; everything downstream of a
/// successfully stored call acknowledges, so provider retries are not
/// triggered by classification details.
pub async fn handle_voice_callback(
    store: &dyn Store,
    classifier: &dyn Classifier,
    payload: VoiceCallback,
) -> Result<()> {
    let call = store
        .call_by_provider_id(&payload.call_id)
        .await?
        .ok_or(Error::NotFound("call"))?;

    let Some(status) = CallStatus::parse(&payload.status) else {
        tracing::warn!(call_id = %payload.call_id, status = %payload.status, "voice webhook: unrecognized status");
        return Ok(());
    };

    let finalized = store
        .finalize_call(
            call.id,
            status,
            payload.duration.unwrap_or(0),
            payload.transcript.as_deref(),
            payload.recording_url.as_deref(),
        )
        .await?;
    if !finalized {
        // duplicate delivery of a terminal report; keep the first write
        tracing::info!(call_id = %payload.call_id, "voice webhook: replay ignored");
        return Ok(());
    }

    match status {
        CallStatus::Completed => {
            if let Some(transcript) = payload.transcript.as_deref() {
                let outcome = classifier.classify(transcript);
                let reason = if outcome.reason.is_empty() {
                    NO_CLEAR_INTENT
                } else {
                    &outcome.reason
                };
                let ai_notes = format!("AI analysis: {reason}\n\nTranscript: {transcript}");
                store
                    .apply_classification(call.patient_id, outcome.status, &outcome.reason, &ai_notes)
                    .await?;
                tracing::info!(
                    patient_id = %call.patient_id,
                    status = outcome.status.as_str(),
                    "voice webhook: transcript classified"
                );
            }
        }
        CallStatus::NoAnswer => {
            store
                .set_patient_status(call.patient_id, PatientStatus::NotAnswered, None)
                .await?;
        }
        CallStatus::Failed | CallStatus::Scheduled => {}
    }

    Ok(())
}

/// Form payload shared by the messaging provider's status updates and
/// inbound replies; which fields are present decides the shape.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagingCallback {
    #[serde(rename = "MessageSid")]
    pub message_sid: Option<String>,
    #[serde(rename = "MessageStatus")]
    pub message_status: Option<String>,
    #[serde(rename = "From")]
    pub from: Option<String>,
    #[serde(rename = "Body")]
    pub body: Option<String>,
}

pub async fn handle_messaging_callback(
    store: &dyn Store,
    voice: &dyn VoiceProvider,
    messaging: &dyn MessageProvider,
    payload: MessagingCallback,
    public_url: &str,
) -> Result<()> {
    if let (Some(sid), Some(raw_status)) = (&payload.message_sid, &payload.message_status) {
        match MessageStatus::parse(raw_status) {
            Some(status) => {
                let advanced = store.advance_message_status(sid, status).await?;
                if !advanced {
                    tracing::info!(sid = %sid, status = raw_status, "messaging webhook: stale or unknown status update");
                }
            }
            None => {
                tracing::warn!(sid = %sid, status = %raw_status, "messaging webhook: unrecognized status");
            }
        }
    }

    if let (Some(from), Some(body)) = (&payload.from, &payload.body) {
        handle_inbound_reply(store, voice, messaging, &payload, from, body, public_url).await?;
    }

    Ok(())
}

async fn handle_inbound_reply(
    store: &dyn Store,
    voice: &dyn VoiceProvider,
    messaging: &dyn MessageProvider,
    payload: &MessagingCallback,
    from: &str,
    body: &str,
    public_url: &str,
) -> Result<()> {
    let digits = digits_only(from);
    let Some(patient) = store.patient_by_phone_digits(&digits).await? else {
        // unknown senders are acknowledged, never retried onto the provider
        tracing::warn!(from = %from, "messaging webhook: no patient for sender");
        return Ok(());
    };

    let reply = classify_reply(body);
    let status = lifecycle::status_after_reply(reply);
    let now = Utc::now();
    store.record_reply(patient.id, status, reply, now).await?;
    tracing::info!(
        patient_id = %patient.id,
        reply = reply.as_str(),
        status = status.as_str(),
        "messaging webhook: reply classified"
    );

    if let Some(sid) = &payload.message_sid {
        if store.message_by_provider_id(sid).await?.is_some() {
            store.attach_message_response(sid, body, reply, now).await?;
        }
    }

    match reply {
        ResponseType::Yes => {
            if let Err(err) = messages::send_template_message(
                store,
                messaging,
                patient.id,
                TemplateKind::Confirmation,
                None,
            )
            .await
            {
                tracing::warn!(patient_id = %patient.id, error = %err, "messaging webhook: confirmation send failed");
            }
        }
        ResponseType::No => {}
        ResponseType::Other => {
            // an unclear reply earns one more call while under the ceiling
            let Some(settings) = store.load_settings().await? else {
                tracing::warn!("messaging webhook: settings missing, skipping follow-up call");
                return Ok(());
            };
            if patient.followup_calls < settings.max_followup_calls {
                if let Err(err) =
                    followup::make_follow_up_call(store, voice, &settings, &patient, public_url)
                        .await
                {
                    tracing::warn!(patient_id = %patient.id, error = %err, "messaging webhook: follow-up call failed");
                }
            }
        }
    }

    Ok(())
}
