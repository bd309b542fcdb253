//! Template-driven WhatsApp sends: the reminder/confirmation/follow-up
//! messages addressed to a single patient.

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::functions::followup::patient_variables;
use crate::schema::{Message, MessageStatus, MessageType, TemplateKind};
use crate::services::{MessageProvider, MessagingCredentials, render};
use crate::store::Store;

/// Render the configured template of the given kind and send it to the
/// patient. Fails with a descriptive error when messaging is unconfigured,
/// the patient is unknown, or the legacy message-attempt ceiling is reached.
/// Returns the provider's message id.
pub async fn send_template_message(
    store: &dyn Store,
    messaging: &dyn MessageProvider,
    patient_id: Uuid,
    kind: TemplateKind,
    sent_by: Option<Uuid>,
) -> Result<String> {
    let settings = store
        .load_settings()
        .await?
        .ok_or_else(|| Error::Config("settings not configured".to_string()))?;
    let credentials = MessagingCredentials::from_settings(&settings)
        .map_err(|err| Error::Config(err.to_string()))?;

    let patient = store
        .patient_by_id(patient_id)
        .await?
        .ok_or(Error::NotFound("patient"))?;

    if patient.message_attempts >= settings.max_followup_messages {
        return Err(Error::Validation(
            "maximum message attempts reached".to_string(),
        ));
    }

    let vars = patient_variables(&patient);
    let vars: Vec<(&str, &str)> = vars.iter().map(|(k, v)| (*k, v.as_str())).collect();
    let content = render(settings.template_for(kind), &vars);

    let provider_message_id = messaging
        .send_whatsapp(&credentials, &patient.phone, &content)
        .await
        .map_err(|err| Error::Provider(err.to_string()))?;

    let now = Utc::now();
    store
        .create_message(&Message {
            id: Uuid::new_v4(),
            patient_id: patient.id,
            content,
            sent_at: now,
            status: MessageStatus::Queued,
            message_type: MessageType::Whatsapp,
            provider_message_id: Some(provider_message_id.clone()),
            sent_by,
            is_followup: kind == TemplateKind::FollowUp,
            followup_attempt: match kind {
                TemplateKind::FollowUp => patient.followup_messages + 1,
                _ => 0,
            },
            response_content: None,
            response_type: None,
            response_date: None,
        })
        .await?;
    store.record_template_send(patient.id, now).await?;

    tracing::info!(
        patient_id = %patient.id,
        kind = kind.as_str(),
        "message: template sent"
    );

    Ok(provider_message_id)
}

/// Per-run cap on first-contact sends.
const NEW_PATIENT_BATCH: i64 = 10;

#[derive(Debug, Clone, Serialize)]
pub struct NewPatientReport {
    pub processed: usize,
    pub sent: u32,
    pub errors: Vec<String>,
}

/// First-contact pass: send the reminder template to pending patients that
/// have never been messaged. A failed send is collected per patient and
/// never aborts the batch; sent patients drop out of the candidate set via
/// their attempt counter.
pub async fn process_new_patients(
    store: &dyn Store,
    messaging: &dyn MessageProvider,
) -> Result<NewPatientReport> {
    let patients = store.new_patient_candidates(NEW_PATIENT_BATCH).await?;
    tracing::info!(count = patients.len(), "messages: processing new patients");

    let mut report = NewPatientReport {
        processed: patients.len(),
        sent: 0,
        errors: Vec::new(),
    };
    for patient in &patients {
        match send_template_message(store, messaging, patient.id, TemplateKind::Reminder, None)
            .await
        {
            Ok(_) => report.sent += 1,
            Err(err) => {
                tracing::warn!(patient_id = %patient.id, error = %err, "messages: new-patient send failed");
                report.errors.push(format!("{}: {err}", patient.name));
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::followup::testing::{ScriptedMessenger, messaging_settings, patient};
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn renders_and_records_a_reminder() {
        let store = MemoryStore::with_settings(messaging_settings());
        let mut p = patient("Ana", "+15550102222");
        p.assigned_doctor_name = Some("Lee".to_string());
        let patient_id = p.id;
        store.seed_patient(p);
        let messaging = ScriptedMessenger::default();

        let sid = send_template_message(
            &store,
            &messaging,
            patient_id,
            TemplateKind::Reminder,
            None,
        )
        .await
        .unwrap();

        let sent = messaging.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("Ana"));
        assert!(sent[0].1.contains("Dr. Lee"));

        let messages = store.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].provider_message_id.as_deref(), Some(sid.as_str()));
        assert_eq!(messages[0].status, MessageStatus::Queued);
        assert!(!messages[0].is_followup);
        assert_eq!(store.patients()[0].message_attempts, 1);
    }

    #[tokio::test]
    async fn rejects_when_legacy_ceiling_reached() {
        let store = MemoryStore::with_settings(messaging_settings());
        let mut p = patient("Ana", "+15550102222");
        p.message_attempts = 2;
        let patient_id = p.id;
        store.seed_patient(p);
        let messaging = ScriptedMessenger::default();

        let err = send_template_message(
            &store,
            &messaging,
            patient_id,
            TemplateKind::Reminder,
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(messaging.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_patient_is_not_found() {
        let store = MemoryStore::with_settings(messaging_settings());
        let messaging = ScriptedMessenger::default();

        let err = send_template_message(
            &store,
            &messaging,
            Uuid::new_v4(),
            TemplateKind::Confirmation,
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::NotFound("patient")));
    }

    #[tokio::test]
    async fn first_contact_pass_skips_already_messaged_patients() {
        let store = MemoryStore::with_settings(messaging_settings());
        store.seed_patient(patient("Fresh", "+15550100001"));
        let mut contacted = patient("Contacted", "+15550100002");
        contacted.message_attempts = 1;
        store.seed_patient(contacted);
        let messaging = ScriptedMessenger::default();

        let report = process_new_patients(&store, &messaging).await.unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.sent, 1);
        assert!(report.errors.is_empty());
        assert_eq!(messaging.sent.lock().unwrap().len(), 1);

        // sent patients carry an attempt now and are not re-selected
        let report = process_new_patients(&store, &messaging).await.unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(messaging.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn first_contact_failure_is_collected_per_patient() {
        let store = MemoryStore::with_settings(messaging_settings());
        store.seed_patient(patient("First", "+15550100001"));
        store.seed_patient(patient("Second", "+15550100002"));
        let mut messaging = ScriptedMessenger::default();
        messaging.fail_numbers.insert("+15550100002".to_string());

        let report = process_new_patients(&store, &messaging).await.unwrap();
        assert_eq!(report.processed, 2);
        assert_eq!(report.sent, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("Second"));
    }

    #[tokio::test]
    async fn disabled_whatsapp_is_a_configuration_error() {
        let mut settings = messaging_settings();
        settings.whatsapp_enabled = false;
        let store = MemoryStore::with_settings(settings);
        let p = patient("Ana", "+15550102222");
        let patient_id = p.id;
        store.seed_patient(p);
        let messaging = ScriptedMessenger::default();

        let err = send_template_message(
            &store,
            &messaging,
            patient_id,
            TemplateKind::Reminder,
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
