//! Ad-hoc call scheduling outside the daily follow-up pass: bulk scheduling
//! against a filter, and the single "make this one call now" action.

use chrono::{Days, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::functions::followup::{patient_variables, voice_callback_url};
use crate::schema::{Call, CallStatus, Patient, PatientStatus};
use crate::services::{CallRequest, VoiceProvider, format_appointment_date, voice_config};
use crate::store::{ScheduleFilter, Store};

#[derive(Debug, Clone, Serialize)]
pub struct ScheduledCall {
    pub patient_id: Uuid,
    pub name: String,
    pub phone: String,
    pub call_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleReport {
    pub scheduled: Vec<ScheduledCall>,
    pub errors: Vec<String>,
}

/// Bulk-schedule voice calls for pending patients matching the filter.
/// Defaults to tomorrow's appointments when neither explicit ids nor a date
/// are given; capped at the configured daily call volume. Per-patient
/// provider failures are collected, never fatal.
pub async fn schedule_calls(
    store: &dyn Store,
    voice: &dyn VoiceProvider,
    mut filter: ScheduleFilter,
    public_url: &str,
) -> Result<ScheduleReport> {
    let settings = store
        .load_settings()
        .await?
        .ok_or_else(|| Error::Config("settings not configured".to_string()))?;
    let (api_key, from_number) =
        voice_config(&settings).map_err(|err| Error::Config(err.to_string()))?;

    if filter.patient_ids.is_none() && filter.date.is_none() {
        filter.date = Utc::now().date_naive().checked_add_days(Days::new(1));
    }

    let patients = store
        .scheduling_candidates(&filter, i64::from(settings.max_calls_per_day))
        .await?;

    tracing::info!(count = patients.len(), "schedule: dispatching calls");

    let mut report = ScheduleReport {
        scheduled: Vec::new(),
        errors: Vec::new(),
    };

    for patient in &patients {
        match dispatch_call(store, voice, api_key, from_number, patient, public_url).await {
            Ok(call_id) => {
                report.scheduled.push(ScheduledCall {
                    patient_id: patient.id,
                    name: patient.name.clone(),
                    phone: patient.phone.clone(),
                    call_id,
                });
            }
            Err(err) => {
                tracing::warn!(patient_id = %patient.id, error = %err, "schedule: call failed");
                report.errors.push(format!("{}: {err}", patient.name));
            }
        }
    }

    Ok(report)
}

async fn dispatch_call(
    store: &dyn Store,
    voice: &dyn VoiceProvider,
    api_key: &str,
    from_number: Option<&str>,
    patient: &Patient,
    public_url: &str,
) -> anyhow::Result<String> {
    let vars = patient_variables(patient);
    let handle = voice
        .place_call(
            api_key,
            CallRequest {
                to_number: patient.phone.clone(),
                from_number: from_number.map(str::to_string),
                script: patient.call_script.clone(),
                variables: vars.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
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
            provider_call_id: Some(handle.call_id.clone()),
            notes: None,
            recording_url: None,
            is_followup: false,
            followup_attempt: 0,
            created_at: now,
        })
        .await?;
    store
        .set_patient_status(patient.id, PatientStatus::Called, None)
        .await?;

    Ok(handle.call_id)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImmediateCallParams {
    pub phone_number: String,
    pub script: String,
    #[serde(default)]
    pub from_number: Option<String>,
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub doctor_name: Option<String>,
    #[serde(default)]
    pub clinic_name: Option<String>,
    #[serde(default)]
    pub appointment_date: Option<chrono::DateTime<Utc>>,
    #[serde(default)]
    pub added_by: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImmediateCallOutcome {
    pub call_id: String,
    pub call_status: String,
    pub patient_id: Uuid,
}

/// Place a single call right now. Unlike the batch paths, a provider
/// failure here propagates verbatim to the caller. Creates a minimal
/// patient record when the number is unknown.
pub async fn immediate_call(
    store: &dyn Store,
    voice: &dyn VoiceProvider,
    params: ImmediateCallParams,
    public_url: &str,
) -> Result<ImmediateCallOutcome> {
    if params.phone_number.trim().is_empty() || params.script.trim().is_empty() {
        return Err(Error::Validation(
            "phone number and script are required".to_string(),
        ));
    }

    let settings = store
        .load_settings()
        .await?
        .ok_or_else(|| Error::Config("settings not configured".to_string()))?;
    let (api_key, default_from) =
        voice_config(&settings).map_err(|err| Error::Config(err.to_string()))?;

    let digits = crate::services::digits_only(&params.phone_number);
    let existing = store.patient_by_phone_digits(&digits).await?;
    let patient = match existing {
        Some(patient) => patient,
        None => {
            let now = Utc::now();
            let patient = Patient {
                id: Uuid::new_v4(),
                name: params
                    .patient_name
                    .clone()
                    .unwrap_or_else(|| "Unknown Patient".to_string()),
                phone: params.phone_number.clone(),
                email: None,
                call_script: params.script.clone(),
                appointment_date: params.appointment_date,
                preferred_call_day: None,
                preferred_call_time: None,
                status: PatientStatus::Pending,
                status_reason: None,
                notes: None,
                ai_notes: None,
                added_by: params.added_by,
                assigned_doctor: None,
                assigned_doctor_name: params.doctor_name.clone(),
                clinic_name: params.clinic_name.clone(),
                followup_calls: 0,
                followup_messages: 0,
                message_attempts: 0,
                call_attempts: 0,
                last_message_date: None,
                last_call_date: None,
                last_response: None,
                last_response_date: None,
                created_at: now,
            };
            store.create_patient(&patient).await?;
            patient
        }
    };

    let variables = vec![
        (
            "patient_name".to_string(),
            params.patient_name.unwrap_or_else(|| patient.name.clone()),
        ),
        (
            "doctor_name".to_string(),
            params
                .doctor_name
                .or_else(|| patient.assigned_doctor_name.clone())
                .unwrap_or_else(|| "your doctor".to_string()),
        ),
        (
            "clinic_name".to_string(),
            params
                .clinic_name
                .or_else(|| patient.clinic_name.clone())
                .unwrap_or_else(|| "our clinic".to_string()),
        ),
        (
            "appointment_date".to_string(),
            format_appointment_date(params.appointment_date.or(patient.appointment_date)),
        ),
    ];

    let handle = voice
        .place_call(
            api_key,
            CallRequest {
                to_number: params.phone_number.clone(),
                from_number: params
                    .from_number
                    .or_else(|| default_from.map(str::to_string)),
                script: params.script,
                variables,
                callback_url: voice_callback_url(public_url),
            },
        )
        .await
        .map_err(|err| Error::Provider(err.to_string()))?;

    let now = Utc::now();
    store
        .create_call(&Call {
            id: Uuid::new_v4(),
            patient_id: patient.id,
            call_time: now,
            status: CallStatus::Scheduled,
            duration_secs: 0,
            provider_call_id: Some(handle.call_id.clone()),
            notes: None,
            recording_url: None,
            is_followup: false,
            followup_attempt: 0,
            created_at: now,
        })
        .await?;
    store
        .set_patient_status(patient.id, PatientStatus::Called, None)
        .await?;

    Ok(ImmediateCallOutcome {
        call_id: handle.call_id,
        call_status: handle.call_status,
        patient_id: patient.id,
    })
}
