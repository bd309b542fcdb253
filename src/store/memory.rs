//! In-memory store for tests: same semantics as the Postgres implementation,
//! including conditional counter increments, write-once call finalization and
//! monotonic message statuses.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::functions::lifecycle;
use crate::schema::{
    Call, CallStatus, Message, MessageStatus, Patient, PatientStatus, ResponseType, Setting,
};
use crate::services::digits_only;
use crate::store::{ScheduleFilter, Store};

#[derive(Default)]
struct Inner {
    settings: Option<Setting>,
    patients: Vec<Patient>,
    calls: Vec<Call>,
    messages: Vec<Message>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Setting) -> Self {
        let store = Self::new();
        store.inner.lock().unwrap().settings = Some(settings);
        store
    }

    pub fn seed_patient(&self, patient: Patient) {
        self.inner.lock().unwrap().patients.push(patient);
    }

    pub fn seed_call(&self, call: Call) {
        self.inner.lock().unwrap().calls.push(call);
    }

    pub fn seed_message(&self, message: Message) {
        self.inner.lock().unwrap().messages.push(message);
    }

    pub fn patients(&self) -> Vec<Patient> {
        self.inner.lock().unwrap().patients.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.inner.lock().unwrap().messages.clone()
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn load_settings(&self) -> Result<Option<Setting>> {
        Ok(self.inner.lock().unwrap().settings.clone())
    }

    async fn upsert_settings(&self, settings: &Setting) -> Result<()> {
        self.inner.lock().unwrap().settings = Some(settings.clone());
        Ok(())
    }

    async fn create_patient(&self, patient: &Patient) -> Result<()> {
        self.inner.lock().unwrap().patients.push(patient.clone());
        Ok(())
    }

    async fn patient_by_id(&self, id: Uuid) -> Result<Option<Patient>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.patients.iter().find(|p| p.id == id).cloned())
    }

    async fn patient_by_phone_digits(&self, digits: &str) -> Result<Option<Patient>> {
        // an empty digit string would substring-match every patient
        if digits.is_empty() {
            return Ok(None);
        }
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .patients
            .iter()
            .find(|p| {
                let stored = digits_only(&p.phone);
                !stored.is_empty() && (digits.contains(&stored) || stored.contains(digits))
            })
            .cloned())
    }

    async fn followup_candidates(
        &self,
        max_calls: i32,
        max_messages: i32,
    ) -> Result<Vec<Patient>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .patients
            .iter()
            .filter(|p| {
                lifecycle::is_actionable(p.status)
                    && p.followup_calls < max_calls
                    && p.followup_messages < max_messages
            })
            .cloned()
            .collect())
    }

    async fn scheduling_candidates(
        &self,
        filter: &ScheduleFilter,
        limit: i64,
    ) -> Result<Vec<Patient>> {
        let inner = self.inner.lock().unwrap();
        let matches = inner
            .patients
            .iter()
            .filter(|p| p.status == PatientStatus::Pending)
            .filter(|p| {
                if let Some(ids) = &filter.patient_ids {
                    ids.contains(&p.id)
                } else if let Some(date) = filter.date {
                    p.appointment_date
                        .is_some_and(|when| when.date_naive() == date)
                } else {
                    true
                }
            })
            .filter(|p| {
                filter
                    .doctor_id
                    .is_none_or(|doctor| p.assigned_doctor == Some(doctor))
            })
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(matches)
    }

    async fn new_patient_candidates(&self, limit: i64) -> Result<Vec<Patient>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .patients
            .iter()
            .filter(|p| p.status == PatientStatus::Pending && p.message_attempts == 0)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn record_message_attempt(
        &self,
        patient_id: Uuid,
        max_messages: i32,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        let Some(patient) = inner.patients.iter_mut().find(|p| p.id == patient_id) else {
            return Ok(false);
        };
        if patient.followup_messages >= max_messages {
            return Ok(false);
        }
        patient.followup_messages += 1;
        patient.last_message_date = Some(now);
        Ok(true)
    }

    async fn record_call_attempt(
        &self,
        patient_id: Uuid,
        max_calls: i32,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        let Some(patient) = inner.patients.iter_mut().find(|p| p.id == patient_id) else {
            return Ok(false);
        };
        if patient.followup_calls >= max_calls {
            return Ok(false);
        }
        patient.followup_calls += 1;
        patient.status = PatientStatus::Called;
        patient.last_call_date = Some(now);
        Ok(true)
    }

    async fn record_template_send(&self, patient_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(patient) = inner.patients.iter_mut().find(|p| p.id == patient_id) {
            patient.message_attempts += 1;
            patient.last_message_date = Some(now);
        }
        Ok(())
    }

    async fn set_patient_status(
        &self,
        patient_id: Uuid,
        status: PatientStatus,
        reason: Option<&str>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(patient) = inner.patients.iter_mut().find(|p| p.id == patient_id) {
            patient.status = status;
            patient.status_reason = reason.map(str::to_string);
        }
        Ok(())
    }

    async fn apply_classification(
        &self,
        patient_id: Uuid,
        status: PatientStatus,
        reason: &str,
        ai_notes: &str,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(patient) = inner.patients.iter_mut().find(|p| p.id == patient_id) {
            patient.status = status;
            patient.status_reason = Some(reason.to_string());
            patient.ai_notes = Some(ai_notes.to_string());
        }
        Ok(())
    }

    async fn record_reply(
        &self,
        patient_id: Uuid,
        status: PatientStatus,
        response: ResponseType,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(patient) = inner.patients.iter_mut().find(|p| p.id == patient_id) {
            patient.status = status;
            patient.last_response = Some(response.as_str().to_string());
            patient.last_response_date = Some(now);
        }
        Ok(())
    }

    async fn promote_exhausted(&self, max_calls: i32, max_messages: i32) -> Result<u64> {
        let mut inner = self.inner.lock().unwrap();
        let mut promoted = 0u64;
        for patient in inner.patients.iter_mut() {
            if lifecycle::is_actionable(patient.status)
                && patient.followup_calls >= max_calls
                && patient.followup_messages >= max_messages
            {
                patient.status = PatientStatus::NotAnswered;
                patient.status_reason = Some(lifecycle::MAX_ATTEMPTS_REASON.to_string());
                promoted += 1;
            }
        }
        Ok(promoted)
    }

    async fn create_call(&self, call: &Call) -> Result<()> {
        self.inner.lock().unwrap().calls.push(call.clone());
        Ok(())
    }

    async fn call_by_provider_id(&self, provider_call_id: &str) -> Result<Option<Call>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .calls
            .iter()
            .find(|c| c.provider_call_id.as_deref() == Some(provider_call_id))
            .cloned())
    }

    async fn finalize_call(
        &self,
        call_id: Uuid,
        status: CallStatus,
        duration_secs: i32,
        notes: Option<&str>,
        recording_url: Option<&str>,
    ) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        let Some(call) = inner.calls.iter_mut().find(|c| c.id == call_id) else {
            return Ok(false);
        };
        if !lifecycle::call_status_can_finalize(call.status, status) {
            return Ok(false);
        }
        call.status = status;
        call.duration_secs = duration_secs;
        call.notes = notes.map(str::to_string);
        if let Some(url) = recording_url {
            call.recording_url = Some(url.to_string());
        }
        Ok(true)
    }

    async fn calls_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.calls.iter().filter(|c| c.call_time >= since).count() as i64)
    }

    async fn create_message(&self, message: &Message) -> Result<()> {
        self.inner.lock().unwrap().messages.push(message.clone());
        Ok(())
    }

    async fn message_by_provider_id(&self, provider_message_id: &str) -> Result<Option<Message>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .messages
            .iter()
            .find(|m| m.provider_message_id.as_deref() == Some(provider_message_id))
            .cloned())
    }

    async fn advance_message_status(
        &self,
        provider_message_id: &str,
        status: MessageStatus,
    ) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        let Some(message) = inner
            .messages
            .iter_mut()
            .find(|m| m.provider_message_id.as_deref() == Some(provider_message_id))
        else {
            return Ok(false);
        };
        if !lifecycle::message_status_can_advance(message.status, status) {
            return Ok(false);
        }
        message.status = status;
        Ok(true)
    }

    async fn attach_message_response(
        &self,
        provider_message_id: &str,
        body: &str,
        response_type: ResponseType,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(message) = inner
            .messages
            .iter_mut()
            .find(|m| m.provider_message_id.as_deref() == Some(provider_message_id))
        {
            // a reply proves the message was read, but never revives a
            // failed one or regresses past the monotonic rule
            if lifecycle::message_status_can_advance(message.status, MessageStatus::Read) {
                message.status = MessageStatus::Read;
            }
            message.response_content = Some(body.to_string());
            message.response_type = Some(response_type);
            message.response_date = Some(now);
        }
        Ok(())
    }
}
